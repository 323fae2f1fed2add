//! Linux sysfs GPIO edge source.
//!
//! Each pin is exported, configured as an input with falling-edge
//! interrupts, and watched by a dedicated thread blocking in `poll(2)` on
//! the pin's `value` file. The kernel raises `POLLPRI` on every edge.

use super::{EdgeCallback, EdgeSource};
use crate::error::{NodeError, Result};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on how long a watcher sleeps before checking for shutdown.
const WATCH_TIMEOUT_MS: u16 = 500;

/// Back-off after a failed value read.
const READ_RETRY_DELAY: Duration = Duration::from_millis(50);

pub struct SysfsGpio {
    root: PathBuf,
    stop: Arc<AtomicBool>,
    watchers: Vec<(u32, JoinHandle<()>)>,
}

impl SysfsGpio {
    /// Use the sysfs GPIO tree at `root` (normally `/sys/class/gpio`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stop: Arc::new(AtomicBool::new(false)),
            watchers: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    /// Export `pin` if needed and configure it as a falling-edge input.
    /// Returns the path of its `value` file.
    pub fn setup_pin(&self, pin: u32) -> Result<PathBuf> {
        let gpio_err = |what: &str, e: std::io::Error| NodeError::Gpio {
            pin,
            message: format!("{}: {}", what, e),
        };

        let dir = self.pin_dir(pin);
        if !dir.exists() {
            fs::write(self.root.join("export"), pin.to_string())
                .map_err(|e| gpio_err("export failed", e))?;
        }
        fs::write(dir.join("direction"), "in").map_err(|e| gpio_err("set direction failed", e))?;
        fs::write(dir.join("edge"), "falling").map_err(|e| gpio_err("set edge failed", e))?;
        Ok(dir.join("value"))
    }
}

impl EdgeSource for SysfsGpio {
    fn register_falling_edge(&mut self, pin: u32, callback: EdgeCallback) -> Result<()> {
        if self.watchers.iter().any(|(p, _)| *p == pin) {
            return Err(NodeError::Gpio {
                pin,
                message: "edge callback already registered".into(),
            });
        }

        let value_path = self.setup_pin(pin)?;
        let file = File::open(&value_path).map_err(|e| NodeError::Gpio {
            pin,
            message: format!("open {} failed: {}", value_path.display(), e),
        })?;

        let stop = self.stop.clone();
        let handle = thread::Builder::new()
            .name(format!("gpio{}-edge", pin))
            .spawn(move || watch_pin(pin, file, callback, stop))?;
        self.watchers.push((pin, handle));
        Ok(())
    }
}

impl Drop for SysfsGpio {
    /// Stops every watcher and waits for it; bounded by one poll timeout.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for (pin, handle) in self.watchers.drain(..) {
            if handle.join().is_err() {
                log::warn!("[GPIO] watcher for pin {} panicked", pin);
            }
        }
    }
}

fn watch_pin(pin: u32, mut file: File, callback: EdgeCallback, stop: Arc<AtomicBool>) {
    log::debug!("[GPIO] watcher for pin {} started", pin);

    // Consume the current level so the first wake-up is a real edge
    let mut buf = [0u8; 8];
    if let Err(e) = file.read(&mut buf) {
        log::warn!("[GPIO] initial read of pin {} failed: {}", pin, e);
    }

    while !stop.load(Ordering::Relaxed) {
        let ready = {
            let mut fds = [PollFd::new(
                file.as_fd(),
                PollFlags::POLLPRI | PollFlags::POLLERR,
            )];
            poll(&mut fds, PollTimeout::from(WATCH_TIMEOUT_MS))
        };

        match ready {
            Ok(0) => continue,
            Ok(_) => {
                // Re-arm: the edge stays signalled until the value is read from offset 0
                let rearmed = file
                    .seek(SeekFrom::Start(0))
                    .and_then(|_| file.read(&mut buf));
                if let Err(e) = rearmed {
                    log::warn!("[GPIO] reading pin {} failed: {}", pin, e);
                    thread::sleep(READ_RETRY_DELAY);
                    continue;
                }
                callback(pin);
            }
            Err(Errno::EINTR) => continue,
            Err(e) => {
                log::error!("[GPIO] poll on pin {} failed, watcher stopped: {}", pin, e);
                break;
            }
        }
    }

    log::debug!("[GPIO] watcher for pin {} stopped", pin);
}
