//! Scripted collaborators for unit tests.

use crate::connectivity::{Link, LinkCredentials, LinkStatus, TimeSync};
use crate::error::{NodeError, Result};
use crate::report::HttpTransport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub body: String,
}

/// HTTP transport answering from a queue of scripted outcomes.
///
/// With an empty queue it answers the `fallback` status, or fails like an
/// unreachable host when no fallback is set.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<std::result::Result<u16, String>>>,
    fallback: Mutex<Option<u16>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, status: u16) {
        self.script.lock().push_back(Ok(status));
    }

    pub fn push_failure(&self, message: &str) {
        self.script.lock().push_back(Err(message.to_string()));
    }

    pub fn set_fallback(&self, status: Option<u16>) {
        *self.fallback.lock() = status;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post(&self, url: &str, body: String) -> Result<u16> {
        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            body,
        });
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(NodeError::Transport(message)),
            None => match *self.fallback.lock() {
                Some(status) => Ok(status),
                None => Err(NodeError::Transport("host unreachable".into())),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCall {
    Status,
    Activate,
    Deactivate,
    Connect,
}

/// Link whose status follows the commands issued to it.
pub struct ScriptedLink {
    status: Mutex<LinkStatus>,
    status_after_connect: Mutex<LinkStatus>,
    connect_failures: AtomicU32,
    status_fails: AtomicBool,
    calls: Mutex<Vec<LinkCall>>,
}

impl ScriptedLink {
    pub fn new(initial: LinkStatus) -> Self {
        Self {
            status: Mutex::new(initial),
            status_after_connect: Mutex::new(LinkStatus::Connected),
            connect_failures: AtomicU32::new(0),
            status_fails: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_status(&self, status: LinkStatus) {
        *self.status.lock() = status;
    }

    pub fn set_status_after_connect(&self, status: LinkStatus) {
        *self.status_after_connect.lock() = status;
    }

    /// Make the next `n` connect commands fail.
    pub fn fail_connects(&self, n: u32) {
        self.connect_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_status(&self, fail: bool) {
        self.status_fails.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<LinkCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: LinkCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }
}

#[async_trait]
impl Link for ScriptedLink {
    async fn status(&self) -> Result<LinkStatus> {
        self.calls.lock().push(LinkCall::Status);
        if self.status_fails.load(Ordering::SeqCst) {
            return Err(NodeError::LinkCommand("driver not responding".into()));
        }
        Ok(*self.status.lock())
    }

    async fn activate(&self) -> Result<()> {
        self.calls.lock().push(LinkCall::Activate);
        let mut status = self.status.lock();
        if *status == LinkStatus::Inactive {
            *status = LinkStatus::ActiveUnassociated;
        }
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        self.calls.lock().push(LinkCall::Deactivate);
        *self.status.lock() = LinkStatus::Inactive;
        Ok(())
    }

    async fn connect(&self, _credentials: &LinkCredentials) -> Result<()> {
        self.calls.lock().push(LinkCall::Connect);
        let remaining = self.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.connect_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(NodeError::LinkCommand("association rejected".into()));
        }
        let after = *self.status_after_connect.lock();
        *self.status.lock() = after;
        Ok(())
    }
}

/// Time sync that counts attempts and can be told to fail.
#[derive(Default)]
pub struct CountingTimeSync {
    attempts: AtomicU32,
    failures: AtomicU32,
}

impl CountingTimeSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeSync for CountingTimeSync {
    async fn sync(&self) -> Result<i64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(NodeError::TimeSync("no reply".into()));
        }
        Ok(0)
    }
}
