//! Network link collaborator (station-mode wireless or wired uplink).

use crate::error::{NodeError, Result};
use async_trait::async_trait;
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use nix::sys::socket::{AddressFamily, SockaddrLike};
use std::net::Ipv4Addr;
use tokio::process::Command;

/// Health of the underlying link as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Radio/interface is down.
    Inactive,
    /// Interface is up but not associated (no carrier or no address).
    ActiveUnassociated,
    /// Associated and addressed.
    Connected,
}

/// Credentials for the station-mode connect command.
#[derive(Debug, Clone, Default)]
pub struct LinkCredentials {
    pub ssid: String,
    pub password: Option<String>,
}

#[async_trait]
pub trait Link: Send + Sync {
    async fn status(&self) -> Result<LinkStatus>;

    /// Bring the radio/interface up.
    async fn activate(&self) -> Result<()>;

    /// Take the radio/interface down.
    async fn deactivate(&self) -> Result<()>;

    /// Issue a connect/associate command.
    async fn connect(&self, credentials: &LinkCredentials) -> Result<()>;

    async fn is_connected(&self) -> bool {
        matches!(self.status().await, Ok(LinkStatus::Connected))
    }
}

/// Link driven through NetworkManager (`nmcli`), status read with `getifaddrs`.
pub struct NmcliLink {
    interface: String,
}

impl NmcliLink {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// First IPv4 address of the interface, if any.
    pub fn ipv4_address(&self) -> Option<Ipv4Addr> {
        let addrs = getifaddrs().ok()?;
        addrs
            .filter(|ifaddr| ifaddr.interface_name == self.interface)
            .find_map(|ifaddr| {
                let addr = ifaddr.address?;
                if addr.family() != Some(AddressFamily::Inet) {
                    return None;
                }
                addr.as_sockaddr_in().map(|sin| sin.ip())
            })
    }

    async fn nmcli(&self, args: &[&str]) -> Result<()> {
        log::debug!("[Link] nmcli {}", redact(args).join(" "));
        let output = Command::new("nmcli")
            .args(args)
            .output()
            .await
            .map_err(|e| NodeError::LinkCommand(format!("failed to run nmcli: {}", e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(NodeError::LinkCommand(format!(
                "nmcli {} exited with {}: {}",
                args.first().copied().unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Hide the password argument in logs.
fn redact<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for &arg in args {
        if hide_next {
            out.push("****");
            hide_next = false;
        } else {
            hide_next = arg == "password";
            out.push(arg);
        }
    }
    out
}

/// Classify interface flags and address presence into a link status.
pub fn classify(found: bool, flags: InterfaceFlags, has_ipv4: bool) -> LinkStatus {
    if !found || !flags.contains(InterfaceFlags::IFF_UP) {
        LinkStatus::Inactive
    } else if flags.contains(InterfaceFlags::IFF_RUNNING) && has_ipv4 {
        LinkStatus::Connected
    } else {
        LinkStatus::ActiveUnassociated
    }
}

#[async_trait]
impl Link for NmcliLink {
    async fn status(&self) -> Result<LinkStatus> {
        let addrs = getifaddrs()
            .map_err(|e| NodeError::LinkCommand(format!("getifaddrs failed: {}", e)))?;

        let mut found = false;
        let mut flags = InterfaceFlags::empty();
        let mut has_ipv4 = false;
        for ifaddr in addrs {
            if ifaddr.interface_name != self.interface {
                continue;
            }
            found = true;
            flags |= ifaddr.flags;
            if let Some(addr) = ifaddr.address
                && addr.family() == Some(AddressFamily::Inet)
            {
                has_ipv4 = true;
            }
        }

        Ok(classify(found, flags, has_ipv4))
    }

    async fn activate(&self) -> Result<()> {
        self.nmcli(&["radio", "wifi", "on"]).await
    }

    async fn deactivate(&self) -> Result<()> {
        self.nmcli(&["radio", "wifi", "off"]).await
    }

    async fn connect(&self, credentials: &LinkCredentials) -> Result<()> {
        if credentials.ssid.is_empty() {
            return self.nmcli(&["device", "connect", self.interface.as_str()]).await;
        }

        let mut args = vec!["device", "wifi", "connect", credentials.ssid.as_str()];
        if let Some(password) = credentials.password.as_deref() {
            args.extend(["password", password]);
        }
        args.extend(["ifname", self.interface.as_str()]);
        self.nmcli(&args).await
    }
}
