//! Connectivity supervisor: keeps the uplink alive.
//!
//! `ensure_connected()` runs once per main-loop pass. It is cheap when the
//! link is healthy and otherwise drives one step of the
//! `Disconnected -> Connecting -> Connected` cycle. Failures are logged and
//! leave the supervisor offline for the next pass; nothing escapes.

use super::link::{Link, LinkCredentials, LinkStatus};
use super::time_sync::TimeSync;
use crate::clock::Clock;
use crate::error::Result;
use log::{debug, info, warn};
use std::sync::Arc;

/// Supervisor phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Disconnected,
    /// Connect command issued at `since_ms`, waiting for association.
    Connecting { since_ms: u64 },
    Connected,
}

/// Uplink health as seen by the rest of the node.
///
/// `online` is only true while the supervisor is in `Connected`, which it
/// only enters after the link itself reported connected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub online: bool,
    pub last_sync_time: Option<u64>,
}

pub struct ConnectivitySupervisor {
    link: Arc<dyn Link>,
    time_sync: Option<Arc<dyn TimeSync>>,
    clock: Arc<dyn Clock>,
    credentials: LinkCredentials,
    connect_timeout_ms: u64,
    phase: LinkPhase,
    state: ConnectionState,
}

impl ConnectivitySupervisor {
    pub fn new(
        link: Arc<dyn Link>,
        time_sync: Option<Arc<dyn TimeSync>>,
        clock: Arc<dyn Clock>,
        credentials: LinkCredentials,
        connect_timeout_ms: u64,
    ) -> Self {
        Self {
            link,
            time_sync,
            clock,
            credentials,
            connect_timeout_ms,
            phase: LinkPhase::Disconnected,
            state: ConnectionState::default(),
        }
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state.online
    }

    /// Verify the link and advance the connection cycle by one step.
    pub async fn ensure_connected(&mut self) -> LinkPhase {
        let status = match self.link.status().await {
            Ok(status) => status,
            Err(e) => {
                warn!("[Link] status check failed: {}", e);
                self.go_offline();
                return self.phase;
            }
        };

        match (self.phase, status) {
            (LinkPhase::Connected, LinkStatus::Connected) => return self.phase,
            (LinkPhase::Connected, status) => {
                warn!("[Link] link dropped ({:?}), reconnecting", status);
                self.go_offline();
            }
            (LinkPhase::Connecting { .. }, LinkStatus::Connected)
            | (LinkPhase::Disconnected, LinkStatus::Connected) => {
                self.complete_connection().await;
                return self.phase;
            }
            (LinkPhase::Connecting { .. }, LinkStatus::Inactive) => {
                warn!("[Link] radio went down while associating, reconnecting");
                self.go_offline();
            }
            (LinkPhase::Connecting { since_ms }, status) => {
                let waited = self.clock.now_ms().saturating_sub(since_ms);
                if waited < self.connect_timeout_ms {
                    debug!("[Link] still associating ({:?}, {} ms)", status, waited);
                    return self.phase;
                }
                warn!("[Link] no association after {} ms, resetting", waited);
                self.go_offline();
            }
            (LinkPhase::Disconnected, _) => {}
        }

        if let Err(e) = self.reconnect(status).await {
            warn!("[Link] reconnect failed: {}", e);
            self.go_offline();
            return self.phase;
        }

        match self.link.status().await {
            Ok(LinkStatus::Connected) => self.complete_connection().await,
            Ok(_) => {
                self.phase = LinkPhase::Connecting {
                    since_ms: self.clock.now_ms(),
                };
            }
            Err(e) => {
                warn!("[Link] status check after connect failed: {}", e);
                self.go_offline();
            }
        }
        self.phase
    }

    /// Bring the radio up and issue connect.
    ///
    /// A link stuck active but unassociated gets a full radio reset first.
    async fn reconnect(&self, status: LinkStatus) -> Result<()> {
        match status {
            LinkStatus::ActiveUnassociated => {
                info!("[Link] resetting radio");
                self.link.deactivate().await?;
                self.link.activate().await?;
            }
            LinkStatus::Inactive => self.link.activate().await?,
            LinkStatus::Connected => {}
        }
        info!("[Link] connecting to '{}'", self.credentials.ssid);
        self.link.connect(&self.credentials).await
    }

    /// Fresh transition into `Connected`: one time sync attempt.
    async fn complete_connection(&mut self) {
        if let Some(time_sync) = &self.time_sync {
            if let Err(e) = time_sync.sync().await {
                warn!("[Link] time sync failed: {}", e);
                self.go_offline();
                return;
            }
            self.state.last_sync_time = Some(self.clock.now_ms());
        }
        self.phase = LinkPhase::Connected;
        self.state.online = true;
        info!("[Link] online");
    }

    fn go_offline(&mut self) {
        self.phase = LinkPhase::Disconnected;
        self.state.online = false;
    }
}
