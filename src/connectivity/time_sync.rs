//! Clock synchronization against an SNTP server.
//!
//! The exchange is done by `rsntp`; this module only turns the measured
//! offset into the correction held by [`SystemClock`].

use crate::clock::SystemClock;
use crate::error::{NodeError, Result};
use async_trait::async_trait;
use rsntp::AsyncSntpClient;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait TimeSync: Send + Sync {
    /// Synchronize the node clock. Returns the applied offset in ms.
    async fn sync(&self) -> Result<i64>;
}

pub struct SntpTimeSync {
    server: String,
    client: AsyncSntpClient,
    clock: Arc<SystemClock>,
}

impl SntpTimeSync {
    /// `server` is a host or IP, optionally with `:port` (default 123).
    pub fn new(server: impl Into<String>, timeout: Duration, clock: Arc<SystemClock>) -> Self {
        let config = rsntp::Config::default().timeout(timeout);
        Self {
            server: server.into(),
            client: AsyncSntpClient::with_config(config),
            clock,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

/// Offset in whole milliseconds, rounded to nearest.
fn offset_to_ms(offset_secs: f64) -> i64 {
    (offset_secs * 1000.0).round() as i64
}

#[async_trait]
impl TimeSync for SntpTimeSync {
    async fn sync(&self) -> Result<i64> {
        let result = self
            .client
            .synchronize(self.server.as_str())
            .await
            .map_err(|e| NodeError::TimeSync(format!("{}: {}", self.server, e)))?;

        // Offset is relative to the host clock, so it replaces the old correction
        let offset = offset_to_ms(result.clock_offset().as_secs_f64());
        self.clock.set_offset_ms(offset);
        log::info!("[Clock] synchronized with {} (offset {} ms)", self.server, offset);
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;
    use tokio_test::{assert_err, assert_ok};

    const NTP_UNIX_OFFSET_SECS: i64 = 2_208_988_800;

    /// Server reply answering `request`, reporting `unix_secs` as its time.
    fn reply(request: &[u8], unix_secs: i64) -> [u8; 48] {
        let mut packet = [0u8; 48];
        packet[0] = 0x24; // LI 0, VN 4, server
        packet[1] = 2;
        packet[2] = 6;
        packet[3] = 0xEC;
        packet[12..16].copy_from_slice(b"GPS\0");

        let ntp_secs = ((unix_secs + NTP_UNIX_OFFSET_SECS) as u32).to_be_bytes();
        packet[16..20].copy_from_slice(&ntp_secs);
        // Originate = client's transmit timestamp
        packet[24..32].copy_from_slice(&request[40..48]);
        packet[32..36].copy_from_slice(&ntp_secs);
        packet[40..44].copy_from_slice(&ntp_secs);
        packet
    }

    #[test]
    fn test_offset_to_ms() {
        assert_eq!(offset_to_ms(5.0), 5_000);
        assert_eq!(offset_to_ms(-1.0004), -1_000);
        assert_eq!(offset_to_ms(0.0126), 13);
    }

    #[tokio::test]
    async fn test_sync_against_local_server() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        // Server is one hour ahead of the host
        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 128];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(len, 48);
            let now_secs = SystemClock::local_unix_ms() / 1000 + 3_600;
            server.send_to(&reply(&buf[..len], now_secs), peer).await.unwrap();
        });

        let clock = Arc::new(SystemClock::new());
        let sync = SntpTimeSync::new(addr.to_string(), Duration::from_secs(2), clock.clone());
        let offset = assert_ok!(sync.sync().await);
        server_task.await.unwrap();

        assert!((offset - 3_600_000).abs() < 2_000, "offset {}", offset);
        assert_eq!(clock.offset_ms(), offset);
    }

    #[tokio::test]
    async fn test_sync_times_out() {
        // Bound but silent
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();

        let clock = Arc::new(SystemClock::new());
        let sync = SntpTimeSync::new(addr.to_string(), Duration::from_millis(100), clock.clone());
        let err = assert_err!(sync.sync().await);
        assert!(matches!(err, NodeError::TimeSync(_)));
        assert_eq!(clock.offset_ms(), 0);
    }
}
