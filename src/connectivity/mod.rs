//! Uplink management: link driver, time sync and the supervisor tying them together.

pub mod link;
pub mod supervisor;
pub mod time_sync;

pub use link::{Link, LinkCredentials, LinkStatus, NmcliLink};
pub use supervisor::{ConnectionState, ConnectivitySupervisor, LinkPhase};
pub use time_sync::{SntpTimeSync, TimeSync};
