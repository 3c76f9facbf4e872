//! fleetwatch - presence-client fleet manager
//!
//! Keeps a fleet of long-lived game clients online on one server: paced
//! logins through a single admission queue, automatic reconnects with
//! kick-aware cooldowns, a settle sequence that moves each client home,
//! world-label capture from the side panel, and tracker scans that turn
//! chat replies into grouped reports.

pub mod capture;
pub mod config;
pub mod error;
pub mod fleet;
pub mod http;
pub mod metrics;
pub mod network;
pub mod notify;
pub mod query;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod tracker;

pub use crate::config::Config;
pub use crate::error::FleetError;
pub use crate::fleet::{Fleet, SessionSummary};
pub use crate::notify::{Notice, NotificationSink};
pub use crate::scheduler::{Scheduler, spawn_scan_scheduler};
pub use crate::session::LoginOutcome;
pub use crate::state::SessionPhase;
pub use crate::store::{AccountId, AccountStatus, AltAccount, CredentialStore};
pub use crate::tracker::ScanReport;
