//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions, one per TOML table
//! - [`defaults`]: serde default functions for every tunable
//! - [`validation`]: cross-field checks and pattern compilation
//! - [`patterns`]: the compiled server-text patterns shared at runtime

mod defaults;
mod patterns;
mod types;
mod validation;

pub use patterns::Patterns;
pub use types::{
    AccountBlock, BackoffMode, BridgeConfig, ChatConfig, CheckerBlock, Config, ConfigError,
    KickConfig, LoginConfig, MarkerConfig, ReconnectConfig, ScanBlock, SettleConfig,
    TrackerConfig, WorldConfig, slash_command,
};
pub use validation::{ValidationError, validate};
