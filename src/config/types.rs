//! Core configuration types and loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleetwatch_proto::AuthMode;
use serde::Deserialize;
use thiserror::Error;

use super::defaults::*;
use super::validation::ValidationError;
use crate::store::AccountId;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[inline]
fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Target server.
    #[serde(default)]
    pub world: WorldConfig,
    /// Login admission pacing.
    #[serde(default)]
    pub login: LoginConfig,
    /// Reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Post-join settle sequence.
    #[serde(default)]
    pub settle: SettleConfig,
    /// Outbound chat pacing.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Marker-delimited command capture.
    #[serde(default)]
    pub markers: MarkerConfig,
    /// Kick and error text classification.
    #[serde(default)]
    pub kick: KickConfig,
    /// Tracker scans.
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// External protocol adapter.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Prometheus port; 0 disables the endpoint.
    #[serde(default)]
    pub metrics_port: u16,
    /// Accounts seeding the in-memory credential store.
    #[serde(default, rename = "account")]
    pub accounts: Vec<AccountBlock>,
    /// Role assignments (which account checks what, per scope).
    #[serde(default, rename = "checker")]
    pub checkers: Vec<CheckerBlock>,
    /// Periodic scan schedules.
    #[serde(default, rename = "scan")]
    pub scans: Vec<ScanBlock>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        super::validation::validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Distinct scopes that own at least one account.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = Vec::new();
        for account in &self.accounts {
            if !scopes.contains(&account.scope) {
                scopes.push(account.scope.clone());
            }
        }
        scopes
    }
}

/// Target server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
    /// Root of the per-account token cache directories.
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            version: default_version(),
            check_timeout_ms: default_check_timeout_ms(),
            profiles_dir: default_profiles_dir(),
        }
    }
}

impl WorldConfig {
    pub fn check_timeout(&self) -> Duration {
        ms(self.check_timeout_ms)
    }

    /// Token cache directory for one account.
    pub fn profile_dir(&self, id: AccountId) -> PathBuf {
        self.profiles_dir.join(format!("alt-{id}"))
    }
}

/// Login admission queue pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    /// Minimum gap between two consecutive logins.
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u64,
    /// Upper bound of the random jitter added to gaps and reconnect delays.
    #[serde(default = "default_login_jitter_ms")]
    pub jitter_ms: u64,
    /// Global lock applied after every successful join.
    #[serde(default = "default_registration_lock_ms")]
    pub registration_lock_ms: u64,
    /// Per-account cooldown after a "too fast" kick.
    #[serde(default = "default_login_throttle_ms")]
    pub login_throttle_ms: u64,
    #[serde(default = "default_cooldown_jitter_min_ms")]
    pub cooldown_jitter_min_ms: u64,
    #[serde(default = "default_cooldown_jitter_max_ms")]
    pub cooldown_jitter_max_ms: u64,
    /// Pause after skipping an already-online account.
    #[serde(default = "default_already_online_settle_ms")]
    pub already_online_settle_ms: u64,
    /// How long a connect attempt waits for a decisive event.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: default_min_gap_ms(),
            jitter_ms: default_login_jitter_ms(),
            registration_lock_ms: default_registration_lock_ms(),
            login_throttle_ms: default_login_throttle_ms(),
            cooldown_jitter_min_ms: default_cooldown_jitter_min_ms(),
            cooldown_jitter_max_ms: default_cooldown_jitter_max_ms(),
            already_online_settle_ms: default_already_online_settle_ms(),
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}

impl LoginConfig {
    pub fn min_gap(&self) -> Duration {
        ms(self.min_gap_ms)
    }

    pub fn registration_lock(&self) -> Duration {
        ms(self.registration_lock_ms)
    }

    pub fn login_throttle(&self) -> Duration {
        ms(self.login_throttle_ms)
    }

    pub fn already_online_settle(&self) -> Duration {
        ms(self.already_online_settle_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        ms(self.join_timeout_ms)
    }
}

/// Backoff update policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    /// Always reset to the minimum.
    #[default]
    Fixed,
    /// Grow by 1.5x, clamped to `[min, max]`.
    Multiplicative,
}

/// Reconnect policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub auto: bool,
    #[serde(default = "default_reconnect_min_ms")]
    pub min_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub max_ms: u64,
    #[serde(default)]
    pub mode: BackoffMode,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            auto: true,
            min_ms: default_reconnect_min_ms(),
            max_ms: default_reconnect_max_ms(),
            mode: BackoffMode::default(),
        }
    }
}

impl ReconnectConfig {
    pub fn min(&self) -> Duration {
        ms(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        ms(self.max_ms)
    }
}

/// Scripted post-join sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct SettleConfig {
    /// Hop command; empty or `none` skips the hop.
    #[serde(default = "default_server_cmd")]
    pub server_cmd: String,
    /// Go-home command; empty skips the home step entirely.
    #[serde(default = "default_home_cmd")]
    pub home_cmd: String,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Time the hop needs to complete.
    #[serde(default = "default_server_delay_ms")]
    pub server_delay_ms: u64,
    /// Chat patterns that confirm the home command worked.
    #[serde(default = "default_confirm_patterns")]
    pub confirm_patterns: Vec<String>,
    #[serde(default = "default_redundancy_attempts")]
    pub redundancy_attempts: u32,
    #[serde(default = "default_redundancy_gap_ms")]
    pub redundancy_gap_ms: u64,
    /// Attempts used by the pre-scan ensure-home.
    #[serde(default = "default_ensure_attempts")]
    pub ensure_attempts: u32,
    #[serde(default = "default_ensure_gap_ms")]
    pub ensure_gap_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            server_cmd: default_server_cmd(),
            home_cmd: default_home_cmd(),
            settle_delay_ms: default_settle_delay_ms(),
            server_delay_ms: default_server_delay_ms(),
            confirm_patterns: default_confirm_patterns(),
            redundancy_attempts: default_redundancy_attempts(),
            redundancy_gap_ms: default_redundancy_gap_ms(),
            ensure_attempts: default_ensure_attempts(),
            ensure_gap_ms: default_ensure_gap_ms(),
        }
    }
}

impl SettleConfig {
    pub fn settle_delay(&self) -> Duration {
        ms(self.settle_delay_ms)
    }

    pub fn server_delay(&self) -> Duration {
        ms(self.server_delay_ms)
    }

    /// The hop command with a leading slash, or `None` when disabled.
    pub fn server_command(&self) -> Option<String> {
        slash_command(&self.server_cmd).filter(|c| !c.eq_ignore_ascii_case("/none"))
    }

    /// The home command with a leading slash, or `None` when disabled.
    pub fn home_command(&self) -> Option<String> {
        slash_command(&self.home_cmd)
    }
}

/// Trim and prefix `/`; `None` for blank input.
pub fn slash_command(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    match trimmed.strip_prefix('/') {
        Some(rest) if rest.trim().is_empty() => None,
        Some(_) => Some(trimmed.to_string()),
        None if trimmed.is_empty() => None,
        None => Some(format!("/{trimmed}")),
    }
}

/// Outbound chat pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_chat_cooldown_ms(),
        }
    }
}

impl ChatConfig {
    pub fn cooldown(&self) -> Duration {
        ms(self.cooldown_ms)
    }
}

/// Marker-delimited capture.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    /// Command used to echo a marker back through chat.
    #[serde(default = "default_broadcast_cmd")]
    pub broadcast_cmd: String,
    #[serde(default = "default_marker_command_delay_ms")]
    pub command_delay_ms: u64,
    #[serde(default = "default_marker_end_delay_ms")]
    pub end_delay_ms: u64,
    #[serde(default = "default_marker_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            broadcast_cmd: default_broadcast_cmd(),
            command_delay_ms: default_marker_command_delay_ms(),
            end_delay_ms: default_marker_end_delay_ms(),
            timeout_ms: default_marker_timeout_ms(),
        }
    }
}

impl MarkerConfig {
    pub fn command_delay(&self) -> Duration {
        ms(self.command_delay_ms)
    }

    pub fn end_delay(&self) -> Duration {
        ms(self.end_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        ms(self.timeout_ms)
    }
}

/// Kick and protocol-error text patterns.
#[derive(Debug, Clone, Deserialize)]
pub struct KickConfig {
    #[serde(default = "default_too_fast_pattern")]
    pub too_fast: String,
    #[serde(default = "default_network_register_pattern")]
    pub network_register: String,
    #[serde(default = "default_identity_rejected_pattern")]
    pub identity_rejected: String,
}

impl Default for KickConfig {
    fn default() -> Self {
        Self {
            too_fast: default_too_fast_pattern(),
            network_register: default_network_register_pattern(),
            identity_rejected: default_identity_rejected_pattern(),
        }
    }
}

/// Tracker scan tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Completion prefix whose candidates are the present players.
    #[serde(default = "default_completion_prefix")]
    pub completion_prefix: String,
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,
    #[serde(default = "default_max_lookups")]
    pub max_lookups: usize,
    #[serde(default = "default_between_lookups_ms")]
    pub between_lookups_ms: u64,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    /// Pause between a lookup command and its end marker.
    #[serde(default = "default_lookup_end_delay_ms")]
    pub lookup_end_delay_ms: u64,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Lookup command; `{name}` is replaced with the player name.
    #[serde(default = "default_query_template")]
    pub query_template: String,
    /// Group header line; capture group 1 is the group label.
    #[serde(default = "default_header_pattern")]
    pub header_pattern: String,
    #[serde(default = "default_no_group_pattern")]
    pub no_group_pattern: String,
    /// How long a scan waits for its checker to come online.
    #[serde(default = "default_bot_wait_ms")]
    pub bot_wait_ms: u64,
    #[serde(default = "default_completion_timeout_ms")]
    pub completion_timeout_ms: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            completion_prefix: default_completion_prefix(),
            name_pattern: default_name_pattern(),
            max_lookups: default_max_lookups(),
            between_lookups_ms: default_between_lookups_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            lookup_end_delay_ms: default_lookup_end_delay_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            query_template: default_query_template(),
            header_pattern: default_header_pattern(),
            no_group_pattern: default_no_group_pattern(),
            bot_wait_ms: default_bot_wait_ms(),
            completion_timeout_ms: default_completion_timeout_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl TrackerConfig {
    pub fn between_lookups(&self) -> Duration {
        ms(self.between_lookups_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        ms(self.lookup_timeout_ms)
    }

    pub fn lookup_end_delay(&self) -> Duration {
        ms(self.lookup_end_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        ms(self.cache_ttl_ms)
    }

    pub fn bot_wait(&self) -> Duration {
        ms(self.bot_wait_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        ms(self.completion_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        ms(self.debounce_ms)
    }

    /// Render the lookup command for one player.
    pub fn query_for(&self, name: &str) -> String {
        self.query_template.replace("{name}", name)
    }
}

/// External protocol adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_address")]
    pub address: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: default_bridge_address(),
        }
    }
}

/// One `[[account]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountBlock {
    pub id: AccountId,
    /// Owning scope (guild, team, ...).
    pub scope: String,
    pub label: String,
    #[serde(default)]
    pub auth: AuthMode,
    /// Login name; the label is used when absent.
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One `[[checker]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckerBlock {
    pub scope: String,
    pub role: String,
    pub account: AccountId,
}

/// One `[[scan]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanBlock {
    pub scope: String,
    pub role: String,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,
}

impl ScanBlock {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}
