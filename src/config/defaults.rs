//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse. The numbers are the
//! windows the target network is known to enforce; change them in the config
//! file rather than here.

use std::path::PathBuf;

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// World Defaults
// =============================================================================

pub fn default_host() -> String {
    "localhost".to_string()
}

pub fn default_port() -> u16 {
    25565
}

pub fn default_version() -> String {
    "1.20".to_string()
}

pub fn default_check_timeout_ms() -> u64 {
    120_000
}

pub fn default_profiles_dir() -> PathBuf {
    PathBuf::from("profiles")
}

// =============================================================================
// Login Queue Defaults
// =============================================================================

pub fn default_min_gap_ms() -> u64 {
    15_000
}

pub fn default_login_jitter_ms() -> u64 {
    1_500
}

pub fn default_registration_lock_ms() -> u64 {
    15_000
}

pub fn default_login_throttle_ms() -> u64 {
    15_000
}

pub fn default_cooldown_jitter_min_ms() -> u64 {
    300
}

pub fn default_cooldown_jitter_max_ms() -> u64 {
    700
}

pub fn default_already_online_settle_ms() -> u64 {
    300
}

pub fn default_join_timeout_ms() -> u64 {
    30_000
}

// =============================================================================
// Reconnect Defaults
// =============================================================================

pub fn default_reconnect_min_ms() -> u64 {
    15_000
}

pub fn default_reconnect_max_ms() -> u64 {
    15_000
}

// =============================================================================
// Settle Sequence Defaults
// =============================================================================

pub fn default_server_cmd() -> String {
    "/server factions".to_string()
}

pub fn default_home_cmd() -> String {
    "/home home".to_string()
}

pub fn default_settle_delay_ms() -> u64 {
    1_500
}

pub fn default_server_delay_ms() -> u64 {
    8_000
}

pub fn default_confirm_patterns() -> Vec<String> {
    vec![
        "(?i)teleport".to_string(),
        "(?i)home".to_string(),
        "(?i)moved you".to_string(),
        "(?i)you (?:were|have been) (?:teleported|moved)".to_string(),
        "(?i)now entering".to_string(),
    ]
}

pub fn default_redundancy_attempts() -> u32 {
    4
}

pub fn default_redundancy_gap_ms() -> u64 {
    4_000
}

pub fn default_ensure_attempts() -> u32 {
    3
}

pub fn default_ensure_gap_ms() -> u64 {
    3_500
}

// =============================================================================
// Chat / Marker Defaults
// =============================================================================

pub fn default_chat_cooldown_ms() -> u64 {
    900
}

pub fn default_broadcast_cmd() -> String {
    "/gc".to_string()
}

pub fn default_marker_command_delay_ms() -> u64 {
    400
}

pub fn default_marker_end_delay_ms() -> u64 {
    10_000
}

pub fn default_marker_timeout_ms() -> u64 {
    12_000
}

// =============================================================================
// Kick Pattern Defaults
// =============================================================================

pub fn default_too_fast_pattern() -> String {
    "(?i)logging in too fast".to_string()
}

pub fn default_network_register_pattern() -> String {
    "(?i)unable to register you with the network".to_string()
}

pub fn default_identity_rejected_pattern() -> String {
    "(?i)403|forbidden".to_string()
}

// =============================================================================
// Tracker Defaults
// =============================================================================

pub fn default_completion_prefix() -> String {
    "/a ".to_string()
}

pub fn default_name_pattern() -> String {
    "^[a-zA-Z0-9_]{3,16}$".to_string()
}

pub fn default_max_lookups() -> usize {
    80
}

pub fn default_between_lookups_ms() -> u64 {
    250
}

pub fn default_lookup_timeout_ms() -> u64 {
    4_500
}

pub fn default_lookup_end_delay_ms() -> u64 {
    1_500
}

pub fn default_cache_ttl_ms() -> u64 {
    600_000
}

pub fn default_query_template() -> String {
    "/f who {name}".to_string()
}

pub fn default_header_pattern() -> String {
    r"^\s*-{2,}\s*\[\s*(.+?)\s*\]\s*-{2,}\s*$".to_string()
}

pub fn default_no_group_pattern() -> String {
    r#"(?i)^✘\s+The\s+faction\s+"[^"]+"\s+does\s+not\s+exist\."#.to_string()
}

pub fn default_bot_wait_ms() -> u64 {
    20_000
}

pub fn default_completion_timeout_ms() -> u64 {
    5_000
}

pub fn default_debounce_ms() -> u64 {
    2_000
}

// =============================================================================
// Scan Schedule Defaults
// =============================================================================

pub fn default_interval_minutes() -> u64 {
    5
}

pub fn default_title_prefix() -> String {
    "Shard Tracker".to_string()
}

// =============================================================================
// Bridge Defaults
// =============================================================================

pub fn default_bridge_address() -> String {
    "127.0.0.1:7400".to_string()
}
