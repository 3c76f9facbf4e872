//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use super::Config;
use crate::store::AccountId;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("world.host is required")]
    MissingHost,
    #[error("reconnect.min_ms ({min}) must not exceed reconnect.max_ms ({max})")]
    BackoffRange { min: u64, max: u64 },
    #[error("login.cooldown_jitter_min_ms ({min}) must not exceed cooldown_jitter_max_ms ({max})")]
    JitterRange { min: u64, max: u64 },
    #[error("{field}: invalid pattern '{pattern}': {reason}")]
    BadPattern {
        field: &'static str,
        pattern: String,
        reason: String,
    },
    #[error("tracker.header_pattern must have a capture group for the group label")]
    HeaderWithoutGroup,
    #[error("tracker.query_template must contain {{name}}")]
    QueryWithoutName,
    #[error("tracker.lookup_end_delay_ms ({end_delay}) must be below tracker.lookup_timeout_ms ({timeout})")]
    LookupWindow { end_delay: u64, timeout: u64 },
    #[error("duplicate account id {0}")]
    DuplicateAccount(AccountId),
    #[error("checker for scope '{scope}' references unknown account {account}")]
    UnknownChecker { scope: String, account: AccountId },
}

/// Compile one pattern, recording a validation error on failure.
pub(crate) fn compile(
    field: &'static str,
    pattern: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            errors.push(ValidationError::BadPattern {
                field,
                pattern: pattern.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.world.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }

    if config.reconnect.min_ms > config.reconnect.max_ms {
        errors.push(ValidationError::BackoffRange {
            min: config.reconnect.min_ms,
            max: config.reconnect.max_ms,
        });
    }

    let login = &config.login;
    if login.cooldown_jitter_min_ms > login.cooldown_jitter_max_ms {
        errors.push(ValidationError::JitterRange {
            min: login.cooldown_jitter_min_ms,
            max: login.cooldown_jitter_max_ms,
        });
    }

    // Patterns
    for pattern in &config.settle.confirm_patterns {
        compile("settle.confirm_patterns", pattern, &mut errors);
    }
    compile("kick.too_fast", &config.kick.too_fast, &mut errors);
    compile("kick.network_register", &config.kick.network_register, &mut errors);
    compile("kick.identity_rejected", &config.kick.identity_rejected, &mut errors);
    compile("tracker.name_pattern", &config.tracker.name_pattern, &mut errors);
    compile("tracker.no_group_pattern", &config.tracker.no_group_pattern, &mut errors);
    if let Some(header) = compile("tracker.header_pattern", &config.tracker.header_pattern, &mut errors)
        && header.captures_len() < 2
    {
        errors.push(ValidationError::HeaderWithoutGroup);
    }

    if !config.tracker.query_template.contains("{name}") {
        errors.push(ValidationError::QueryWithoutName);
    }
    let tracker = &config.tracker;
    if tracker.lookup_end_delay_ms >= tracker.lookup_timeout_ms {
        errors.push(ValidationError::LookupWindow {
            end_delay: tracker.lookup_end_delay_ms,
            timeout: tracker.lookup_timeout_ms,
        });
    }

    // Accounts and role assignments
    let mut seen = HashSet::new();
    for account in &config.accounts {
        if !seen.insert(account.id) {
            errors.push(ValidationError::DuplicateAccount(account.id));
        }
    }
    for checker in &config.checkers {
        if !seen.contains(&checker.account) {
            errors.push(ValidationError::UnknownChecker {
                scope: checker.scope.clone(),
                account: checker.account,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
