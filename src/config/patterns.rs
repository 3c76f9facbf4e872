//! Compiled text patterns.
//!
//! Every server phrase fleetwatch reacts to is configurable, so the
//! patterns are compiled once from [`Config`] and shared by reference.

use regex::Regex;

use super::validation::compile;
use super::{Config, ConfigError};

/// All server-text patterns, compiled.
#[derive(Debug, Clone)]
pub struct Patterns {
    /// Chat lines confirming the go-home command.
    pub confirm: Vec<Regex>,
    /// Kick text for per-account login throttling.
    pub too_fast: Regex,
    /// Kick text for network-wide registration throttling.
    pub network_register: Regex,
    /// Protocol error text for a rejected world-entry token.
    pub identity_rejected: Regex,
    /// Plausible player name.
    pub player_name: Regex,
    /// Group header; capture group 1 is the label.
    pub group_header: Regex,
    /// "Player has no group" reply.
    pub no_group: Regex,
}

impl Patterns {
    /// Compile every pattern in `config`.
    pub fn compile(config: &Config) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();

        let confirm: Vec<Option<Regex>> = config
            .settle
            .confirm_patterns
            .iter()
            .map(|p| compile("settle.confirm_patterns", p, &mut errors))
            .collect();
        let too_fast = compile("kick.too_fast", &config.kick.too_fast, &mut errors);
        let network_register =
            compile("kick.network_register", &config.kick.network_register, &mut errors);
        let identity_rejected =
            compile("kick.identity_rejected", &config.kick.identity_rejected, &mut errors);
        let player_name = compile("tracker.name_pattern", &config.tracker.name_pattern, &mut errors);
        let group_header =
            compile("tracker.header_pattern", &config.tracker.header_pattern, &mut errors);
        let no_group = compile("tracker.no_group_pattern", &config.tracker.no_group_pattern, &mut errors);

        match (too_fast, network_register, identity_rejected, player_name, group_header, no_group) {
            (Some(too_fast), Some(network_register), Some(identity_rejected), Some(player_name), Some(group_header), Some(no_group))
                if errors.is_empty() =>
            {
                Ok(Self {
                    confirm: confirm.into_iter().flatten().collect(),
                    too_fast,
                    network_register,
                    identity_rejected,
                    player_name,
                    group_header,
                    no_group,
                })
            }
            _ => Err(ConfigError::Invalid(errors)),
        }
    }

    /// Whether `line` confirms the go-home command.
    pub fn is_home_confirmation(&self, line: &str) -> bool {
        self.confirm.iter().any(|re| re.is_match(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns() {
        let patterns = Patterns::compile(&Config::default()).unwrap();
        assert!(patterns.is_home_confirmation("Teleporting you home..."));
        assert!(patterns.is_home_confirmation("You have been moved to spawn"));
        assert!(!patterns.is_home_confirmation("Balance: 500"));

        assert!(patterns.too_fast.is_match("You are Logging In Too Fast, slow down"));
        assert!(patterns.identity_rejected.is_match("Request failed: 403 Forbidden"));
        assert!(patterns.player_name.is_match("Steve_01"));
        assert!(!patterns.player_name.is_match("no"));

        let caps = patterns.group_header.captures("----- [ Wardens ] -----").unwrap();
        assert_eq!(&caps[1], "Wardens");
        assert!(patterns
            .no_group
            .is_match("✘ The faction \"Steve\" does not exist."));
    }

    #[test]
    fn test_invalid_pattern_reports_field() {
        let mut config = Config::default();
        config.tracker.no_group_pattern = "[".to_string();
        match Patterns::compile(&config) {
            Err(ConfigError::Invalid(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected invalid config, got {:?}", other.map(|_| ())),
        }
    }
}
