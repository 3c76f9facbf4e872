//! Per-player group lookup.
//!
//! Each query is wrapped in start/end markers, so only a reply that lands
//! inside its own window counts. A late answer to an earlier query falls
//! outside every window and is dropped.

use std::sync::Arc;

use fleetwatch_proto::WorldConnection;
use tracing::debug;

use super::cache::GroupLabel;
use crate::config::Patterns;
use crate::fleet::Fleet;
use crate::query::CaptureWindow;
use crate::state::SessionHandle;

/// First group header or no-group line among `lines`.
pub fn parse_group_reply<'a, I>(lines: I, patterns: &Patterns) -> Option<GroupLabel>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().map(str::trim).find_map(|line| {
        if let Some(caps) = patterns.group_header.captures(line)
            && let Some(label) = caps.get(1)
        {
            return Some(GroupLabel::Named(label.as_str().to_string()));
        }
        patterns.no_group.is_match(line).then_some(GroupLabel::NoGroup)
    })
}

impl Fleet {
    /// Resolve a player's group, from cache or by a marked query.
    ///
    /// The caller holds the session's command guard. `None` means no
    /// recognisable answer arrived inside the window; nothing is cached.
    pub(crate) async fn lookup_group(
        &self,
        session: &SessionHandle,
        conn: &Arc<dyn WorldConnection>,
        name: &str,
    ) -> Option<GroupLabel> {
        if let Some(hit) = self.inner.cache.get(name) {
            crate::metrics::record_lookup("cache");
            return Some(hit);
        }

        let config = &self.inner.config;
        let window = CaptureWindow::lookups(&config.markers, &config.tracker);
        let captured = self
            .capture_between_markers(session, conn, &config.tracker.query_for(name), window)
            .await;

        let found = captured
            .as_deref()
            .and_then(|lines| parse_group_reply(lines.iter().map(String::as_str), &self.inner.patterns));
        match &found {
            Some(label) => {
                self.inner.cache.insert(name, label.clone());
                crate::metrics::record_lookup("query");
            }
            None if captured.is_some() => {
                debug!(player = %name, "no group line inside the lookup window");
                crate::metrics::record_lookup("unanswered");
            }
            None => {
                debug!(player = %name, "lookup timed out");
                crate::metrics::record_lookup("timeout");
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn patterns() -> Patterns {
        Patterns::compile(&Config::default()).unwrap()
    }

    #[test]
    fn test_parse_header_reply() {
        let lines = ["[Guild] scout: noise", "------------[ Wolves ]------------", "Leader: someone"];
        assert_eq!(
            parse_group_reply(lines, &patterns()),
            Some(GroupLabel::Named("Wolves".into()))
        );
    }

    #[test]
    fn test_parse_no_group_reply() {
        let lines = [r#"✘ The faction "Notch" does not exist."#];
        assert_eq!(parse_group_reply(lines, &patterns()), Some(GroupLabel::NoGroup));
    }

    #[test]
    fn test_parse_unrelated_lines() {
        assert_eq!(parse_group_reply(["Leader: someone", ""], &patterns()), None);
        assert_eq!(parse_group_reply(std::iter::empty(), &patterns()), None);
    }
}
