//! Tracker scans.

use std::collections::{HashMap, HashSet};

use tokio::time::sleep;
use tracing::{Instrument, info, warn};

use super::cache::GroupLabel;
use super::report::ScanReport;
use crate::error::FleetError;
use crate::fleet::Fleet;
use crate::telemetry::{ScanTimer, spans};

/// Title prefix used when the caller has none.
pub const DEFAULT_TITLE_PREFIX: &str = "Shard Tracker";

/// Keep plausible player names, first occurrence wins, at most `max`.
pub fn candidate_names<I>(completions: I, pattern: &regex::Regex, max: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    completions
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|name| pattern.is_match(name))
        .filter(|name| seen.insert(name.clone()))
        .take(max)
        .collect()
}

impl Fleet {
    /// Scan the world of the checker assigned to `role` in `scope`.
    pub async fn run_scan(&self, scope: &str, role: &str) -> Result<ScanReport, FleetError> {
        self.run_scan_titled(scope, role, DEFAULT_TITLE_PREFIX).await
    }

    pub async fn run_scan_titled(
        &self,
        scope: &str,
        role: &str,
        title_prefix: &str,
    ) -> Result<ScanReport, FleetError> {
        let span = spans::scan(scope, role);
        self.scan_inner(scope, role, title_prefix).instrument(span).await
    }

    async fn scan_inner(
        &self,
        scope: &str,
        role: &str,
        title_prefix: &str,
    ) -> Result<ScanReport, FleetError> {
        let mut timer = ScanTimer::new();
        let Some(id) = self.inner.store.checker_for(scope, role).await? else {
            timer.finish("no_checker");
            return Err(FleetError::NoChecker {
                scope: scope.to_string(),
                role: role.to_string(),
            });
        };

        if let Err(e) = self.ensure_online(id).await {
            warn!(account = id, "checker not connected; skipping scan");
            timer.finish("offline");
            return Err(e);
        }
        match self.ensure_home(id).await {
            Ok(true) => {}
            Ok(false) => warn!(account = id, "home not confirmed before scan"),
            Err(e) => {
                timer.finish("offline");
                return Err(e);
            }
        }

        let session = self.session(id);
        let tracker = &self.inner.config.tracker;
        let _guard = session.command_guard().await;
        let Some(conn) = session.connection().filter(|_| session.is_online()) else {
            timer.finish("offline");
            return Err(FleetError::NotOnline(id));
        };

        let completions = match conn
            .complete(&tracker.completion_prefix, tracker.completion_timeout())
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                warn!(account = id, error = %e, "name completion failed");
                Vec::new()
            }
        };
        let names = candidate_names(completions, &self.inner.patterns.player_name, tracker.max_lookups);

        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        let mut no_group = Vec::new();
        let mut unresolved = 0;
        for name in &names {
            match self.lookup_group(&session, &conn, name).await {
                Some(GroupLabel::Named(label)) => groups.entry(label).or_default().push(name.clone()),
                Some(GroupLabel::NoGroup) => no_group.push(name.clone()),
                None => unresolved += 1,
            }
            sleep(tracker.between_lookups()).await;
        }

        let world = self.get_world_label(id);
        let report = ScanReport::build(title_prefix, world, names.len(), groups, no_group, unresolved);
        info!(
            account = id,
            players = report.total,
            fields = report.fields.len(),
            unresolved,
            "scan finished"
        );
        timer.finish("ok");
        Ok(report)
    }
}
