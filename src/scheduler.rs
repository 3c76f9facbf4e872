//! Periodic tracker scans.
//!
//! Every tick checks the `[[scan]]` blocks and starts the ones whose
//! interval has elapsed. The interval is claimed before the scan runs, so a
//! slow scan is not started twice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ScanBlock;
use crate::fleet::Fleet;
use crate::notify::Notice;

/// How often the schedule is evaluated.
pub const TICK: Duration = Duration::from_secs(10);
/// A scan is due this much before its interval has fully elapsed.
const EARLY_SLACK: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Clone, Copy)]
struct RunRecord {
    last_claim: Option<Instant>,
    running: bool,
}

pub struct Scheduler {
    fleet: Fleet,
    scans: Vec<ScanBlock>,
    debounce: Duration,
    runs: Mutex<HashMap<(String, String), RunRecord>>,
}

impl Scheduler {
    pub fn new(fleet: Fleet, scans: Vec<ScanBlock>) -> Self {
        let debounce = fleet.config().tracker.debounce();
        Self {
            fleet,
            scans,
            debounce,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Claim every scan that is due at `now`.
    pub fn due(&self, now: Instant) -> Vec<ScanBlock> {
        let mut runs = self.runs.lock();
        let mut due = Vec::new();
        for block in self.scans.iter().filter(|b| b.enabled) {
            let record = runs
                .entry((block.scope.clone(), block.role.clone()))
                .or_default();
            if record.running {
                continue;
            }
            let next = record
                .last_claim
                .map(|t| t + block.interval().saturating_sub(EARLY_SLACK).max(self.debounce));
            if next.is_none_or(|next| now >= next) {
                record.last_claim = Some(now);
                record.running = true;
                due.push(block.clone());
            }
        }
        due
    }

    fn finished(&self, block: &ScanBlock) {
        if let Some(record) = self
            .runs
            .lock()
            .get_mut(&(block.scope.clone(), block.role.clone()))
        {
            record.running = false;
        }
    }

    /// Start every due scan. Returns how many were started.
    pub fn tick(self: &Arc<Self>) -> usize {
        let due = self.due(Instant::now());
        let started = due.len();
        for block in due {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                scheduler.run_one(&block).await;
                scheduler.finished(&block);
            });
        }
        started
    }

    async fn run_one(&self, block: &ScanBlock) {
        debug!(scope = %block.scope, role = %block.role, "scheduled scan starting");
        match self
            .fleet
            .run_scan_titled(&block.scope, &block.role, &block.title_prefix)
            .await
        {
            Ok(report) => {
                info!(scope = %block.scope, role = %block.role, title = %report.title, "scheduled scan complete");
                self.fleet.notify(&block.scope, Notice::ScanReport(report)).await;
            }
            Err(e) => {
                warn!(scope = %block.scope, role = %block.role, error = %e, code = e.error_code(), "scheduled scan failed");
            }
        }
    }
}

/// Spawn the scheduler loop.
pub fn spawn_scan_scheduler(scheduler: Arc<Scheduler>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            scheduler.tick();
        }
    })
}
