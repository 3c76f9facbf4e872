//! World-state capture.
//!
//! Watches side-panel snapshots pushed by the server and keeps the current
//! world label. Capture is attached on join but stays *disarmed* until the
//! settle sequence has confirmed the account is home; before that the panel
//! still shows the lobby and would produce the wrong label.

use fleetwatch_proto::Objective;
use tokio::time::Instant;

mod heuristic;

pub use heuristic::{normalize_for_match, pick_world_label};

/// Capture state for one session.
#[derive(Debug, Default)]
pub struct WorldCapture {
    attached: bool,
    armed: bool,
    current: Option<Objective>,
    last_lines: Option<Vec<String>>,
    label: Option<String>,
    updated_at: Option<Instant>,
}

impl WorldCapture {
    /// Start listening for a fresh connection. Disarmed until [`arm`](Self::arm).
    pub fn attach(&mut self) {
        *self = Self {
            attached: true,
            ..Self::default()
        };
    }

    /// Stop listening, disarm and forget the cached label.
    pub fn detach(&mut self) {
        *self = Self::default();
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Cached world label, if one has been captured since arming.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn updated_at(&self) -> Option<Instant> {
        self.updated_at
    }

    /// Feed one display snapshot. Returns the new label when it changed.
    pub fn observe(&mut self, objective: Objective) -> Option<String> {
        if !self.attached {
            return None;
        }
        if objective.is_sidebar() {
            self.current = Some(objective);
        } else if self.current.as_ref().is_some_and(|c| c.name == objective.name) {
            // Moved off the side panel.
            self.current = None;
            return None;
        } else {
            return None;
        }
        self.recompute()
    }

    /// Arm capture and evaluate immediately.
    ///
    /// `probe` is the connection's current side panel, used when no snapshot
    /// has been observed since attaching.
    pub fn arm(&mut self, probe: Option<Objective>) -> Option<String> {
        if !self.attached {
            return None;
        }
        self.armed = true;
        if self.current.is_none() {
            self.current = probe.filter(Objective::is_sidebar);
        }
        self.recompute()
    }

    fn recompute(&mut self) -> Option<String> {
        if !self.armed {
            return None;
        }
        let current = self.current.as_ref()?;
        let lines = current.lines();

        if self.last_lines.as_ref() != Some(&lines) {
            tracing::debug!(title = %current.title, lines = ?lines, "side panel changed");
        }
        let label = pick_world_label(&lines);
        self.last_lines = Some(lines);

        match label {
            Some(label) if self.label.as_deref() != Some(label.as_str()) => {
                self.label = Some(label.clone());
                self.updated_at = Some(Instant::now());
                Some(label)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_proto::{DisplaySlot, ScoreEntry};

    fn panel(rows: &[&str]) -> Objective {
        let n = rows.len() as i32;
        Objective {
            name: "sb".into(),
            title: "Factions".into(),
            slot: Some(DisplaySlot::Sidebar),
            entries: rows
                .iter()
                .enumerate()
                .map(|(i, r)| ScoreEntry::new(*r, n - i as i32))
                .collect(),
        }
    }

    #[test]
    fn test_no_label_while_disarmed() {
        let mut capture = WorldCapture::default();
        capture.attach();
        assert_eq!(capture.observe(panel(&["Season Four", "Factionville"])), None);
        assert_eq!(capture.label(), None);
    }

    #[test]
    fn test_arm_uses_observed_panel() {
        let mut capture = WorldCapture::default();
        capture.attach();
        capture.observe(panel(&["Season Four", "Factionville"]));
        assert_eq!(capture.arm(None).as_deref(), Some("Factionville"));
        assert_eq!(capture.label(), Some("Factionville"));
        assert!(capture.updated_at().is_some());
    }

    #[test]
    fn test_arm_probes_connection() {
        let mut capture = WorldCapture::default();
        capture.attach();
        assert_eq!(
            capture.arm(Some(panel(&["Season Two", "Ironhold"]))).as_deref(),
            Some("Ironhold")
        );
    }

    #[test]
    fn test_updates_after_arming() {
        let mut capture = WorldCapture::default();
        capture.attach();
        capture.arm(None);
        assert_eq!(
            capture.observe(panel(&["Season Four", "Factionville"])).as_deref(),
            Some("Factionville")
        );
        // Same label again is not a change.
        assert_eq!(capture.observe(panel(&["Season Four", "Factionville"])), None);
        assert_eq!(
            capture.observe(panel(&["Season Four", "Ironhold"])).as_deref(),
            Some("Ironhold")
        );
    }

    #[test]
    fn test_detach_clears_everything() {
        let mut capture = WorldCapture::default();
        capture.attach();
        capture.arm(Some(panel(&["Season Four", "Factionville"])));
        capture.detach();
        assert!(!capture.is_armed());
        assert_eq!(capture.label(), None);
        // Detached capture ignores snapshots.
        assert_eq!(capture.observe(panel(&["Season Four", "Ironhold"])), None);
    }

    #[test]
    fn test_non_sidebar_ignored() {
        let mut capture = WorldCapture::default();
        capture.attach();
        capture.arm(None);
        let mut list = panel(&["Season Four", "Factionville"]);
        list.name = "tab".into();
        list.slot = Some(DisplaySlot::List);
        assert_eq!(capture.observe(list), None);
        assert_eq!(capture.label(), None);
    }
}
