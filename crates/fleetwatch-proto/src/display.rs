//! Server-pushed display state (scoreboard objectives).
//!
//! A server can show several objectives at once, each bound to a display
//! slot. The side panel is the one fleetwatch reads: its rows are entries
//! whose *score* only exists to order them top to bottom.

use crate::format::FormattedStringExt;

/// Where an objective is rendered on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DisplaySlot {
    /// Player list overlay.
    List,
    /// Side panel on the right edge of the screen.
    Sidebar,
    /// Under player name tags.
    BelowName,
}

impl DisplaySlot {
    /// Map the numeric slot id used on the wire.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::List),
            1 => Some(Self::Sidebar),
            2 => Some(Self::BelowName),
            _ => None,
        }
    }
}

/// One row of an objective.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreEntry {
    /// Raw row text, possibly with formatting codes.
    pub name: String,
    /// Sort key; higher scores render first.
    pub score: i32,
}

impl ScoreEntry {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, score: i32) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Snapshot of a single objective.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Objective {
    /// Internal objective name.
    pub name: String,
    /// Display title shown above the rows.
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: String,
    /// Slot the objective is currently bound to, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub slot: Option<DisplaySlot>,
    /// Rows in arbitrary order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub entries: Vec<ScoreEntry>,
}

impl Objective {
    /// Whether this objective is rendered in the side panel.
    pub fn is_sidebar(&self) -> bool {
        self.slot == Some(DisplaySlot::Sidebar)
    }

    /// Rows as plain text, top to bottom.
    ///
    /// Entries are ordered by score (descending) and then by text, formatting
    /// codes are stripped, and blank or filler (`-`) rows are dropped.
    pub fn lines(&self) -> Vec<String> {
        let mut rows: Vec<&ScoreEntry> = self.entries.iter().collect();
        rows.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

        rows.into_iter()
            .map(|entry| entry.name.as_str().strip_formatting().trim().to_string())
            .filter(|line| !line.is_empty() && line != "-")
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sidebar(entries: Vec<ScoreEntry>) -> Objective {
        Objective {
            name: "sb".into(),
            title: "Factions".into(),
            slot: Some(DisplaySlot::Sidebar),
            entries,
        }
    }

    #[test]
    fn test_lines_sorted_by_score_then_text() {
        let obj = sidebar(vec![
            ScoreEntry::new("Balance: 500", 1),
            ScoreEntry::new("\u{00A7}eSeason Four", 4),
            ScoreEntry::new("Beta", 2),
            ScoreEntry::new("Alpha", 2),
        ]);
        assert_eq!(obj.lines(), vec!["Season Four", "Alpha", "Beta", "Balance: 500"]);
    }

    #[test]
    fn test_lines_drop_fillers() {
        let obj = sidebar(vec![
            ScoreEntry::new("\u{00A7}7-", 3),
            ScoreEntry::new("   ", 2),
            ScoreEntry::new("\u{00A7}r", 1),
            ScoreEntry::new("Real", 0),
        ]);
        assert_eq!(obj.lines(), vec!["Real"]);
    }

    #[test]
    fn test_slot_ids() {
        assert_eq!(DisplaySlot::from_id(1), Some(DisplaySlot::Sidebar));
        assert_eq!(DisplaySlot::from_id(9), None);
        assert!(sidebar(Vec::new()).is_sidebar());
    }
}
