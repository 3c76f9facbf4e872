//! Faction lookup cache.

use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// A resolved group for one player.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupLabel {
    Named(String),
    /// The server confirmed the player has no group.
    NoGroup,
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::NoGroup => f.write_str("No Faction"),
        }
    }
}

fn cache_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Player name to group label, with lazy expiry.
pub struct FactionCache {
    entries: DashMap<String, (GroupLabel, Instant)>,
    ttl: Duration,
}

impl FactionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cached label for `name`; expired entries are removed on the way.
    pub fn get(&self, name: &str) -> Option<GroupLabel> {
        let key = cache_key(name);
        let hit = self.entries.get(&key).map(|e| e.value().clone())?;
        if hit.1.elapsed() > self.ttl {
            self.entries.remove(&key);
            return None;
        }
        Some(hit.0)
    }

    pub fn insert(&self, name: &str, label: GroupLabel) {
        self.entries.insert(cache_key(name), (label, Instant::now()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
