//! Integration test common infrastructure.
//!
//! Provides a scripted in-process connector, a recording notification sink
//! and a builder that starts a [`Fleet`] against them.

#![allow(dead_code)]

pub mod fake;
pub mod sink;

use std::sync::Arc;

use fleetwatch::Fleet;
use fleetwatch::config::Config;
use fleetwatch::store::MemoryStore;
use tempfile::TempDir;

#[allow(unused_imports)]
pub use fake::{Behavior, FakeConnection, FakeConnector, Interjection};
#[allow(unused_imports)]
pub use sink::RecordingSink;

/// A running fleet plus the fakes behind it.
pub struct TestFleet {
    pub fleet: Fleet,
    pub connector: Arc<FakeConnector>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<MemoryStore>,
    _profiles: TempDir,
}

/// Config with `accounts` in scope `g1`, labelled by name, ids from 1.
///
/// `extra` is appended verbatim, e.g. `[[checker]]` blocks.
pub fn config_with(accounts: &[&str], extra: &str) -> (Config, TempDir) {
    let profiles = TempDir::new().expect("tempdir");
    let mut toml = format!(
        "[world]\nhost = \"play.example.net\"\nprofiles_dir = \"{}\"\n\n",
        profiles.path().display()
    );
    for (i, label) in accounts.iter().enumerate() {
        toml.push_str(&format!(
            "[[account]]\nid = {}\nscope = \"g1\"\nlabel = \"{}\"\n\n",
            i + 1,
            label
        ));
    }
    toml.push_str(extra);
    let config = Config::from_toml(&toml).expect("test config");
    (config, profiles)
}

impl TestFleet {
    pub fn start(accounts: &[&str]) -> Self {
        Self::start_with(accounts, "")
    }

    pub fn start_with(accounts: &[&str], extra: &str) -> Self {
        let (config, profiles) = config_with(accounts, extra);
        Self::from_config(config, profiles)
    }

    pub fn from_config(config: Config, profiles: TempDir) -> Self {
        let store = Arc::new(MemoryStore::from_config(&config));
        let sink = Arc::new(RecordingSink::default());
        let connector = Arc::new(FakeConnector::new());
        let fleet = Fleet::start(
            config,
            Arc::clone(&store) as _,
            Arc::clone(&sink) as _,
            Arc::clone(&connector) as _,
        )
        .expect("fleet starts");
        Self {
            fleet,
            connector,
            sink,
            store,
            _profiles: profiles,
        }
    }
}
