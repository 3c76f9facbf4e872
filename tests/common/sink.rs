//! Notification sink that keeps everything it is given.

#![allow(dead_code)]

use async_trait::async_trait;
use fleetwatch::notify::{Notice, NotificationSink, NotifyError};
use parking_lot::Mutex;

#[derive(Default)]
pub struct RecordingSink {
    posted: Mutex<Vec<(String, Notice)>>,
}

impl RecordingSink {
    pub fn posted(&self) -> Vec<(String, Notice)> {
        self.posted.lock().clone()
    }

    /// Notices of one kind, e.g. `"network_cooldown"`.
    pub fn of_kind(&self, kind: &str) -> Vec<Notice> {
        self.posted
            .lock()
            .iter()
            .filter(|(_, n)| n.kind() == kind)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn post(&self, scope: &str, notice: &Notice) -> Result<(), NotifyError> {
        self.posted.lock().push((scope.to_string(), notice.clone()));
        Ok(())
    }
}
