//! Marker-delimited command capture.
//!
//! The server answers commands with free-text chat, interleaved with
//! everything else going on. To get one command's output, broadcast a
//! unique start marker, run the command, broadcast the end marker and keep
//! what arrives in between.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_proto::WorldConnection;
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use super::wait::await_first_match;
use crate::config::{MarkerConfig, TrackerConfig, slash_command};
use crate::error::FleetError;
use crate::fleet::Fleet;
use crate::state::SessionHandle;
use crate::store::AccountId;

/// A start/end marker pair with a fresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub end: String,
}

impl Markers {
    pub fn new() -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self {
            start: format!("[START_{token}]"),
            end: format!("[END_{token}]"),
        }
    }
}

/// Pacing of one marker-delimited capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CaptureWindow {
    pub command_delay: Duration,
    /// Pause between the command and the end marker.
    pub end_delay: Duration,
    /// Overall deadline, counted from the start marker.
    pub timeout: Duration,
}

impl CaptureWindow {
    pub fn commands(config: &MarkerConfig) -> Self {
        Self {
            command_delay: config.command_delay(),
            end_delay: config.end_delay(),
            timeout: config.timeout(),
        }
    }

    pub fn lookups(markers: &MarkerConfig, tracker: &TrackerConfig) -> Self {
        Self {
            command_delay: markers.command_delay(),
            end_delay: tracker.lookup_end_delay(),
            timeout: tracker.lookup_timeout(),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::new()
    }
}

impl Fleet {
    /// Run `text` as a command on an online account and return its output.
    ///
    /// `Ok(None)` means nothing was captured before the timeout.
    pub async fn run_marked_command(
        &self,
        id: AccountId,
        text: &str,
    ) -> Result<Option<String>, FleetError> {
        let command = slash_command(text).ok_or(FleetError::EmptyCommand)?;
        let session = self.session(id);
        let conn = {
            let state = session.lock();
            if !state.is_online() {
                return Err(FleetError::NotOnline(id));
            }
            state.connection.clone()
        };
        let Some(conn) = conn else {
            return Err(FleetError::NotOnline(id));
        };
        let captured = self.capture_with_markers(&session, &conn, &command).await;
        Ok(captured.map(|lines| lines.join("\n")))
    }

    /// Marker capture with the command guard taken for its duration.
    pub(crate) async fn capture_with_markers(
        &self,
        session: &SessionHandle,
        conn: &Arc<dyn WorldConnection>,
        command: &str,
    ) -> Option<Vec<String>> {
        let window = CaptureWindow::commands(&self.inner.config.markers);
        let _guard = session.command_guard().await;
        self.capture_between_markers(session, conn, command, window).await
    }

    /// Send start marker, `command` and end marker, returning every line
    /// seen between the two markers. The caller holds the command guard.
    ///
    /// `None` means the window timed out with nothing captured.
    pub(crate) async fn capture_between_markers(
        &self,
        session: &SessionHandle,
        conn: &Arc<dyn WorldConnection>,
        command: &str,
        window: CaptureWindow,
    ) -> Option<Vec<String>> {
        let markers = Markers::new();
        let broadcast = self.inner.config.markers.broadcast_cmd.trim();
        let mut chat = session.subscribe_chat();

        let send = async {
            if !self
                .send_line(session, conn, &format!("{broadcast} {}", markers.start))
                .await
            {
                return;
            }
            sleep(window.command_delay).await;
            if !self.send_line(session, conn, command).await {
                return;
            }
            sleep(window.end_delay).await;
            self.send_line(session, conn, &format!("{broadcast} {}", markers.end))
                .await;
        };

        let mut started = false;
        let mut lines = Vec::new();
        let listen = await_first_match(&mut chat, window.timeout, |line| {
            if !started {
                started = line.contains(&markers.start);
                return None;
            }
            if line.contains(&markers.end) {
                return Some(());
            }
            lines.push(line.to_string());
            None
        });

        let ((), ended) = tokio::join!(send, listen);
        debug!(account = session.id, %command, ended = ended.is_some(), captured = lines.len(), "marker capture finished");

        (ended.is_some() || !lines.is_empty()).then_some(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_are_unique_and_paired() {
        let a = Markers::new();
        let b = Markers::new();
        assert_ne!(a, b);
        let token = a.start.trim_start_matches("[START_").trim_end_matches(']');
        assert_eq!(a.end, format!("[END_{token}]"));
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn test_lookup_window_is_shorter_than_command_window() {
        let config = crate::config::Config::default();
        let commands = CaptureWindow::commands(&config.markers);
        let lookups = CaptureWindow::lookups(&config.markers, &config.tracker);
        assert_eq!(lookups.command_delay, commands.command_delay);
        assert_eq!(lookups.end_delay, Duration::from_millis(1_500));
        assert_eq!(lookups.timeout, Duration::from_millis(4_500));
        assert!(lookups.timeout < commands.timeout);
    }
}
