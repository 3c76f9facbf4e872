//! Connection handle and factory traits.
//!
//! A protocol adapter implements [`Connector`] to open sessions. Each session
//! is a [`WorldConnection`] handle for outbound actions plus an
//! [`EventStream`] for everything the server reports back.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::display::Objective;
use crate::error::Result;
use crate::event::SessionEvent;

/// Inbound half of a session.
///
/// The stream ends (returns `None`) once the adapter has dropped the session.
pub type EventStream = mpsc::Receiver<SessionEvent>;

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthMode {
    /// Username (and optional password) handed straight to the adapter.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "direct"))]
    Direct,
    /// The remote authority issues a one-time code a human must confirm.
    #[cfg_attr(feature = "serde", serde(rename = "interactive-device"))]
    InteractiveDevice,
}

impl AuthMode {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::InteractiveDevice => "interactive-device",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an adapter needs to open one session.
#[derive(Clone)]
pub struct ConnectOptions {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Protocol version string the adapter should negotiate.
    pub version: String,
    /// Login name (an email or in-world name depending on `auth`).
    pub username: String,
    /// Authentication mode.
    pub auth: AuthMode,
    /// Directory for the adapter's per-account token cache.
    pub profiles_dir: PathBuf,
    /// How long the adapter may take to validate the session.
    pub check_timeout: Duration,
    /// Decrypted password for direct mode, if any.
    pub password: Option<String>,
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("version", &self.version)
            .field("username", &self.username)
            .field("auth", &self.auth)
            .field("profiles_dir", &self.profiles_dir)
            .field("check_timeout", &self.check_timeout)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outbound half of a live session.
#[async_trait]
pub trait WorldConnection: Send + Sync {
    /// Send one line of chat or a slash command.
    fn send_text(&self, line: &str) -> Result<()>;

    /// Ask the server for tab-completion candidates for `prefix`.
    async fn complete(&self, prefix: &str, timeout: Duration) -> Result<Vec<String>>;

    /// In-world name, once the session has joined.
    fn username(&self) -> Option<String>;

    /// Current side-panel objective, if one is displayed.
    fn sidebar(&self) -> Option<Objective>;

    /// Close the session. Idempotent.
    fn close(&self, reason: &str);
}

/// Factory for sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session. The returned stream reports its events.
    async fn connect(
        &self,
        opts: ConnectOptions,
    ) -> Result<(Arc<dyn WorldConnection>, EventStream)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let opts = ConnectOptions {
            host: "play.example.net".into(),
            port: 25565,
            version: "1.20".into(),
            username: "alt@example.net".into(),
            auth: AuthMode::Direct,
            profiles_dir: PathBuf::from("/tmp/profiles"),
            check_timeout: Duration::from_secs(120),
            password: Some("hunter2".into()),
        };
        let rendered = format!("{:?}", opts);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_auth_mode_labels() {
        assert_eq!(AuthMode::Direct.to_string(), "direct");
        assert_eq!(AuthMode::InteractiveDevice.as_str(), "interactive-device");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_auth_mode_serde_names() {
        let mode: AuthMode = serde_json::from_str("\"interactive-device\"").unwrap();
        assert_eq!(mode, AuthMode::InteractiveDevice);
    }
}
