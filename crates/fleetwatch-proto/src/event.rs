//! Events a live session reports.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::display::Objective;

/// Link shown when the authority does not advertise one.
pub const DEFAULT_VERIFICATION_LINK: &str = "https://microsoft.com/link";

/// Code lifetime assumed when the authority does not advertise one.
pub const DEFAULT_CODE_LIFETIME: Duration = Duration::from_secs(900);

/// Something that happened on a session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "event", content = "data", rename_all = "snake_case")
)]
pub enum SessionEvent {
    /// The session entered the world.
    Joined {
        /// In-world name.
        username: String,
        /// In-world unique id, if the adapter knows it.
        #[cfg_attr(feature = "serde", serde(default))]
        unique_id: Option<String>,
    },
    /// A display objective was created, updated or moved to another slot.
    #[cfg_attr(feature = "serde", serde(rename = "display"))]
    DisplayChanged(Objective),
    /// One line of chat or system text, formatting already stripped.
    Chat(String),
    /// The transport closed.
    Disconnected {
        /// Adapter-supplied reason, possibly empty.
        #[cfg_attr(feature = "serde", serde(default))]
        reason: String,
    },
    /// The server kicked the session.
    Kicked {
        /// Kick text as shown to the player.
        #[cfg_attr(feature = "serde", serde(default))]
        reason: String,
    },
    /// The adapter hit a protocol or authentication error.
    #[cfg_attr(feature = "serde", serde(rename = "error"))]
    ProtocolError {
        /// Verbatim error text.
        message: String,
    },
    /// The authority issued a one-time device code.
    #[cfg_attr(feature = "serde", serde(rename = "device_code"))]
    InteractiveCode(DeviceCode),
}

impl SessionEvent {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "joined",
            Self::DisplayChanged(_) => "display",
            Self::Chat(_) => "chat",
            Self::Disconnected { .. } => "disconnected",
            Self::Kicked { .. } => "kicked",
            Self::ProtocolError { .. } => "error",
            Self::InteractiveCode(_) => "device_code",
        }
    }
}

/// Device-code payload as reported by the authority.
///
/// Authorities differ in which fields they fill, so every field is optional
/// and the accessors fall back to scraping the human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceCode {
    /// The code itself.
    pub user_code: Option<String>,
    /// Page where the code is entered.
    pub verification_uri: Option<String>,
    /// Page with the code already filled in.
    pub verification_uri_complete: Option<String>,
    /// Advertised lifetime in seconds.
    pub expires_in: Option<u64>,
    /// Free-text instructions.
    pub message: Option<String>,
}

fn dashed_code() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[A-Z0-9]{3,8}-[A-Z0-9]{3,8}").ok())
        .as_ref()
}

fn code_after_keyword() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bcode\s+([A-Z0-9]{6,})\b").ok())
        .as_ref()
}

fn url_in_message() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").ok()).as_ref()
}

impl DeviceCode {
    /// The code to show the operator, uppercased.
    pub fn code(&self) -> Option<String> {
        if let Some(code) = self.user_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            return Some(code.to_uppercase());
        }
        let message = self.message.as_deref()?;
        if let Some(m) = dashed_code().and_then(|re| re.find(message)) {
            return Some(m.as_str().to_uppercase());
        }
        code_after_keyword()?
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
    }

    /// Link where the code is confirmed.
    pub fn link(&self) -> String {
        if let Some(uri) = self
            .verification_uri_complete
            .as_deref()
            .or(self.verification_uri.as_deref())
            .filter(|u| !u.is_empty())
        {
            return uri.to_string();
        }
        self.message
            .as_deref()
            .and_then(|m| url_in_message()?.find(m))
            .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
            .unwrap_or_else(|| DEFAULT_VERIFICATION_LINK.to_string())
    }

    /// How long the code stays valid.
    pub fn lifetime(&self) -> Duration {
        match self.expires_in {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_CODE_LIFETIME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_from_field() {
        let dc = DeviceCode {
            user_code: Some(" ab12cd34 ".into()),
            ..Default::default()
        };
        assert_eq!(dc.code().as_deref(), Some("AB12CD34"));
    }

    #[test]
    fn test_code_and_link_from_message() {
        let dc = DeviceCode {
            message: Some(
                "To sign in, use a web browser to open the page https://example.net/link and enter the code qwer7yui to authenticate.".into(),
            ),
            ..Default::default()
        };
        assert_eq!(dc.code().as_deref(), Some("QWER7YUI"));
        assert_eq!(dc.link(), "https://example.net/link");
        assert_eq!(dc.lifetime(), DEFAULT_CODE_LIFETIME);
    }

    #[test]
    fn test_dashed_code_in_message() {
        let dc = DeviceCode {
            message: Some("Enter abcd-1234 at the sign-in page".into()),
            ..Default::default()
        };
        assert_eq!(dc.code().as_deref(), Some("ABCD-1234"));
    }

    #[test]
    fn test_link_prefers_complete_uri() {
        let dc = DeviceCode {
            verification_uri: Some("https://example.net/link".into()),
            verification_uri_complete: Some("https://example.net/link?otc=ABC".into()),
            expires_in: Some(600),
            ..Default::default()
        };
        assert_eq!(dc.link(), "https://example.net/link?otc=ABC");
        assert_eq!(dc.lifetime(), Duration::from_secs(600));
    }

    #[test]
    fn test_defaults_when_empty() {
        let dc = DeviceCode::default();
        assert_eq!(dc.code(), None);
        assert_eq!(dc.link(), DEFAULT_VERIFICATION_LINK);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_event_tagging() {
        let ev: SessionEvent =
            serde_json::from_str(r#"{"event":"kicked","data":{"reason":"bye"}}"#).unwrap();
        assert_eq!(ev, SessionEvent::Kicked { reason: "bye".into() });
        assert_eq!(ev.kind(), "kicked");
    }
}
