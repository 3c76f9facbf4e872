//! Tracing-backed sink.

use async_trait::async_trait;

use super::{Notice, NotificationSink, NotifyError};

/// Writes every notice to the log. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn post(&self, scope: &str, notice: &Notice) -> Result<(), NotifyError> {
        match notice {
            Notice::NetworkCooldown { .. } | Notice::IdentityRejected { .. } => {
                tracing::warn!(scope = %scope, kind = notice.kind(), "{}", notice);
            }
            _ => {
                tracing::info!(scope = %scope, kind = notice.kind(), "{}", notice);
            }
        }
        Ok(())
    }
}
