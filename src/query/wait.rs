//! "Await the first matching line or time out".

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, timeout_at};

/// Feed chat lines from `rx` to `matcher` until it returns `Some`, or until
/// `within` elapses (`None`).
///
/// Subscribe *before* sending the command whose reply you wait for. Lagged
/// lines are skipped; a closed channel counts as a timeout.
pub async fn await_first_match<T, F>(
    rx: &mut broadcast::Receiver<String>,
    within: Duration,
    mut matcher: F,
) -> Option<T>
where
    F: FnMut(&str) -> Option<T>,
{
    let deadline = Instant::now() + within;
    loop {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Ok(line)) => {
                if let Some(found) = matcher(&line) {
                    return Some(found);
                }
            }
            Ok(Err(RecvError::Lagged(skipped))) => {
                tracing::debug!(skipped, "chat subscriber lagged");
            }
            Ok(Err(RecvError::Closed)) | Err(_) => return None,
        }
    }
}
