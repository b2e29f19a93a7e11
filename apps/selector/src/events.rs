//! Logging of controller events for the `select` command.

use country_client::SelectionEvent;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, warn};

/// Logs events until the controller goes away. Returns how many were logged.
pub async fn log_events(mut events: Receiver<SelectionEvent>) -> usize {
    let mut logged = 0;
    loop {
        match events.recv().await {
            Ok(SelectionEvent::StepFailed { step, error }) => {
                warn!(%step, code = error.code.as_str(), "{}", error.message);
            }
            Ok(other) => debug!(event = ?other, "selection event"),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "event log fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        }
        logged += 1;
    }
    logged
}
