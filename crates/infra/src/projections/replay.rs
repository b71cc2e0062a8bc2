//! Replay reporting for rebuilding the read model from the event log.

use serde::Serialize;
use tokio::task::JoinHandle;

use super::ProjectionError;

/// Outcome of replaying a batch of historical events.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Events projected without error (including skipped and ignored ones).
    pub succeeded: u64,
    /// Events whose projection failed; they are logged and counted, not retried.
    pub failed: u64,
}

impl ReplayReport {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Handle for a replay running in the background.
///
/// Dropping the handle detaches the replay; it still runs to completion.
#[derive(Debug)]
pub struct ReplayHandle {
    join: JoinHandle<ReplayReport>,
}

impl ReplayHandle {
    pub(crate) fn new(join: JoinHandle<ReplayReport>) -> Self {
        Self { join }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the replay to complete.
    pub async fn wait(self) -> Result<ReplayReport, ProjectionError> {
        self.join
            .await
            .map_err(|err| ProjectionError::ReplayAborted(err.to_string()))
    }
}
