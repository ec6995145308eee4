//! Remote mutex guard.
//!
//! The provider runs at most one action per project. Before each mutation the
//! guard polls the project's last-action status until it is terminal. A
//! concurrent writer can still slip in between the last poll and the write;
//! the conflict retry path absorbs that.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use keel_core::{ActionStatus, ProjectId, Settings};

use crate::error::ReconcileError;
use crate::gateway::RemoteGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMutexGuard {
    poll_interval: Duration,
}

impl RemoteMutexGuard {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.poll_interval())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until no action is in flight on `project`.
    ///
    /// Returns the terminal status observed. Status fetch errors are returned
    /// as-is; cancellation during a wait returns `Cancelled`.
    pub async fn wait_until_idle<G>(
        &self,
        gateway: &G,
        project: &ProjectId,
        cancel: &CancellationToken,
    ) -> Result<ActionStatus, ReconcileError>
    where
        G: RemoteGateway + ?Sized,
    {
        let mut polls = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(ReconcileError::Cancelled);
            }
            let status = gateway.fetch_last_action_status(project).await?;
            polls += 1;
            if status.is_terminal() {
                tracing::debug!(project = %project, %status, polls, "remote idle");
                return Ok(status);
            }

            tracing::debug!(project = %project, polls, "remote action in flight; waiting");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

impl Default for RemoteMutexGuard {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
