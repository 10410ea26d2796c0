use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::controller::TimerId;

/// The session's single auto-reset timer.
///
/// Arming spawns a sleeping task that sends its [`TimerId`] when it wakes.
/// At most one task is alive; arming again or cancelling aborts the previous
/// one. Dropping the timer aborts it too.
#[derive(Debug)]
pub struct ResetTimer {
    sender: UnboundedSender<TimerId>,
    pending: Option<(TimerId, JoinHandle<()>)>,
}

impl ResetTimer {
    pub fn new(sender: UnboundedSender<TimerId>) -> Self {
        Self {
            sender,
            pending: None,
        }
    }

    pub fn arm(
        &mut self,
        id: TimerId,
        after: Duration,
    ) {
        self.abort();

        let sender = self.sender.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // The receiver is gone once the session has been dropped.
            let _ = sender.send(id);
        });
        debug!(%id, after_ms = after.as_millis() as u64, "reset timer armed");
        self.pending = Some((id, handle));
    }

    /// Aborts the timer if `id` is the one currently pending.
    pub fn cancel(
        &mut self,
        id: TimerId,
    ) {
        if self.pending.as_ref().is_some_and(|(pending, _)| *pending == id) {
            self.abort();
        }
    }

    pub fn pending(&self) -> Option<TimerId> {
        self.pending.as_ref().map(|(id, _)| *id)
    }

    fn abort(&mut self) {
        if let Some((id, handle)) = self.pending.take() {
            handle.abort();
            debug!(%id, "reset timer cancelled");
        }
    }
}

impl Drop for ResetTimer {
    fn drop(&mut self) {
        self.abort();
    }
}
