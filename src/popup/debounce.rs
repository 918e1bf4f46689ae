use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Collapses bursts of calls into one job run after a quiet period.
///
/// Each `call` cancels the pending job if its quiet period has not elapsed
/// yet. Once a job has started it always runs to completion.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Schedule `job` to run after the quiet period, replacing any pending job.
    pub fn call<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            // Detached so a later cancel cannot interrupt a running job.
            if let Err(e) = tokio::spawn(job).await {
                tracing::error!("Debounced job failed: {}", e);
            }
        }));
    }

    /// Drop the pending job if it has not started.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Wait for the pending job (quiet period plus the job itself).
    pub async fn flush(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
