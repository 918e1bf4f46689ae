//! Background worker: turns download instructions into host downloads.
//!
//! Dispatch is at-most-once and unconfirmed. The worker never replies to
//! the sender; outcomes only show up in the logs, through a separate and
//! uncorrelated subscription to download state changes.

mod http_host;

pub use http_host::HttpDownloadHost;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::content::MpscWorkerChannel;
use crate::error::Result;
use crate::message::{DownloadDelta, DownloadId, DownloadOptions, DownloadState, WorkerMessage};

/// Host download facility.
#[async_trait]
pub trait DownloadHost: Send + Sync {
    /// Start a download; resolves with its job id once accepted.
    async fn download(&self, options: DownloadOptions) -> Result<DownloadId>;
}

/// Connected worker channel pair.
pub fn channel(buffer: usize) -> (MpscWorkerChannel, mpsc::Receiver<WorkerMessage>) {
    let (tx, rx) = mpsc::channel(buffer);
    (MpscWorkerChannel::new(tx), rx)
}

pub struct BackgroundWorker {
    host: Arc<dyn DownloadHost>,
}

impl BackgroundWorker {
    pub fn new(host: Arc<dyn DownloadHost>) -> Self {
        Self { host }
    }

    /// Hand one instruction to the host. Failures are logged, never retried.
    pub async fn handle(&self, message: WorkerMessage) -> Option<DownloadId> {
        let WorkerMessage::DownloadImage { url, filename } = message;
        tracing::info!("Worker received download request: {} -> {}", url, filename);

        match self
            .host
            .download(DownloadOptions::unattended(url.clone(), filename))
            .await
        {
            Ok(id) => {
                tracing::info!("Download request sent, downloadId: {}", id);
                Some(id)
            }
            Err(e) => {
                tracing::error!("Download request failed: {} (URL: {})", e, url);
                None
            }
        }
    }

    /// Process instructions until every sender is gone.
    pub async fn run(self, mut messages: mpsc::Receiver<WorkerMessage>) {
        while let Some(message) = messages.recv().await {
            self.handle(message).await;
        }
        tracing::debug!("Worker channel closed");
    }

    pub fn spawn(self, messages: mpsc::Receiver<WorkerMessage>) -> JoinHandle<()> {
        tokio::spawn(self.run(messages))
    }
}

/// Terminal states seen by `watch_downloads`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub completed: Vec<DownloadId>,
    pub interrupted: Vec<(DownloadId, String)>,
}

/// Log download state transitions until the event stream ends.
pub async fn watch_downloads(mut deltas: mpsc::UnboundedReceiver<DownloadDelta>) -> DownloadSummary {
    let mut summary = DownloadSummary::default();

    while let Some(delta) = deltas.recv().await {
        match delta.state {
            DownloadState::Complete => {
                tracing::info!("Download complete: {}", delta.id);
                summary.completed.push(delta.id);
            }
            DownloadState::Interrupted { error } => {
                tracing::error!("Download interrupted: {} {}", delta.id, error);
                summary.interrupted.push((delta.id, error));
            }
            DownloadState::InProgress => tracing::debug!("Download started: {}", delta.id),
        }
    }

    summary
}
