use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use tokio::sync::mpsc;

use crate::error::{Result, RolysError};
use crate::message::WorkerMessage;

/// Fixed subdirectory (under the downloads location) for images and archives.
pub const IMAGE_DIR: &str = "rolys-images";

const ARCHIVE_NAME: &str = "images.zip";
const DEFAULT_EXTENSION: &str = "jpg";

/// What kind of file a download instruction fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Packaged archive; always lands at the same name.
    Archive,
    /// Single image, named by its 1-based position.
    Image { ordinal: usize },
}

/// Extension of the last path segment, ignoring query and fragment.
pub fn sniff_extension(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            path.rsplit('/').next().unwrap_or(path).to_string()
        }
    };

    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            ext.to_string()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Destination path relative to the downloads location.
pub fn download_filename(dir: &str, url: &str, kind: FileKind) -> String {
    match kind {
        FileKind::Archive => format!("{}/{}", dir, ARCHIVE_NAME),
        FileKind::Image { ordinal } => {
            format!("{}/image-{:02}.{}", dir, ordinal, sniff_extension(url))
        }
    }
}

/// One-way channel from the content script to the background worker.
#[async_trait]
pub trait WorkerChannel: Send + Sync {
    /// Resolves once the message is accepted for delivery.
    async fn post(&self, message: WorkerMessage) -> Result<()>;
}

/// In-process channel feeding a `BackgroundWorker` loop.
#[derive(Debug, Clone)]
pub struct MpscWorkerChannel {
    tx: mpsc::Sender<WorkerMessage>,
}

impl MpscWorkerChannel {
    pub fn new(tx: mpsc::Sender<WorkerMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl WorkerChannel for MpscWorkerChannel {
    async fn post(&self, message: WorkerMessage) -> Result<()> {
        self.tx.send(message).await.map_err(|_| {
            RolysError::Messaging("Could not establish connection. Receiving end does not exist.".to_string())
        })
    }
}

/// Names files and hands them to the worker.
///
/// Delivery is at-most-once and unconfirmed: success only means the
/// channel accepted the instruction, never that the file was written.
pub struct DownloadDispatcher {
    channel: Arc<dyn WorkerChannel>,
    dir: String,
}

impl DownloadDispatcher {
    pub fn new(channel: Arc<dyn WorkerChannel>) -> Self {
        Self::with_dir(channel, IMAGE_DIR)
    }

    pub fn with_dir(channel: Arc<dyn WorkerChannel>, dir: impl Into<String>) -> Self {
        Self {
            channel,
            dir: dir.into(),
        }
    }

    /// Post a download instruction; returns the destination filename.
    pub async fn dispatch(&self, url: &str, kind: FileKind) -> Result<String> {
        let filename = download_filename(&self.dir, url, kind);
        tracing::debug!("Dispatching download {} -> {}", url, filename);

        self.channel
            .post(WorkerMessage::DownloadImage {
                url: url.to_string(),
                filename: filename.clone(),
            })
            .await
            .inspect_err(|e| tracing::error!("Download request not delivered: {} (URL: {})", e, url))?;

        Ok(filename)
    }
}
