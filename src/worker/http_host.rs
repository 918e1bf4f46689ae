use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::DownloadHost;
use crate::error::{Result, RolysError};
use crate::host::unique_path;
use crate::message::{DownloadDelta, DownloadId, DownloadOptions, DownloadState};

/// Downloads over HTTP into a local directory.
///
/// `download` validates the request and returns immediately; the transfer
/// runs on its own task and reports through the delta channel: `InProgress`
/// once the server answered and the file is open, then `Complete` or
/// `Interrupted`. Existing files are never overwritten.
pub struct HttpDownloadHost {
    client: Client,
    dir: PathBuf,
    next_id: AtomicU64,
    events: mpsc::UnboundedSender<DownloadDelta>,
}

impl HttpDownloadHost {
    pub fn new(
        client: Client,
        dir: impl Into<PathBuf>,
    ) -> (Self, mpsc::UnboundedReceiver<DownloadDelta>) {
        let (events, deltas) = mpsc::unbounded_channel();
        let host = Self {
            client,
            dir: dir.into(),
            next_id: AtomicU64::new(1),
            events,
        };
        (host, deltas)
    }
}

/// Reject absolute paths and anything that climbs out of the download dir.
fn relative_target(filename: &str) -> Result<PathBuf> {
    let path = Path::new(filename);
    let safe = !filename.trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if safe {
        Ok(path.to_path_buf())
    } else {
        Err(RolysError::DownloadDispatch(format!(
            "Invalid filename: {}",
            filename
        )))
    }
}

#[async_trait]
impl DownloadHost for HttpDownloadHost {
    async fn download(&self, options: DownloadOptions) -> Result<DownloadId> {
        if options.save_as {
            return Err(RolysError::DownloadDispatch(
                "Interactive save dialogs are not supported".to_string(),
            ));
        }

        let url = Url::parse(&options.url)
            .map_err(|e| RolysError::DownloadDispatch(format!("Invalid URL {}: {}", options.url, e)))?;
        let target = self.dir.join(relative_target(&options.filename)?);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let client = self.client.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let state = match transfer(&client, url, &target, id, &events).await {
                Ok(path) => {
                    tracing::debug!("Download {} written to {}", id, path.display());
                    DownloadState::Complete
                }
                Err(e) => DownloadState::Interrupted {
                    error: e.to_string(),
                },
            };
            let _ = events.send(DownloadDelta { id, state });
        });

        Ok(id)
    }
}

async fn transfer(
    client: &Client,
    url: Url,
    target: &Path,
    id: DownloadId,
    events: &mpsc::UnboundedSender<DownloadDelta>,
) -> Result<PathBuf> {
    let response = client.get(url).send().await?.error_for_status()?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let (path, mut file) = open_target(target).await?;
    let _ = events.send(DownloadDelta {
        id,
        state: DownloadState::InProgress,
    });

    let mut body = response.bytes_stream();
    let written = async {
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok::<_, RolysError>(())
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(e);
    }
    Ok(path)
}

async fn open_target(target: &Path) -> Result<(PathBuf, tokio::fs::File)> {
    // another transfer may claim the same name between the check and the open
    for _ in 0..100 {
        let candidate = unique_path(target);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(RolysError::DownloadDispatch(format!(
        "No free filename for {}",
        target.display()
    )))
}
