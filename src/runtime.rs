//! In-process wiring of popup, content script and worker.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::api::{build_client, PackagerClient};
use crate::config::Config;
use crate::content::{ContentScript, DownloadDispatcher, PageSource, StaticPage};
use crate::error::{Result, RolysError};
use crate::host::{Clipboard, DownloadsDirSaver, Notifier, SystemClock};
use crate::popup::{LocalContentChannel, PopupController, StaticTab, Tab};
use crate::worker::{self, BackgroundWorker, DownloadSummary, HttpDownloadHost};

const TAB_ID: u64 = 1;

/// Fetch or read a page; returns its HTML and the address to report as the tab URL.
///
/// Saved pages need not be UTF-8; invalid sequences become U+FFFD.
pub async fn load_page(location: &str, timeout: Duration) -> Result<(String, String)> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let client = build_client(timeout)?;
        let html = client
            .get(location)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        return Ok((html, location.to_string()));
    }

    let path = Path::new(location);
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        RolysError::Other(format!("Failed to read page {}: {}", path.display(), e))
    })?;
    let html = String::from_utf8_lossy(&bytes).into_owned();
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Ok((html, format!("file://{}", absolute.display())))
}

/// One page with its popup, content script and background worker running.
pub struct LocalExtension {
    popup: PopupController,
    script: Arc<ContentScript>,
    worker: JoinHandle<()>,
    watcher: JoinHandle<DownloadSummary>,
}

impl LocalExtension {
    pub fn start(
        config: &Config,
        page: Arc<dyn PageSource>,
        tab_url: &str,
        notifier: Arc<dyn Notifier>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Result<Self> {
        let download_dir = config.downloads.resolve_dir();
        tracing::debug!("Downloads go to {}", download_dir.display());

        let client = build_client(Duration::from_secs(config.packager.timeout_secs))?;
        let (host, deltas) = HttpDownloadHost::new(client, &download_dir);
        let (channel, messages) = worker::channel(16);
        let worker = BackgroundWorker::new(Arc::new(host)).spawn(messages);
        let watcher = tokio::spawn(worker::watch_downloads(deltas));

        let script = Arc::new(
            ContentScript::new(
                page,
                Arc::new(DownloadsDirSaver::new(&download_dir)),
                Arc::new(PackagerClient::from_config(config)?),
                Arc::new(DownloadDispatcher::with_dir(
                    Arc::new(channel),
                    config.downloads.subdir.clone(),
                )),
                notifier.clone(),
                Arc::new(SystemClock),
            )
            .with_selector(config.page.region_selector.clone()),
        );

        let popup = PopupController::new(
            Arc::new(StaticTab(Tab {
                id: TAB_ID,
                url: tab_url.to_string(),
            })),
            Arc::new(LocalContentChannel::new(TAB_ID, script.clone())),
            notifier,
            clipboard,
        )
        .with_notification_duration(Duration::from_millis(config.popup.notification_ms));

        Ok(Self {
            popup,
            script,
            worker,
            watcher,
        })
    }

    /// Convenience for a page given as HTML.
    pub fn with_html(
        config: &Config,
        html: impl Into<String>,
        tab_url: &str,
        notifier: Arc<dyn Notifier>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Result<Self> {
        Self::start(config, Arc::new(StaticPage::new(html)), tab_url, notifier, clipboard)
    }

    pub fn popup(&self) -> &PopupController {
        &self.popup
    }

    /// Wait for background packaging, the worker and every transfer to finish.
    pub async fn shutdown(self) -> DownloadSummary {
        let Self {
            popup,
            script,
            worker,
            watcher,
        } = self;

        script.wait_for_background().await;
        // dropping the last worker channel sender lets the worker loop end
        drop(popup);
        drop(script);

        if let Err(e) = worker.await {
            tracing::error!("Worker task failed: {}", e);
        }
        watcher.await.unwrap_or_else(|e| {
            tracing::error!("Download watcher failed: {}", e);
            DownloadSummary::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_utf8_page_is_decoded_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gbk.html");
        // GBK-encoded word inside ASCII markup
        std::fs::write(&path, b"<p>\xc4\xe3\xba\xc3 ok</p>").unwrap();

        let (html, tab_url) = load_page(path.to_str().unwrap(), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(html.starts_with("<p>"));
        assert!(html.ends_with(" ok</p>"));
        assert!(html.contains('\u{fffd}'));
        assert!(tab_url.starts_with("file://"));
    }

    #[tokio::test]
    async fn missing_page_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.html");

        let err = load_page(missing.to_str().unwrap(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read page"));
    }
}
