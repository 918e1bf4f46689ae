//! Content script: runs against the inspected page and answers popup requests.

pub mod dispatch;
mod extract;
mod images;

pub use dispatch::{DownloadDispatcher, FileKind, MpscWorkerChannel, WorkerChannel};
pub use extract::{extract_page_text, markup_to_text, text_filename};
pub use images::collect_image_urls;

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::api::ImagePackager;
use crate::error::{Result, RolysError};
use crate::host::{Clock, Notifier, TextSaver};
use crate::message::{Action, ActionRequest, ActionResponse};

/// Exact class combination of the page's main content column.
pub const REGION_SELECTOR: &str = ".col.col-12.grid-col-9-lg.z1";

const TEXT_SAVED: &str = "Text extracted, file downloaded";
const TEXT_FAILED: &str = "Text extraction failed, please refresh and retry or contact the administrator";
const REGION_MISSING: &str =
    "Content region not found, please check that the page structure is correct";
const PACKAGER_UNREACHABLE: &str =
    "Communication with the packaging server failed, please check the server connection or retry";
const ARCHIVE_MISSING: &str =
    "No archive URL received from the server, please check the server configuration";

/// Source of the current document's HTML.
pub trait PageSource: Send + Sync {
    fn html(&self) -> Result<String>;
}

/// Page captured once, e.g. from a saved file or a single fetch.
#[derive(Debug, Clone)]
pub struct StaticPage {
    html: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

impl PageSource for StaticPage {
    fn html(&self) -> Result<String> {
        Ok(self.html.clone())
    }
}

pub struct ContentScript {
    page: Arc<dyn PageSource>,
    selector: String,
    saver: Arc<dyn TextSaver>,
    packager: Arc<dyn ImagePackager>,
    dispatcher: Arc<DownloadDispatcher>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl ContentScript {
    pub fn new(
        page: Arc<dyn PageSource>,
        saver: Arc<dyn TextSaver>,
        packager: Arc<dyn ImagePackager>,
        dispatcher: Arc<DownloadDispatcher>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            page,
            selector: REGION_SELECTOR.to_string(),
            saver,
            packager,
            dispatcher,
            notifier,
            clock,
            background: Mutex::new(Vec::new()),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    /// Answer one popup request.
    pub async fn handle(&self, request: ActionRequest) -> ActionResponse {
        tracing::debug!("Received request from popup: {:?}", request);

        match request.action {
            Action::ExtractText => self.extract_text().await,
            Action::DownloadImages => ActionResponse::Images {
                count: self.download_images(),
            },
        }
    }

    /// Extract region text and save it as `page-text-<millis>.txt`.
    ///
    /// Responds only after the file is written.
    pub async fn extract_text(&self) -> ActionResponse {
        let text = match self
            .page
            .html()
            .and_then(|html| extract_page_text(&html, &self.selector))
        {
            Ok(text) => text,
            Err(RolysError::RegionNotFound(selector)) => {
                tracing::error!("Content region not found: {}", selector);
                return ActionResponse::text_failed(REGION_MISSING);
            }
            Err(e) => {
                tracing::error!("No text extracted: {}", e);
                return ActionResponse::text_failed(TEXT_FAILED);
            }
        };

        tracing::info!("Extracted {} characters of text", text.chars().count());
        tracing::debug!("Extracted text: {}", text);

        let filename = text_filename(self.clock.now_millis());
        match self.saver.save_text(&filename, &text).await {
            Ok(path) => {
                tracing::info!("Text saved to {}", path.display());
                ActionResponse::text_ok(TEXT_SAVED)
            }
            Err(e) => {
                tracing::error!("Saving {} failed: {}", filename, e);
                ActionResponse::text_failed(TEXT_FAILED)
            }
        }
    }

    /// Collect region image URLs and start packaging them in the background.
    ///
    /// Returns the number of URLs handed off. Packaging, and the archive
    /// download that follows it, finish later; their failures surface as
    /// alerts only.
    pub fn download_images(&self) -> usize {
        let urls = match self
            .page
            .html()
            .and_then(|html| collect_image_urls(&html, &self.selector))
        {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!("No downloadable images: {}", e);
                return 0;
            }
        };

        let count = urls.len();
        tracing::info!("Collected {} image URLs", count);

        let packager = self.packager.clone();
        let dispatcher = self.dispatcher.clone();
        let notifier = self.notifier.clone();
        let task = tokio::spawn(async move {
            package_and_download(urls, packager, dispatcher, notifier).await;
        });

        let mut background = self.background.lock().unwrap_or_else(|e| e.into_inner());
        background.retain(|task| !task.is_finished());
        background.push(task);

        count
    }

    /// Wait for every packaging job started so far.
    pub async fn wait_for_background(&self) {
        let tasks = std::mem::take(&mut *self.background.lock().unwrap_or_else(|e| e.into_inner()));
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!("Packaging task failed: {}", e);
            }
        }
    }
}

async fn package_and_download(
    urls: Vec<String>,
    packager: Arc<dyn ImagePackager>,
    dispatcher: Arc<DownloadDispatcher>,
    notifier: Arc<dyn Notifier>,
) {
    let archive_url = match packager.package(&urls).await {
        Ok(url) => url,
        Err(e @ RolysError::MissingArchive(_)) => {
            tracing::error!("Packaging server returned no archive: {}", e);
            notifier.alert(ARCHIVE_MISSING);
            return;
        }
        Err(e) => {
            tracing::error!("Communication with the packaging server failed: {}", e);
            notifier.alert(PACKAGER_UNREACHABLE);
            return;
        }
    };

    tracing::info!("Downloading archive returned by the server: {}", archive_url);
    match dispatcher.dispatch(&archive_url, FileKind::Archive).await {
        Ok(filename) => tracing::info!("Archive download requested as {}", filename),
        Err(e) => {
            tracing::error!("Archive download failed: {} (URL: {})", e, archive_url);
            notifier.alert(&format!("Archive download failed: {}", e));
        }
    }
}
