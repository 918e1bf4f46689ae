//! Message contracts between the popup, the content script and the
//! background worker.
//!
//! Every message is transient: created by one component, consumed once by
//! another and then dropped. Wire shapes follow the extension's JSON
//! messages so a real extension host can exchange them unchanged.

use serde::{Deserialize, Serialize};

/// Popup actions the content script knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    ExtractText,
    DownloadImages,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ExtractText => "extractText",
            Action::DownloadImages => "downloadImages",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// popup -> content script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: Action,
}

impl ActionRequest {
    pub fn new(action: Action) -> Self {
        Self { action }
    }
}

/// content script -> popup
///
/// `Images::count` is the number of URLs handed to the packaging service.
/// It is returned before packaging finishes and says nothing about whether
/// the archive was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionResponse {
    Text { success: bool, message: String },
    Images { count: usize },
}

impl ActionResponse {
    pub fn text_ok(message: impl Into<String>) -> Self {
        Self::Text {
            success: true,
            message: message.into(),
        }
    }

    pub fn text_failed(message: impl Into<String>) -> Self {
        Self::Text {
            success: false,
            message: message.into(),
        }
    }

    /// Human-readable line for the popup notification.
    pub fn user_message(&self) -> String {
        match self {
            ActionResponse::Text { message, .. } => message.clone(),
            ActionResponse::Images { count: 0 } => {
                "No downloadable images found on this page".to_string()
            }
            ActionResponse::Images { count } => {
                format!("Found {} images, packaging has started", count)
            }
        }
    }
}

/// content script -> background worker. One-way; the worker never replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum WorkerMessage {
    DownloadImage { url: String, filename: String },
}

/// What to do when the destination file already exists. Only
/// uniquifying is ever requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    #[default]
    Uniquify,
}

/// Request handed to the host download facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOptions {
    pub url: String,
    pub filename: String,
    pub conflict_action: ConflictAction,
    pub save_as: bool,
}

impl DownloadOptions {
    /// Non-interactive download that never clobbers an existing file.
    pub fn unattended(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            conflict_action: ConflictAction::Uniquify,
            save_as: false,
        }
    }
}

/// Opaque job identifier returned by the download facility.
pub type DownloadId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DownloadState {
    #[serde(rename = "in_progress")]
    InProgress,
    Complete,
    Interrupted { error: String },
}

/// State transition emitted by the download facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDelta {
    pub id: DownloadId,
    #[serde(flatten)]
    pub state: DownloadState,
}
