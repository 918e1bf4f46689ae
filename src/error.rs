use thiserror::Error;

#[derive(Error, Debug)]
pub enum RolysError {
    #[error("Content region not found ({0}). Please check that the page structure is correct.")]
    RegionNotFound(String),

    #[error("No text left in the content region after cleanup")]
    EmptyExtraction,

    #[error("No downloadable images found in the content region")]
    NoImagesFound,

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("No archive URL in packaging response: {0}")]
    MissingArchive(String),

    #[error("Message delivery failed: {0}")]
    Messaging(String),

    #[error("Download dispatch failed: {0}")]
    DownloadDispatch(String),

    #[error("Cannot run on special pages: {0}")]
    SpecialPage(String),

    #[error("No active tab found")]
    NoActiveTab,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RolysError>;
