use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /api/download-images`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageImagesRequest {
    pub image_urls: Vec<String>,
}

/// Envelope returned by the packaging service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageImagesResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<PackageImagesData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageImagesData {
    #[serde(default)]
    pub zip_url: Option<String>,
}

impl PackageImagesResponse {
    /// Archive URL, only when the envelope reports success.
    pub fn archive_url(&self) -> Option<&str> {
        if self.code != 200 {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| d.zip_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Response of `GET /latest?from=..&to=..`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestRatesResponse {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    pub rates: HashMap<String, f64>,
}
