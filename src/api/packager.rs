use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::client::{build_client, endpoint, handle_response};
use super::types::{PackageImagesRequest, PackageImagesResponse};
use crate::config::Config;
use crate::error::{Result, RolysError};

/// Remote service that bundles image URLs into one downloadable archive.
#[async_trait]
pub trait ImagePackager: Send + Sync {
    /// Returns the URL of the generated archive.
    ///
    /// Transport failures and non-2xx statuses are `RemoteService`; a
    /// response without a usable archive URL is `MissingArchive`.
    async fn package(&self, image_urls: &[String]) -> Result<String>;
}

/// HTTP client for `POST /api/download-images`
pub struct PackagerClient {
    client: Client,
    base_url: String,
}

impl PackagerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.packager.base_url.clone(),
            Duration::from_secs(config.packager.timeout_secs),
        )
    }
}

#[async_trait]
impl ImagePackager for PackagerClient {
    async fn package(&self, image_urls: &[String]) -> Result<String> {
        tracing::info!("Sending {} image URLs to the packaging server", image_urls.len());

        let response = self
            .client
            .post(endpoint(&self.base_url, "/api/download-images"))
            .json(&PackageImagesRequest {
                image_urls: image_urls.to_vec(),
            })
            .send()
            .await
            .map_err(|e| RolysError::RemoteService(format!("Request failed: {}", e)))?;

        let envelope: PackageImagesResponse = handle_response(response).await?;
        tracing::debug!("Packaging server response: {:?}", envelope);

        envelope.archive_url().map(str::to_string).ok_or_else(|| {
            RolysError::MissingArchive(format!(
                "code {}{}",
                envelope.code,
                envelope
                    .message
                    .as_deref()
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            ))
        })
    }
}
