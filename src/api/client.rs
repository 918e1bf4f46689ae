use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::{Result, RolysError};

/// Build the shared HTTP client used for remote services
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("rolys/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RolysError::RemoteService(format!("Failed to create HTTP client: {}", e)))
}

/// Join a base URL and a path without doubling slashes
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Handle a JSON response, mapping non-2xx statuses to `RemoteService`
pub async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        response
            .json()
            .await
            .map_err(|e| RolysError::RemoteService(format!("Failed to parse response: {}", e)))
    } else {
        let error_msg = match status {
            StatusCode::NOT_FOUND => "Resource not found".to_string(),
            StatusCode::TOO_MANY_REQUESTS => "Rate limited. Please try again later.".to_string(),
            _ => match response.text().await {
                Ok(text) if !text.trim().is_empty() => format!("HTTP {}: {}", status, text.trim()),
                _ => format!("HTTP error: {}", status),
            },
        };
        Err(RolysError::RemoteService(error_msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("https://rolyyung.top/", "/api/download-images"),
            "https://rolyyung.top/api/download-images"
        );
        assert_eq!(endpoint("http://127.0.0.1:8080", "/latest"), "http://127.0.0.1:8080/latest");
    }
}
