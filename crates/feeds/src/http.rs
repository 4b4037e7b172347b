//! Shared HTTP plumbing for the data clients.

use crate::error::FetchError;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("portfolio-report/", env!("CARGO_PKG_VERSION"));

/// Build a client whose every request is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FetchError::Network(e.to_string()))
}

/// Validate a base URL and strip any trailing slash.
pub fn normalize_base_url(base_url: &str) -> Result<String, FetchError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(FetchError::InvalidEndpoint("empty base URL".to_string()));
    }
    let parsed = Url::parse(trimmed)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidEndpoint(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(trimmed.to_string())
}

/// Check the status, then decode the body as JSON.
pub async fn read_json(response: Response, endpoint: &str) -> Result<Value, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| FetchError::ParseError(format!("{}: {}", endpoint, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://api.swyftx.com.au/").unwrap(),
            "https://api.swyftx.com.au"
        );
        assert!(normalize_base_url("   ").is_err());
        assert!(normalize_base_url("not a url").is_err());
        assert!(matches!(
            normalize_base_url("ftp://example.com"),
            Err(FetchError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(DEFAULT_TIMEOUT).is_ok());
    }
}
