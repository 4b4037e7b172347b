//! Error types for data source operations.

use thiserror::Error;

/// Errors that can occur while talking to an external data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(&'static str),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("HTTP {status} from {endpoint}")]
    Http { endpoint: String, status: u16 },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Coarse failure class the report branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A credential or endpoint was not configured
    ConfigurationMissing,
    /// The exchange rejected the key or returned no token
    AuthenticationFailed,
    /// Network, timeout, status or parse failure on a data call
    FetchFailed,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Never echo request URLs; they may carry credentials.
        let timed_out = err.is_timeout();
        let decode = err.is_decode();
        let message = err.without_url().to_string();
        if timed_out {
            FetchError::Timeout(message)
        } else if decode {
            FetchError::ParseError(message)
        } else {
            FetchError::Network(message)
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidEndpoint(err.to_string())
    }
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::ConfigurationMissing(_) | FetchError::InvalidEndpoint(_) => {
                FailureKind::ConfigurationMissing
            }
            FetchError::AuthenticationFailed(_) => FailureKind::AuthenticationFailed,
            _ => FailureKind::FetchFailed,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        match self {
            FetchError::AuthenticationFailed(_) => true,
            FetchError::Http { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            FetchError::ConfigurationMissing("SWYFTX_API_KEY").kind(),
            FailureKind::ConfigurationMissing
        );
        assert_eq!(
            FetchError::AuthenticationFailed("HTTP 401".into()).kind(),
            FailureKind::AuthenticationFailed
        );
        assert_eq!(
            FetchError::Timeout("balances".into()).kind(),
            FailureKind::FetchFailed
        );
    }

    #[test]
    fn test_auth_failure_from_status() {
        let unauthorized = FetchError::Http {
            endpoint: "/user/balance/".into(),
            status: 401,
        };
        assert!(unauthorized.is_auth_failure());

        let unavailable = FetchError::Http {
            endpoint: "/user/balance/".into(),
            status: 503,
        };
        assert!(!unavailable.is_auth_failure());
    }

    #[test]
    fn test_display() {
        let err = FetchError::Http {
            endpoint: "/auth/refresh/".into(),
            status: 500,
        };
        assert_eq!(err.to_string(), "HTTP 500 from /auth/refresh/");
    }
}
