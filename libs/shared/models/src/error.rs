use thiserror::Error;

/// Failures raised at the HTTP boundary with the CrisisIntel API.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// The backend answered with a coded error envelope.
    #[error("Rejected ({code}): {}", detail.as_deref().unwrap_or("no detail"))]
    Rejected {
        status: u16,
        code: String,
        detail: Option<String>,
    },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected payload: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Backend error code, when the response carried one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { code, .. } => Some(code),
            ClientError::RateLimited { .. } => Some("rate_limited"),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display_and_code() {
        let err = ClientError::Rejected {
            status: 409,
            code: "capacity_full".to_string(),
            detail: None,
        };
        assert_eq!(err.code(), Some("capacity_full"));
        assert_eq!(err.to_string(), "Rejected (capacity_full): no detail");
    }

    #[test]
    fn test_auth_classification() {
        assert!(ClientError::Auth("expired".into()).is_auth());
        assert!(!ClientError::Network("reset".into()).is_auth());
        assert_eq!(ClientError::Network("reset".into()).code(), None);
    }
}
