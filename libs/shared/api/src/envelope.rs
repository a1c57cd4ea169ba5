//! Parsing of the backend's error responses.
//!
//! The canonical shape is `{"error": {"code": "...", "detail": "..."}, ...extra}`.
//! Older endpoints still answer `{"error": "..."}` or `{"detail": "..."}`, and a
//! proxy in front of the API may answer with plain text.

use serde_json::Value;

use shared_models::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorEnvelope {
    pub code: Option<String>,
    pub detail: Option<String>,
    pub retry_after: Option<u64>,
}

impl ErrorEnvelope {
    pub fn parse(body: &str) -> Self {
        let trimmed = body.trim();
        let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
            return Self {
                detail: (!trimmed.is_empty()).then(|| trimmed.to_string()),
                ..Self::default()
            };
        };

        let retry_after = value.get("retry_after").and_then(|v| {
            v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        });

        let (code, detail) = match value.get("error") {
            Some(Value::Object(err)) => (
                err.get("code").and_then(Value::as_str).map(str::to_string),
                err.get("detail")
                    .or_else(|| err.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
            Some(Value::String(s)) if looks_like_code(s) => (Some(s.clone()), string_field(&value, "detail")),
            Some(Value::String(s)) => (None, Some(s.clone())),
            _ => (
                string_field(&value, "code"),
                string_field(&value, "detail").or_else(|| string_field(&value, "message")),
            ),
        };

        Self { code, detail, retry_after }
    }

    pub fn into_client_error(self, status: u16) -> ClientError {
        if status == 429 || self.code.as_deref() == Some("rate_limited") {
            return ClientError::RateLimited { retry_after: self.retry_after };
        }

        match self.code {
            Some(code) if matches!(code.as_str(), "auth_required" | "invalid_credentials") => {
                ClientError::Auth(self.detail.unwrap_or(code))
            }
            Some(code) => ClientError::Rejected { status, code, detail: self.detail },
            None => {
                let message = self.detail.unwrap_or_else(|| "no response body".to_string());
                match status {
                    401 | 403 => ClientError::Auth(message),
                    404 => ClientError::NotFound(message),
                    _ => ClientError::Api { status, message },
                }
            }
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Error codes are lowercase snake_case identifiers; free text has spaces or capitals.
fn looks_like_code(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c == '_' || c.is_ascii_digit())
}
