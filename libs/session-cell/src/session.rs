use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use shared_api::CrisisApiClient;
use shared_models::{ClientError, Role, User};
use shared_utils::jwt;

use crate::capabilities::{Capabilities, Capability};
use crate::error::SessionError;

const CURRENT_USER_PATH: &str = "/api/auth/me";

/// Resolved identity for the current session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub token: String,
    pub user: User,
    pub capabilities: Capabilities,
}

/// Application session context handed to every component that needs the
/// signed-in user. Resolution happens once; callers read the cached snapshot
/// until `invalidate` or `refresh`.
pub struct AppSession {
    api: Arc<CrisisApiClient>,
    token: RwLock<Option<String>>,
    resolved: RwLock<Option<SessionSnapshot>>,
}

impl AppSession {
    pub fn new(api: Arc<CrisisApiClient>, token: Option<String>) -> Self {
        Self {
            api,
            token: RwLock::new(token.filter(|t| !t.is_empty())),
            resolved: RwLock::new(None),
        }
    }

    pub fn api(&self) -> &Arc<CrisisApiClient> {
        &self.api
    }

    /// Returns the cached snapshot, resolving it on first use.
    pub async fn resolve(&self) -> Result<SessionSnapshot, SessionError> {
        if let Some(snapshot) = self.resolved.read().await.as_ref() {
            return Ok(snapshot.clone());
        }
        self.refresh().await
    }

    /// Re-fetches the current user and capability set.
    pub async fn refresh(&self) -> Result<SessionSnapshot, SessionError> {
        let token = self.token.read().await.clone().ok_or(SessionError::MissingToken)?;

        let claims = jwt::decode_claims(&token).map_err(SessionError::InvalidToken)?;
        if jwt::is_expired(&claims) {
            self.invalidate().await;
            return Err(SessionError::Expired);
        }

        let body: Value = match self.api.get(CURRENT_USER_PATH, Some(&token)).await {
            Ok(body) => body,
            Err(err) if err.is_auth() => {
                warn!("Current user lookup rejected the token: {}", err);
                self.invalidate().await;
                return Err(SessionError::Api(err));
            }
            Err(err) => return Err(SessionError::Api(err)),
        };

        let mut user = normalize_user(&body)
            .or_else(|| {
                jwt::subject_id(&claims).map(|id| User {
                    id,
                    email: claims.email.clone(),
                    full_name: None,
                    role: None,
                    created_at: None,
                })
            })
            .ok_or_else(|| SessionError::Api(ClientError::Decode("current user has no id".to_string())))?;

        if user.role.is_none() {
            user.role = claims.role.as_deref().and_then(Role::parse);
        }

        let capabilities = Capabilities::for_role(user.role);
        let snapshot = SessionSnapshot {
            token,
            user,
            capabilities,
        };

        info!(
            "Session resolved for user {} with role {}",
            snapshot.user.id,
            snapshot.user.role.map(|r| r.to_string()).unwrap_or_else(|| "unknown".to_string())
        );

        *self.resolved.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Drops the cached identity; the token is kept so `refresh` can retry.
    pub async fn invalidate(&self) {
        debug!("Invalidating session cache");
        *self.resolved.write().await = None;
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token.filter(|t| !t.is_empty());
        self.invalidate().await;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.resolved.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn capabilities(&self) -> Capabilities {
        self.resolved
            .read()
            .await
            .as_ref()
            .map(|s| s.capabilities.clone())
            .unwrap_or_default()
    }

    pub async fn can(&self, capability: Capability) -> bool {
        self.capabilities().await.has(capability)
    }
}

/// Maps the `/api/auth/me` payload, bare or wrapped in `{"user": ...}`.
pub(crate) fn normalize_user(body: &Value) -> Option<User> {
    let user = body.get("user").filter(|u| u.is_object()).unwrap_or(body);

    let id = ["id", "user_id"].iter().find_map(|key| match user.get(*key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })?;

    let text = |key: &str| user.get(key).and_then(Value::as_str).map(str::to_string);

    Some(User {
        id,
        email: text("email"),
        full_name: text("full_name").or_else(|| text("name")),
        role: text("role").as_deref().and_then(Role::parse),
        created_at: text("created_at").and_then(|s| s.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_bare_user() {
        let user = normalize_user(&json!({"id": 5, "email": "a@b.c", "role": "blood_bank"})).unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(user.role, Some(Role::BloodBank));
    }

    #[test]
    fn test_normalize_wrapped_user_with_string_id() {
        let user = normalize_user(&json!({"user": {"user_id": "42", "name": "Central Fire", "role": "fire_service"}}))
            .unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.full_name.as_deref(), Some("Central Fire"));
        assert_eq!(user.role, Some(Role::FireService));
    }

    #[test]
    fn test_normalize_without_id() {
        assert!(normalize_user(&json!({"email": "x@y.z"})).is_none());
    }
}
