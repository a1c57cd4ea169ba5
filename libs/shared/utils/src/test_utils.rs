use std::sync::atomic::{AtomicI64, Ordering};

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use serde_json::json;

use shared_config::ClientConfig;
use shared_models::{Role, User};

static NEXT_TEST_USER_ID: AtomicI64 = AtomicI64::new(1000);

pub struct TestConfig {
    pub api_url: String,
    pub api_token: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            api_token: "test-api-token".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_api_url(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
            ..ClientConfig::default()
        }
    }
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", "patient")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: NEXT_TEST_USER_ID.fetch_add(1, Ordering::Relaxed),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn hospital(email: &str) -> Self {
        Self::new(email, "hospital")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: Some(self.email.clone()),
            full_name: Some("Test User".to_string()),
            role: Role::parse(&self.role),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct TestTokens;

impl TestTokens {
    /// Builds an unsigned token with the claims layout the backend issues.
    pub fn create_test_token(user: &TestUser, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "user_id": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp().max(0)
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        format!("{}.{}.test-signature", header_encoded, payload_encoded)
    }

    pub fn create_expired_token(user: &TestUser) -> String {
        Self::create_test_token(user, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockApiResponses;

impl MockApiResponses {
    pub fn user_profile_response(user: &TestUser) -> serde_json::Value {
        json!({
            "id": user.id,
            "email": user.email,
            "full_name": "Test User",
            "role": user.role,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn schedule_block_response(
        id: i64,
        doctor_user_id: i64,
        hospital_user_id: i64,
        weekday: u8,
        start: &str,
        end: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "weekday": weekday,
            "start_time": format!("{}:00", start),
            "end_time": format!("{}:00", end),
            "visit_cost": "500.00",
            "max_per_day": 20,
            "hospital_user_id": hospital_user_id,
            "doctor_user_id": doctor_user_id
        })
    }

    pub fn service_response(id: i64, name: &str, window: Option<(&str, &str)>) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "price": "1200.00",
            "duration_minutes": 30,
            "available": 1,
            "max_per_day": 10,
            "window_start_time": window.map(|(start, _)| start),
            "window_end_time": window.map(|(_, end)| end)
        })
    }

    pub fn appointment_response(id: i64, doctor_user_id: i64, date: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "doctor_user_id": doctor_user_id,
            "starts_at": format!("{}T09:00:00", date),
            "ends_at": format!("{}T09:15:00", date),
            "status": status
        })
    }

    pub fn service_booking_response(id: i64, service_id: i64, date: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "service_id": service_id,
            "scheduled_at": format!("{} 10:00:00", date),
            "status": status
        })
    }

    pub fn booking_success_response(id: i64, serial: u32, approx_time: &str) -> serde_json::Value {
        json!({
            "id": id,
            "serial": serial,
            "approx_time": approx_time
        })
    }

    pub fn error_response(code: &str, detail: Option<&str>) -> serde_json::Value {
        let mut error = json!({ "code": code });
        if let Some(detail) = detail {
            error["detail"] = json!(detail);
        }
        json!({ "error": error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::with_api_url("http://127.0.0.1:9999");
        let client_config = config.to_client_config();

        assert_eq!(client_config.api_url, "http://127.0.0.1:9999");
        assert_eq!(client_config.api_token, "test-api-token");
        assert!(client_config.is_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(Role::Doctor));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_token_creation() {
        let user = TestUser::default();
        let token = TestTokens::create_test_token(&user, Some(1));

        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_error_response_shape() {
        let body = MockApiResponses::error_response("capacity_full", None);
        assert_eq!(body["error"]["code"], "capacity_full");
        assert!(body["error"].get("detail").is_none());
    }
}
