use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: Option<serde_json::Value>,
    pub user_id: Option<i64>,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<u64>,
}

/// Roles a CrisisIntel account registers under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "user", alias = "regular")]
    Patient,
    Doctor,
    Hospital,
    #[serde(alias = "fire_department", alias = "fire")]
    FireService,
    #[serde(alias = "bloodbank")]
    BloodBank,
    #[serde(alias = "social_org", alias = "ngo", alias = "organization")]
    Org,
    Admin,
}

impl Role {
    /// Lenient parse for role strings coming from tokens and profiles.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "patient" | "user" | "regular" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "hospital" => Some(Role::Hospital),
            "fire_service" | "fire_department" | "fire" => Some(Role::FireService),
            "blood_bank" | "bloodbank" => Some(Role::BloodBank),
            "org" | "social_org" | "ngo" | "organization" => Some(Role::Org),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Hospital => write!(f, "hospital"),
            Role::FireService => write!(f, "fire_service"),
            Role::BloodBank => write!(f, "blood_bank"),
            Role::Org => write!(f, "org"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub created_at: Option<DateTime<Utc>>,
}
