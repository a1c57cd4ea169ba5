use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_SLOT_STEP_MINUTES: u32 = 15;
pub const DEFAULT_SEARCH_HORIZON_DAYS: u32 = 120;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_token: String,
    pub slot_step_minutes: u32,
    pub search_horizon_days: u32,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: String::new(),
            slot_step_minutes: DEFAULT_SLOT_STEP_MINUTES,
            search_horizon_days: DEFAULT_SEARCH_HORIZON_DAYS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_url: env::var("CRISIS_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("CRISIS_API_URL not set, using default");
                    DEFAULT_API_URL.to_string()
                }),
            api_token: env::var("CRISIS_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("CRISIS_API_TOKEN not set, using empty value");
                    String::new()
                }),
            slot_step_minutes: parse_or_default("BOOKING_SLOT_STEP_MINUTES", DEFAULT_SLOT_STEP_MINUTES),
            search_horizon_days: parse_or_default("BOOKING_SEARCH_HORIZON_DAYS", DEFAULT_SEARCH_HORIZON_DAYS),
            request_timeout_secs: parse_or_default("CRISIS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        if !config.is_configured() {
            warn!("Client not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.api_token.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + PartialOrd + Default + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value > T::default() => value,
            _ => {
                warn!("{} has invalid value {:?}, using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.slot_step_minutes, 15);
        assert_eq!(config.search_horizon_days, 120);
        assert!(!config.is_configured());
    }

    #[test]
    fn test_is_configured_requires_token() {
        let config = ClientConfig {
            api_token: "token".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.is_configured());
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }
}
