use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use tracing::debug;

use shared_models::TokenClaims;

/// Reads the claims section of a bearer token.
///
/// Signatures are issued and checked by the backend; the client only needs the
/// subject, role and expiry to decide whether a session is worth resolving.
pub fn decode_claims(token: &str) -> Result<TokenClaims, String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    // Some issuers keep base64 padding on the payload segment.
    let claims_b64 = parts[1].trim_end_matches('=');

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(e) => {
            debug!("Failed to decode claims: {}", e);
            return Err("Invalid claims encoding".to_string());
        }
    };

    serde_json::from_str::<TokenClaims>(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })
}

pub fn is_expired(claims: &TokenClaims) -> bool {
    match claims.exp {
        Some(exp) => {
            let now = Utc::now().timestamp().max(0) as u64;
            exp < now
        }
        None => false,
    }
}

/// User id carried by the token, from `user_id` or a numeric `sub`.
pub fn subject_id(claims: &TokenClaims) -> Option<i64> {
    claims.user_id.or_else(|| match claims.sub.as_ref()? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestTokens, TestUser};

    #[test]
    fn test_decode_claims() {
        let user = TestUser::doctor("doc@example.com");
        let token = TestTokens::create_test_token(&user, Some(1));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.role.as_deref(), Some("doctor"));
        assert_eq!(subject_id(&claims), Some(user.id));
        assert!(!is_expired(&claims));
    }

    #[test]
    fn test_expired_token() {
        let token = TestTokens::create_expired_token(&TestUser::default());
        let claims = decode_claims(&token).unwrap();
        assert!(is_expired(&claims));
    }

    #[test]
    fn test_malformed_token() {
        assert!(decode_claims(&TestTokens::create_malformed_token()).is_err());
        assert!(decode_claims("only.two").is_err());
    }
}
