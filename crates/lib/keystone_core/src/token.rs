//! Bearer token decoding and expiry checks.
//!
//! The console holds no signing key, so tokens are decoded structurally:
//! signatures are not verified and expiry is reported rather than enforced.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Claims, DecodedToken};

/// Default expiry grace window: 5 minutes.
pub const DEFAULT_EXPIRY_GRACE_SECS: i64 = 5 * 60;

/// Token decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed token: {0}")]
    Malformed(String),
}

/// Payload fields read from an access token.
#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(default)]
    sub: String,
    exp: i64,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default, alias = "isAdmin")]
    is_admin: bool,
    #[serde(default, alias = "tenantId")]
    tenant_id: Option<String>,
}

/// Turns a raw bearer token into a [`DecodedToken`].
pub trait ClaimsDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<DecodedToken, DecodeError>;

    /// True if the token cannot be decoded or `now` is past
    /// `expires_at - grace`. A grace reaching before the representable
    /// range counts as expired.
    fn is_expired_at(&self, token: &str, grace: Duration, now: DateTime<Utc>) -> bool {
        match self.decode(token) {
            Ok(decoded) => decoded
                .expires_at
                .checked_sub_signed(grace)
                .is_none_or(|deadline| now > deadline),
            Err(_) => true,
        }
    }
}

/// JWT decoder used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtCodec;

impl ClaimsDecoder for JwtCodec {
    fn decode(&self, token: &str) -> Result<DecodedToken, DecodeError> {
        if token.is_empty() {
            return Err(DecodeError::Malformed("empty token".into()));
        }

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let payload = decode::<TokenPayload>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?
            .claims;

        let expires_at = DateTime::from_timestamp(payload.exp, 0)
            .ok_or_else(|| DecodeError::Malformed(format!("exp out of range: {}", payload.exp)))?;

        Ok(DecodedToken {
            subject: payload.sub,
            expires_at,
            claims: Claims {
                roles: payload.roles.into_iter().collect(),
                permissions: payload.permissions.into_iter().collect(),
                is_admin: payload.is_admin,
                tenant_id: payload.tenant_id,
            },
        })
    }
}

/// Decode a bearer token with [`JwtCodec`].
pub fn decode_token(token: &str) -> Result<DecodedToken, DecodeError> {
    JwtCodec.decode(token)
}

/// Whether `token` is undecodable or expires within `grace` from now.
pub fn is_expired(token: &str, grace: Duration) -> bool {
    JwtCodec.is_expired_at(token, grace, Utc::now())
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_support::{mint, mint_expiring_in};
    use super::*;

    fn grace() -> Duration {
        Duration::seconds(DEFAULT_EXPIRY_GRACE_SECS)
    }

    #[test]
    fn decodes_all_claims() {
        let token = mint(json!({
            "sub": "user-42",
            "exp": 2_000_000_000,
            "roles": ["admin", "editor"],
            "permissions": ["read:users", "*:reports"],
            "is_admin": true,
            "tenant_id": "tenant-7",
        }));

        let decoded = decode_token(&token).unwrap();
        assert_eq!(decoded.subject, "user-42");
        assert_eq!(decoded.expires_at.timestamp(), 2_000_000_000);
        assert!(decoded.claims.roles.contains("editor"));
        assert!(decoded.claims.permissions.contains("*:reports"));
        assert!(decoded.claims.is_admin);
        assert_eq!(decoded.claims.tenant_id.as_deref(), Some("tenant-7"));
    }

    #[test]
    fn accepts_camel_case_claim_names() {
        let token = mint(json!({
            "sub": "u",
            "exp": 2_000_000_000,
            "isAdmin": true,
            "tenantId": "t",
        }));
        let decoded = decode_token(&token).unwrap();
        assert!(decoded.claims.is_admin);
        assert_eq!(decoded.claims.tenant_id.as_deref(), Some("t"));
    }

    #[test]
    fn missing_optional_claims_default_to_empty() {
        let token = mint(json!({ "exp": 2_000_000_000 }));
        let decoded = decode_token(&token).unwrap();
        assert_eq!(decoded.subject, "");
        assert_eq!(decoded.claims, Claims::default());
    }

    #[test]
    fn expired_token_still_decodes() {
        let token = mint_expiring_in(-3600, json!({}));
        assert!(decode_token(&token).is_ok());
    }

    #[test]
    fn malformed_tokens_never_yield_claims() {
        let cases = vec![
            String::new(),
            "not-a-token".to_string(),
            "a.b.c".to_string(),
            "eyJhbGciOiJIUzI1NiJ9.bm90LWpzb24.c2ln".to_string(),
            mint(json!({ "sub": "no-exp" })),
            mint(json!({ "exp": 2_000_000_000, "roles": "admin" })),
            mint(json!({ "exp": 2_000_000_000, "is_admin": "yes" })),
        ];
        for token in cases {
            assert!(
                matches!(decode_token(&token), Err(DecodeError::Malformed(_))),
                "expected malformed for {token:?}"
            );
        }
    }

    #[test]
    fn fresh_token_is_not_expired() {
        let token = mint_expiring_in(3600, json!({}));
        assert!(!is_expired(&token, grace()));
    }

    #[test]
    fn token_inside_grace_window_is_expired() {
        let token = mint_expiring_in(60, json!({}));
        assert!(is_expired(&token, grace()));
        assert!(!is_expired(&token, Duration::zero()));
    }

    #[test]
    fn past_token_is_expired() {
        let token = mint_expiring_in(-10, json!({}));
        assert!(is_expired(&token, Duration::zero()));
    }

    #[test]
    fn undecodable_token_is_expired() {
        assert!(is_expired("garbage", Duration::zero()));
    }

    #[test]
    fn is_expired_at_uses_supplied_clock() {
        let token = mint(json!({ "exp": 1_000_000 }));
        let before = DateTime::from_timestamp(1_000_000 - 600, 0).unwrap();
        let inside = DateTime::from_timestamp(1_000_000 - 120, 0).unwrap();
        assert!(!JwtCodec.is_expired_at(&token, grace(), before));
        assert!(JwtCodec.is_expired_at(&token, grace(), inside));
    }

    #[test]
    fn oversized_grace_counts_as_expired() {
        let token = mint_expiring_in(3600, json!({}));
        assert!(is_expired(&token, Duration::seconds(9_000_000_000_000)));
    }
}
