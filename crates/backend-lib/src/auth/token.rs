// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying the username as `sub` and an absolute `exp`.
//! Nothing is stored server-side: a token is valid while its signature checks
//! out and its expiry has not passed. There is no revocation.
use std::time::Duration;
use chrono::{DateTime, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use filedrop_common::Claims;
use crate::error::{AppError, TokenError};

/// Default token lifetime (30 minutes)
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Issues and verifies session tokens with a server-held secret
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a token service keyed with `secret`
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is compared against an explicit clock in `verify_at`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `username` that expires `ttl` from now
    pub fn issue(&self, username: &str, ttl: Duration) -> Result<String, AppError> {
        self.issue_at(username, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, username: &str, ttl: Duration, now: DateTime<Utc>) -> Result<String, AppError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Internal(format!("token ttl out of range: {e}")))?;
        let claims = Claims {
            sub: username.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// The signature is checked before expiry, so a forged token is reported
    /// as `InvalidSignature` even when it is also stale.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                },
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_token_round_trip_carries_subject() {
        let tokens = TokenService::new(SECRET);
        let token = tokens.issue("alice", DEFAULT_TOKEN_TTL).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_token_expiry_boundary() {
        let tokens = TokenService::new(SECRET);
        let t = issued_at();
        let token = tokens.issue_at("alice", DEFAULT_TOKEN_TTL, t).unwrap();

        let at_29 = t + chrono::Duration::minutes(29);
        assert_eq!(tokens.verify_at(&token, at_29).unwrap().sub, "alice");

        let at_30 = t + chrono::Duration::minutes(30);
        assert!(tokens.verify_at(&token, at_30).is_ok());

        let at_31 = t + chrono::Duration::minutes(31);
        assert_eq!(tokens.verify_at(&token, at_31), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_from_other_key_is_rejected() {
        let ours = TokenService::new(SECRET);
        let theirs = TokenService::new(b"another-secret-another-secret-xx");
        let token = theirs.issue("alice", DEFAULT_TOKEN_TTL).unwrap();

        assert_eq!(ours.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let tokens = TokenService::new(SECRET);
        let token = tokens.issue("alice", DEFAULT_TOKEN_TTL).unwrap();
        let forged_payload = tokens
            .issue("mallory", DEFAULT_TOKEN_TTL)
            .unwrap()
            .split('.')
            .nth(1)
            .unwrap()
            .to_string();

        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_payload;
        let forged = parts.join(".");

        assert_eq!(tokens.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let tokens = TokenService::new(SECRET);
        assert_eq!(tokens.verify(""), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("not.a.jwt"), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("abc"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_token_without_subject_is_malformed() {
        let tokens = TokenService::new(SECRET);
        let exp = (Utc::now() + chrono::Duration::minutes(5)).timestamp();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "exp": exp }),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(tokens.verify(&token), Err(TokenError::Malformed));
    }
}
