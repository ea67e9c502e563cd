// ============================
// filedrop-lib/src/auth/session.rs
// ============================
//! Session resolution: cookie -> token -> user.
use std::sync::Arc;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use filedrop_common::User;
use crate::error::{AppError, AuthError, TokenError};
use crate::storage::BlobStore;
use crate::AppState;
use super::{CredentialStore, TokenService};

/// Cookie carrying the session token
pub const AUTH_COOKIE: &str = "access_token";

/// Scheme prefix of the cookie value
pub const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated user behind a request.
///
/// Extracting this rejects the request with 401 unless the `access_token`
/// cookie holds a valid token for an existing user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Find a cookie by name across all `Cookie` headers.
///
/// Surrounding double quotes are stripped, since values containing spaces are
/// commonly stored quoted.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            let value = value.trim();
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
                .to_string()
        })
}

/// Strip the `Bearer ` scheme from a cookie value
pub fn bearer_token(value: &str) -> Result<&str, TokenError> {
    value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(TokenError::Malformed)
}

/// Resolve the request's session cookie to a registered user
pub async fn resolve_session(
    headers: &HeaderMap,
    tokens: &TokenService,
    credentials: &dyn CredentialStore,
) -> Result<User, AppError> {
    let raw = cookie_value(headers, AUTH_COOKIE).ok_or(AuthError::Unauthenticated)?;
    let token = bearer_token(&raw).map_err(AuthError::from)?;

    let claims = tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "rejected session token");
        AuthError::from(e)
    })?;

    match credentials.find_by_username(&claims.sub).await? {
        Some(user) => Ok(user),
        None => {
            tracing::debug!(username = %claims.sub, "token subject no longer exists");
            Err(AuthError::UserNotFound.into())
        },
    }
}

impl<S> FromRequestParts<Arc<AppState<S>>> for CurrentUser
where
    S: BlobStore + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_session(&parts.headers, &state.tokens, state.credentials.as_ref()).await?;
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn test_cookie_value_finds_named_cookie() {
        let headers = headers_with(&["theme=dark; access_token=\"Bearer abc.def.ghi\"; lang=en"]);
        assert_eq!(
            cookie_value(&headers, AUTH_COOKIE).as_deref(),
            Some("Bearer abc.def.ghi")
        );
        assert_eq!(cookie_value(&headers, "lang").as_deref(), Some("en"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_value_searches_every_header() {
        let headers = headers_with(&["theme=dark", "access_token=Bearer xyz"]);
        assert_eq!(cookie_value(&headers, AUTH_COOKIE).as_deref(), Some("Bearer xyz"));
    }

    #[test]
    fn test_cookie_name_must_match_exactly() {
        let headers = headers_with(&["my_access_token=Bearer xyz"]);
        assert_eq!(cookie_value(&headers, AUTH_COOKIE), None);
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Ok("abc"));
        assert_eq!(bearer_token("abc"), Err(TokenError::Malformed));
        assert_eq!(bearer_token("Bearer "), Err(TokenError::Malformed));
        assert_eq!(bearer_token("Basic abc"), Err(TokenError::Malformed));
    }
}
