use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::warn;

use super::services::{Authenticator, SessionUser};
use crate::{error::ApiError, state::AppState};

/// Finds `name` among the request's `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == name && !v.is_empty()).then_some(v)
        })
}

/// Raw session token from the cookie, if any. Never rejects.
pub struct SessionToken(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppState> for SessionToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let name = &state.config.session.cookie_name;
        Ok(SessionToken(
            cookie_value(&parts.headers, name).map(str::to_owned),
        ))
    }
}

/// The authenticated caller. Rejects with 401 before the handler runs.
pub struct CurrentUser(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state)
            .await
            .unwrap_or(SessionToken(None));
        let token = token.ok_or(ApiError::Unauthenticated)?;

        let auth = Authenticator::from_ref(state);
        match auth.check_session(&token).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                warn!(path = %parts.uri.path(), "invalid or expired session");
                Err(ApiError::Unauthenticated)
            }
        }
    }
}
