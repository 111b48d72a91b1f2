use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{
            cleared_cookie, session_cookie, CheckAuthResponse, LoginRequest, LoginResponse,
            LogoutResponse,
        },
        extractors::SessionToken,
        services::Authenticator,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/check-auth", get(check_auth))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let creds = payload.into_credentials()?;

    let auth = Authenticator::from_ref(&state);
    let outcome = auth
        .authenticate_or_register(&creds.email, &creds.password)
        .await?;

    let cookie = session_cookie(&state.config.session, &outcome.token);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            email: outcome.user.email,
        }),
    ))
}

/// Always succeeds; the browser cookie is cleared even if the store is down.
#[instrument(skip(state, token))]
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> impl IntoResponse {
    if let Some(token) = token {
        let auth = Authenticator::from_ref(&state);
        if let Err(e) = auth.end_session(&token).await {
            error!(error = %e, "end_session failed");
        }
    }
    (
        [(header::SET_COOKIE, cleared_cookie(&state.config.session))],
        Json(LogoutResponse { success: true }),
    )
}

#[instrument(skip(state, token))]
pub async fn check_auth(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Json<CheckAuthResponse> {
    let user = match token {
        Some(token) => match Authenticator::from_ref(&state).check_session(&token).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "check_session failed; reporting unauthenticated");
                None
            }
        },
        None => None,
    };

    Json(CheckAuthResponse {
        authenticated: user.is_some(),
        email: user.map(|u| u.email),
    })
}
