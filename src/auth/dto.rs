use serde::{Deserialize, Serialize};

use crate::{config::SessionConfig, error::ApiError};

/// Request body for login. Fields are optional so that a missing field
/// is reported as 400 by [`LoginRequest::into_credentials`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn into_credentials(self) -> Result<Credentials, ApiError> {
        let email = self.email.unwrap_or_default().trim().to_lowercase();
        let password = self.password.unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::BadRequest("Email and password are required".into()));
        }
        Ok(Credentials { email, password })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(cfg: &SessionConfig, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        cfg.cookie_name,
        token,
        cfg.ttl_minutes.saturating_mul(60)
    );
    if cfg.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn cleared_cookie(cfg: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        cfg.cookie_name
    );
    if cfg.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
