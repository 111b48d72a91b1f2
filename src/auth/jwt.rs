use anyhow::Context;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::Duration;
use tracing::debug;

use crate::{
    auth::{claims::SessionClaims, session::Session},
    config::SessionConfig,
};

/// Signs and verifies the session cookie value. Built once at startup and
/// shared through `AppState`.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl SessionKeys {
    pub fn new(cfg: &SessionConfig) -> anyhow::Result<Self> {
        let ttl_secs = cfg
            .ttl_minutes
            .checked_mul(60)
            .filter(|secs| *secs > 0)
            .context("session ttl out of range")?;
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    pub fn sign(&self, session: &Session) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sid: session.id,
            sub: session.user_id,
            iat: session.created_at.unix_timestamp() as usize,
            exp: session.expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = session.user_id, sid = %session.id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation())?;
        Ok(data.claims)
    }

    /// Signature, issuer and audience are still checked; only `exp` is not.
    /// Used when tearing a session down.
    pub fn verify_allow_expired(
        &self,
        token: &str,
    ) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let mut validation = self.validation();
        validation.validate_exp = false;
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }
}
