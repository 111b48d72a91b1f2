use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::SessionKeys,
        password::{hash_password_blocking, verify_password_blocking, PasswordError},
        repo::CredentialStore,
        repo_types::User,
        session::{Session, SessionStore},
    },
    db::StoreError,
    state::AppState,
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("session expiry out of range")]
    ExpiryOutOfRange,
    #[error("sign session token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Identity bound to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: SessionUser,
    pub token: String,
    /// True when this login created the account.
    pub registered: bool,
}

/// Credential checks and session lifecycle.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    keys: Arc<SessionKeys>,
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            state.sessions.clone(),
            state.keys.clone(),
        )
    }
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        keys: Arc<SessionKeys>,
    ) -> Self {
        Self { users, sessions, keys }
    }

    /// Signs the user in, creating the account first if the email is unseen.
    ///
    /// There is no separate sign-up: the first login for an email registers
    /// it with the given password, and every later login must match that
    /// password.
    pub async fn authenticate_or_register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let (user, registered) = match self.users.find_by_email(email).await? {
            Some(user) => (self.check_password(user, password).await?, false),
            None => self.register(email, password).await?,
        };

        let token = self.start_session(&user).await?;
        if registered {
            info!(user_id = user.id, email = %user.email, "user registered");
        } else {
            info!(user_id = user.id, email = %user.email, "user logged in");
        }

        Ok(LoginOutcome {
            user: SessionUser {
                user_id: user.id,
                email: user.email,
            },
            token,
            registered,
        })
    }

    async fn register(&self, email: &str, password: &str) -> Result<(User, bool), AuthError> {
        let hash = hash_password_blocking(password.to_owned()).await?;
        match self.users.create(email, &hash).await {
            Ok(user) => Ok((user, true)),
            // Lost a race with a concurrent first login for the same email:
            // the winner's row is authoritative.
            Err(StoreError::Duplicate) => {
                let user = self
                    .users
                    .find_by_email(email)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                Ok((self.check_password(user, password).await?, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn check_password(&self, user: User, password: &str) -> Result<User, AuthError> {
        let ok = verify_password_blocking(password.to_owned(), user.password_hash.clone()).await?;
        if !ok {
            warn!(user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    async fn start_session(&self, user: &User) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            email: user.email.clone(),
            created_at: now,
            expires_at: now
                .checked_add(self.keys.ttl)
                .ok_or(AuthError::ExpiryOutOfRange)?,
        };
        self.sessions.insert(&session).await?;
        Ok(self.keys.sign(&session)?)
    }

    /// Resolves a cookie token to its user. Tampered, expired, revoked or
    /// unknown tokens all yield `Ok(None)`; only store failures are errors.
    pub async fn check_session(&self, token: &str) -> Result<Option<SessionUser>, StoreError> {
        let claims = match self.keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                return Ok(None);
            }
        };
        let Some(session) = self.sessions.find(claims.sid).await? else {
            return Ok(None);
        };
        if session.user_id != claims.sub {
            warn!(sid = %claims.sid, "session token subject mismatch");
            return Ok(None);
        }
        Ok(Some(SessionUser {
            user_id: session.user_id,
            email: session.email,
        }))
    }

    /// Idempotent: unknown, malformed or already-ended tokens succeed.
    pub async fn end_session(&self, token: &str) -> Result<(), StoreError> {
        if let Ok(claims) = self.keys.verify_allow_expired(token) {
            self.sessions.delete(claims.sid).await?;
            info!(user_id = claims.sub, "session ended");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::hash_password, testing::RacedCredentialStore};

    fn authenticator() -> (Authenticator, AppState) {
        let state = AppState::fake();
        (Authenticator::from_ref(&state), state)
    }

    #[tokio::test]
    async fn first_login_registers_exactly_one_user() {
        let (auth, state) = authenticator();
        let out = auth.authenticate_or_register("a@x.com", "pw").await.unwrap();
        assert!(out.registered);
        assert_eq!(out.user.email, "a@x.com");

        let stored = state.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.id, out.user.user_id);
        assert_ne!(stored.password_hash, "pw");
    }

    #[tokio::test]
    async fn repeat_login_reuses_the_account() {
        let (auth, _state) = authenticator();
        let first = auth.authenticate_or_register("a@x.com", "pw").await.unwrap();
        let second = auth.authenticate_or_register("a@x.com", "pw").await.unwrap();
        assert!(!second.registered);
        assert_eq!(first.user.user_id, second.user.user_id);
        assert_ne!(first.token, second.token);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (auth, _state) = authenticator();
        auth.authenticate_or_register("a@x.com", "pw").await.unwrap();
        let err = auth
            .authenticate_or_register("a@x.com", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn email_is_an_exact_key() {
        let (auth, _state) = authenticator();
        let lower = auth.authenticate_or_register("a@x.com", "pw").await.unwrap();
        let upper = auth.authenticate_or_register("A@x.com", "pw2").await.unwrap();
        assert!(upper.registered);
        assert_ne!(lower.user.user_id, upper.user.user_id);
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let (auth, _state) = authenticator();
        let out = auth.authenticate_or_register("a@x.com", "pw").await.unwrap();

        let who = auth.check_session(&out.token).await.unwrap();
        assert_eq!(who, Some(out.user.clone()));

        auth.end_session(&out.token).await.unwrap();
        assert_eq!(auth.check_session(&out.token).await.unwrap(), None);

        // idempotent
        auth.end_session(&out.token).await.unwrap();
        auth.end_session("garbage").await.unwrap();
    }

    #[tokio::test]
    async fn check_session_rejects_unknown_tokens() {
        let (auth, _state) = authenticator();
        assert_eq!(auth.check_session("").await.unwrap(), None);
        assert_eq!(auth.check_session("a.b.c").await.unwrap(), None);
    }

    fn raced_authenticator(winner_password: &str) -> Authenticator {
        let state = AppState::fake();
        let winner = User {
            id: 41,
            email: "race@x.com".into(),
            password_hash: hash_password(winner_password).unwrap(),
            created_at: OffsetDateTime::now_utc(),
        };
        Authenticator::new(
            Arc::new(RacedCredentialStore::new(winner)),
            state.sessions.clone(),
            state.keys.clone(),
        )
    }

    #[tokio::test]
    async fn lost_registration_race_logs_into_winning_account() {
        let auth = raced_authenticator("pw");
        let out = auth.authenticate_or_register("race@x.com", "pw").await.unwrap();
        assert!(!out.registered);
        assert_eq!(out.user.user_id, 41);
        assert!(auth.check_session(&out.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn lost_registration_race_with_other_password_is_rejected() {
        let auth = raced_authenticator("pw");
        let err = auth
            .authenticate_or_register("race@x.com", "not-pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn expiry_past_the_calendar_is_an_error_not_a_panic() {
        let state = AppState::fake();
        let mut keys = SessionKeys::new(&state.config.session).unwrap();
        keys.ttl = time::Duration::MAX;
        let auth = Authenticator::new(state.users.clone(), state.sessions.clone(), Arc::new(keys));

        let err = auth
            .authenticate_or_register("a@x.com", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiryOutOfRange));
    }

    #[test]
    fn oversized_ttl_is_refused_when_building_state() {
        let mut config = (*AppState::fake_config()).clone();
        config.session.ttl_minutes = i64::MAX;
        let state = AppState::from_parts(
            Arc::new(config),
            Arc::new(crate::testing::MemoryCredentialStore::default()),
            Arc::new(crate::testing::MemoryFeedbackStore::default()),
            Arc::new(crate::auth::session::MemorySessionStore::new()),
        );
        assert!(state.is_err());
    }

    #[tokio::test]
    async fn sessions_of_one_user_are_independent() {
        let (auth, _state) = authenticator();
        let a = auth.authenticate_or_register("a@x.com", "pw").await.unwrap();
        let b = auth.authenticate_or_register("a@x.com", "pw").await.unwrap();
        auth.end_session(&a.token).await.unwrap();
        assert!(auth.check_session(&b.token).await.unwrap().is_some());
    }
}
