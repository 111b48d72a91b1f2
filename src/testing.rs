//! In-memory stores used by unit tests in place of PostgreSQL.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    auth::{repo::CredentialStore, repo_types::User},
    db::StoreError,
    feedback::{
        repo::FeedbackStore,
        repo_types::{Feedback, NewFeedback},
    },
};

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<User>>,
}

impl MemoryCredentialStore {
    pub async fn count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: users.len() as i64 + 1,
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Credential store that loses every registration race: the first lookup
/// misses, `create` hits the unique index, and later lookups see `winner`.
pub struct RacedCredentialStore {
    winner: User,
    looked_up: AtomicBool,
}

impl RacedCredentialStore {
    pub fn new(winner: User) -> Self {
        Self {
            winner,
            looked_up: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CredentialStore for RacedCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        if !self.looked_up.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok((self.winner.email == email).then(|| self.winner.clone()))
    }

    async fn create(&self, _email: &str, _password_hash: &str) -> Result<User, StoreError> {
        Err(StoreError::Duplicate)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFeedbackStore {
    inner: Mutex<FeedbackRows>,
}

#[derive(Default)]
struct FeedbackRows {
    next_id: i64,
    rows: Vec<Feedback>,
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Feedback>, StoreError> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<Feedback> = inner
            .rows
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn insert(&self, user_id: i64, new: &NewFeedback) -> Result<Feedback, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let row = Feedback {
            id: inner.next_id,
            user_id,
            course_name: new.course_name().to_owned(),
            rating: new.rating(),
            comments: new.comments().to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn delete_all_by_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.rows.len();
        inner.rows.retain(|f| f.user_id != user_id);
        Ok((before - inner.rows.len()) as u64)
    }
}
