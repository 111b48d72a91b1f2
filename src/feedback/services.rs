use std::sync::Arc;

use axum::extract::FromRef;
use tracing::info;

use super::{
    repo::FeedbackStore,
    repo_types::{Feedback, NewFeedback, ValidationError},
};
use crate::{db::StoreError, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Owner-scoped feedback operations. `owner` always comes from an
/// authenticated session.
#[derive(Clone)]
pub struct FeedbackRepository {
    store: Arc<dyn FeedbackStore>,
}

impl FromRef<AppState> for FeedbackRepository {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.feedback.clone())
    }
}

impl FeedbackRepository {
    pub fn new(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, owner: i64) -> Result<Vec<Feedback>, StoreError> {
        self.store.list_by_user(owner).await
    }

    pub async fn create(
        &self,
        owner: i64,
        course_name: &str,
        rating: i64,
        comments: &str,
    ) -> Result<Feedback, FeedbackError> {
        let new = NewFeedback::new(course_name, rating, comments)?;
        let row = self.store.insert(owner, &new).await?;
        info!(user_id = owner, feedback_id = row.id, rating = row.rating, "feedback created");
        Ok(row)
    }

    pub async fn clear_all(&self, owner: i64) -> Result<u64, StoreError> {
        let deleted = self.store.delete_all_by_user(owner).await?;
        info!(user_id = owner, deleted, "feedback cleared");
        Ok(deleted)
    }
}
