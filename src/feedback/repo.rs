use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Feedback, NewFeedback};
use crate::db::StoreError;

/// Row storage for feedback. Every call is scoped to one owner and trusts
/// the caller to have authenticated that owner.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Newest first; ties on `created_at` are broken by id, newest first.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Feedback>, StoreError>;

    async fn insert(&self, user_id: i64, new: &NewFeedback) -> Result<Feedback, StoreError>;

    /// Deletes all of the owner's rows in one statement.
    async fn delete_all_by_user(&self, user_id: i64) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgFeedbackStore {
    db: PgPool,
}

impl PgFeedbackStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Feedback>, StoreError> {
        let rows = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT id, user_id, course_name, rating, comments, created_at
            FROM feedback
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, user_id: i64, new: &NewFeedback) -> Result<Feedback, StoreError> {
        let row = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (user_id, course_name, rating, comments)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, course_name, rating, comments, created_at
            "#,
        )
        .bind(user_id)
        .bind(new.course_name())
        .bind(new.rating())
        .bind(new.comments())
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_all_by_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM feedback WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
