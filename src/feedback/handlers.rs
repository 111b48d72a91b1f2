use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{delete, get},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ClearFeedbackResponse, FeedbackView, SubmitFeedbackRequest, SubmitFeedbackResponse},
    services::{FeedbackError, FeedbackRepository},
};
use crate::{auth::extractors::CurrentUser, error::ApiError, state::AppState};

pub fn feedback_routes() -> Router<AppState> {
    Router::new()
        .route("/feedback", get(list_feedback).post(submit_feedback))
        .route("/feedback/clear", delete(clear_feedback))
}

#[instrument(skip(repo, user), fields(user_id = user.user_id))]
pub async fn list_feedback(
    State(repo): State<FeedbackRepository>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<FeedbackView>>, ApiError> {
    let rows = repo.list(user.user_id).await?;
    Ok(Json(rows.into_iter().map(FeedbackView::from).collect()))
}

#[instrument(skip(repo, user, payload), fields(user_id = user.user_id))]
pub async fn submit_feedback(
    State(repo): State<FeedbackRepository>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<SubmitFeedbackRequest>, JsonRejection>,
) -> Result<Json<SubmitFeedbackResponse>, ApiError> {
    let Json(payload) = payload?;
    let input = payload.into_input().map_err(FeedbackError::from)?;

    let row = repo
        .create(user.user_id, &input.course_name, input.rating, &input.comments)
        .await?;

    Ok(Json(SubmitFeedbackResponse {
        success: true,
        feedback: row.into(),
    }))
}

#[instrument(skip(repo, user), fields(user_id = user.user_id))]
pub async fn clear_feedback(
    State(repo): State<FeedbackRepository>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ClearFeedbackResponse>, ApiError> {
    let deleted = repo.clear_all(user.user_id).await?;
    Ok(Json(ClearFeedbackResponse {
        success: true,
        deleted,
    }))
}
