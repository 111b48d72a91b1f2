use sqlx::FromRow;
use time::OffsetDateTime;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    pub course_name: String,
    pub rating: i16,
    pub comments: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingField(&'static str),
    #[error("Invalid rating")]
    InvalidRating,
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,
}

/// Feedback that has passed domain validation and may be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    course_name: String,
    rating: i16,
    comments: String,
}

impl NewFeedback {
    /// Rejects blank text and ratings outside 1..=5. Nothing is trimmed or clamped.
    pub fn new(course_name: &str, rating: i64, comments: &str) -> Result<Self, ValidationError> {
        if course_name.trim().is_empty() {
            return Err(ValidationError::MissingField("courseName"));
        }
        if comments.trim().is_empty() {
            return Err(ValidationError::MissingField("comments"));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange);
        }
        Ok(Self {
            course_name: course_name.to_owned(),
            rating: rating as i16,
            comments: comments.to_owned(),
        })
    }

    pub fn course_name(&self) -> &str {
        &self.course_name
    }

    pub fn rating(&self) -> i16 {
        self.rating
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }
}
