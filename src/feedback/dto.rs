use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{macros::format_description, OffsetDateTime, UtcOffset};

use super::repo_types::{Feedback, ValidationError};

/// Raw submit body. Every field is optional here so absence can be reported
/// as a validation error instead of a deserialisation failure.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    pub course_name: Option<String>,
    pub rating: Option<Value>,
    pub comments: Option<String>,
}

/// Submit body after shape checks. Domain rules are applied by the repository.
#[derive(Debug, PartialEq, Eq)]
pub struct FeedbackInput {
    pub course_name: String,
    pub rating: i64,
    pub comments: String,
}

impl SubmitFeedbackRequest {
    pub fn into_input(self) -> Result<FeedbackInput, ValidationError> {
        let course_name = self
            .course_name
            .ok_or(ValidationError::MissingField("courseName"))?;
        let comments = self
            .comments
            .ok_or(ValidationError::MissingField("comments"))?;
        let rating = match self.rating {
            None | Some(Value::Null) => return Err(ValidationError::MissingField("rating")),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    i
                } else if n.is_u64() {
                    return Err(ValidationError::RatingOutOfRange);
                } else {
                    return Err(ValidationError::InvalidRating);
                }
            }
            // "5" is not 5
            Some(_) => return Err(ValidationError::InvalidRating),
        };
        Ok(FeedbackInput {
            course_name,
            rating,
            comments,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    pub id: i64,
    pub course_name: String,
    pub rating: i16,
    pub comments: String,
    pub date: String,
}

impl From<Feedback> for FeedbackView {
    fn from(f: Feedback) -> Self {
        Self {
            id: f.id,
            date: format_date(f.created_at),
            course_name: f.course_name,
            rating: f.rating,
            comments: f.comments,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitFeedbackResponse {
    pub success: bool,
    pub feedback: FeedbackView,
}

#[derive(Debug, Serialize)]
pub struct ClearFeedbackResponse {
    pub success: bool,
    pub deleted: u64,
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_date(ts: OffsetDateTime) -> String {
    let utc = ts.to_offset(UtcOffset::UTC);
    utc.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| utc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn parse(json: &str) -> SubmitFeedbackRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_well_formed_body() {
        let input = parse(r#"{"courseName":"CS101","rating":5,"comments":"Great course"}"#)
            .into_input()
            .unwrap();
        assert_eq!(
            input,
            FeedbackInput {
                course_name: "CS101".into(),
                rating: 5,
                comments: "Great course".into(),
            }
        );
    }

    #[test]
    fn missing_fields() {
        for body in [
            r#"{"rating":5,"comments":"c"}"#,
            r#"{"courseName":"x","comments":"c"}"#,
            r#"{"courseName":"x","rating":null,"comments":"c"}"#,
            r#"{"courseName":"x","rating":5}"#,
            r#"{}"#,
        ] {
            assert!(
                matches!(parse(body).into_input(), Err(ValidationError::MissingField(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn rating_is_never_coerced() {
        for body in [
            r#"{"courseName":"x","rating":"5","comments":"c"}"#,
            r#"{"courseName":"x","rating":4.5,"comments":"c"}"#,
            r#"{"courseName":"x","rating":true,"comments":"c"}"#,
            r#"{"courseName":"x","rating":[5],"comments":"c"}"#,
        ] {
            assert_eq!(
                parse(body).into_input(),
                Err(ValidationError::InvalidRating),
                "{body}"
            );
        }
        assert_eq!(
            parse(r#"{"courseName":"x","rating":18446744073709551615,"comments":"c"}"#)
                .into_input(),
            Err(ValidationError::RatingOutOfRange)
        );
    }

    #[test]
    fn out_of_range_passes_shape_check() {
        // range is the repository's call
        let input = parse(r#"{"courseName":"x","rating":6,"comments":"c"}"#)
            .into_input()
            .unwrap();
        assert_eq!(input.rating, 6);
    }

    #[test]
    fn view_uses_camel_case_and_formatted_date() {
        let view = FeedbackView::from(Feedback {
            id: 3,
            user_id: 9,
            course_name: "CS101".into(),
            rating: 5,
            comments: "Great course".into(),
            created_at: datetime!(2024-03-01 09:05:07 +02:00),
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["courseName"], "CS101");
        assert_eq!(json["rating"], 5);
        assert_eq!(json["date"], "2024-03-01 07:05:07");
        assert!(json.get("user_id").is_none());
        assert!(json.get("userId").is_none());
    }
}
