use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'ratings' table.
/// One row per (user, content); the score is upserted on re-rating.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub content_kind: String,
    pub content_id: i64,
    pub score: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a rating.
#[derive(Debug, Deserialize, Validate)]
pub struct RateRequest {
    #[validate(range(min = 1, max = 5, message = "Score must be between 1 and 5"))]
    pub score: i32,
}

/// Aggregate view returned for a piece of content.
#[derive(Debug, Serialize)]
pub struct RatingSummary {
    pub count: i32,
    pub average: f64,
    /// The caller's own score, when the request carried a valid token.
    pub mine: Option<i32>,
}

impl RatingSummary {
    pub fn from_aggregates(count: i32, sum: i64, mine: Option<i32>) -> Self {
        let average = if count > 0 {
            sum as f64 / count as f64
        } else {
            0.0
        };
        Self {
            count,
            average,
            mine,
        }
    }
}
