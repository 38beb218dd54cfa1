use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::article::{default_status, validate_status};

/// Represents the 'stories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub user_id: i64,
    pub title: String,

    /// Reader-facing genre label, e.g. "mystery".
    pub genre: String,

    pub synopsis: String,
    pub body: String,

    pub status: String,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,

    pub comments_count: i32,
    pub rating_count: i32,
    pub rating_sum: i64,
}

/// DTO for creating a new story.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 40))]
    #[serde(default = "default_genre")]
    pub genre: String,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub synopsis: String,

    #[validate(length(min = 1, max = 200000))]
    pub body: String,

    #[validate(custom(function = validate_status))]
    #[serde(default = "default_status")]
    pub status: String,
}

/// DTO for updating a story. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 40))]
    pub genre: Option<String>,
    #[validate(length(max = 1000))]
    pub synopsis: Option<String>,
    #[validate(length(min = 1, max = 200000))]
    pub body: Option<String>,
    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
}

/// Query parameters for listing stories.
#[derive(Debug, Deserialize)]
pub struct StoryListParams {
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub genre: Option<String>,
}

fn default_genre() -> String {
    "general".to_string()
}
