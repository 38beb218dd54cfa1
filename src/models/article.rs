use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'articles' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub summary: String,
    pub body: String,

    /// URL to the cover image, if any.
    pub cover_img: Option<String>,

    /// Publication status: 'draft' or 'published'.
    pub status: String,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,

    pub comments_count: i32,
    pub rating_count: i32,
    pub rating_sum: i64,
}

/// DTO for creating a new article.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[validate(length(max = 500, message = "Summary must be at most 500 chars"))]
    #[serde(default)]
    pub summary: String,

    #[validate(length(
        min = 1,
        max = 100000,
        message = "Body length must be between 1 and 100000 chars"
    ))]
    pub body: String,

    #[validate(length(max = 500), custom(function = validate_optional_url))]
    pub cover_img: Option<String>,

    #[validate(custom(function = validate_status))]
    #[serde(default = "default_status")]
    pub status: String,
}

/// DTO for updating an article. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 500))]
    pub summary: Option<String>,
    #[validate(length(min = 1, max = 100000))]
    pub body: Option<String>,
    #[validate(length(max = 500), custom(function = validate_optional_url))]
    pub cover_img: Option<String>,
    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
}

/// Query parameters for listing articles.
#[derive(Debug, Deserialize)]
pub struct ArticleListParams {
    /// Cursor for pagination: the created_at timestamp of the last item in
    /// the previous page.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    /// Search keyword for title match.
    pub q: Option<String>,
}

pub fn default_status() -> String {
    "draft".to_string()
}

/// Restricts the publication status to 'draft' or 'published'.
pub fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    if status != "draft" && status != "published" {
        return Err(validator::ValidationError::new("invalid_status"));
    }
    Ok(())
}

/// Validates that a string, when present, is a correctly formatted URL.
pub fn validate_optional_url(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
