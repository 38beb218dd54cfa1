use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::models::article::{default_status, validate_status};

/// Represents the 'blog_posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,

    /// Free-form tags, stored as a JSON array in the database.
    pub tags: Json<Vec<String>>,

    pub status: String,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,

    pub comments_count: i32,
    pub rating_count: i32,
    pub rating_sum: i64,
}

/// DTO for creating a new blog post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBlogPostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 50000))]
    pub body: String,

    #[validate(custom(function = validate_tags))]
    #[serde(default)]
    pub tags: Vec<String>,

    #[validate(custom(function = validate_status))]
    #[serde(default = "default_status")]
    pub status: String,
}

/// DTO for updating a blog post. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBlogPostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 50000))]
    pub body: Option<String>,
    #[validate(custom(function = validate_tags))]
    pub tags: Option<Vec<String>>,
    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
}

/// Query parameters for listing blog posts.
#[derive(Debug, Deserialize)]
pub struct BlogListParams {
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<i64>,
    pub q: Option<String>,

    /// Restrict to posts carrying this tag.
    pub tag: Option<String>,
}

fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags.len() > 10 {
        return Err(validator::ValidationError::new("too_many_tags"));
    }
    for tag in tags {
        if tag.is_empty() || tag.len() > 40 {
            return Err(validator::ValidationError::new("invalid_tag_length"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_limits_are_enforced() {
        assert!(validate_tags(&["rust".to_string(), "axum".to_string()]).is_ok());
        assert!(validate_tags(&[String::new()]).is_err());
        assert!(validate_tags(&["x".repeat(41)]).is_err());

        let many: Vec<String> = (0..11).map(|i| format!("tag{}", i)).collect();
        assert!(validate_tags(&many).is_err());
    }
}
