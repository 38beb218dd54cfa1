use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'gallery_items' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub caption: String,

    /// The original upload URL. Immutable after creation because the
    /// derived variants below are keyed off it.
    pub image_url: String,

    /// Derived variants, populated by the image job queue.
    pub thumbnail_url: Option<String>,
    pub web_url: Option<String>,

    /// 'pending', 'processing', 'ready' or 'failed'.
    pub processing_status: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,

    pub comments_count: i32,
    pub rating_count: i32,
    pub rating_sum: i64,
}

/// DTO for creating a new gallery item.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGalleryItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub caption: String,

    #[validate(length(min = 1, max = 500), custom(function = validate_image_url))]
    pub image_url: String,
}

/// DTO for editing a gallery item. Only the descriptive fields move.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGalleryItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub caption: Option<String>,
}

fn validate_image_url(url: &str) -> Result<(), validator::ValidationError> {
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_image_url")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_url_requires_http_scheme() {
        assert!(validate_image_url("https://cdn.example.com/u/1/raw.png").is_ok());
        assert!(validate_image_url("ftp://example.com/raw.png").is_err());
        assert!(validate_image_url("javascript:alert(1)").is_err());
        assert!(validate_image_url("raw.png").is_err());
    }
}
