use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Wiki slugs are lowercase kebab-case, e.g. "release-process".
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

/// Represents the 'wiki_pages' table in the database.
///
/// Wiki pages have no draft state: every edit is live immediately and
/// snapshotted into `content_versions` so it can be restored.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WikiPage {
    pub id: i64,

    /// Unique, URL-addressable identifier.
    pub slug: String,

    pub title: String,
    pub body: String,

    /// The user who made the most recent edit.
    pub last_editor: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,

    pub comments_count: i32,
    pub rating_count: i32,
    pub rating_sum: i64,
}

/// DTO for creating a new wiki page.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWikiPageRequest {
    #[validate(length(min = 1, max = 100), custom(function = validate_slug))]
    pub slug: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 200000))]
    pub body: String,
}

/// DTO for editing a wiki page. The slug is immutable.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWikiPageRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200000))]
    pub body: Option<String>,
}

pub fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if !SLUG_RE.is_match(slug) {
        return Err(validator::ValidationError::new("invalid_slug"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_kebab_case() {
        assert!(validate_slug("release-process").is_ok());
        assert!(validate_slug("a").is_ok());
        assert!(validate_slug("v2-migration-notes").is_ok());

        assert!(validate_slug("Release-Process").is_err());
        assert!(validate_slug("double--dash").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("trailing-").is_err());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("").is_err());
    }
}
