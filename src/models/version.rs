use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'content_versions' table.
///
/// A row is the state of a piece of content *before* a mutating edit;
/// version numbers are dense and monotonic per (content_kind, content_id).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentVersion {
    pub id: i64,
    pub content_kind: String,
    pub content_id: i64,
    pub version_no: i32,
    pub title: String,
    pub body: String,
    pub edited_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
