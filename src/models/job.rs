use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'image_jobs' table.
/// One row per derived variant of a gallery upload.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ImageJob {
    pub id: i64,
    pub gallery_item_id: i64,

    /// Variant to produce: 'thumbnail' or 'web'.
    pub kind: String,

    /// 'pending', 'processing', 'done' or 'failed'.
    pub status: String,

    pub attempts: i32,
    pub last_error: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for the admin job listing.
#[derive(Debug, Deserialize)]
pub struct JobListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
}
