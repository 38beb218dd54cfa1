// src/jobs/mod.rs

pub mod dispatcher;
pub mod image;

use async_trait::async_trait;

use crate::{error::AppError, models::job::ImageJob, state::AppState};

/// A worker for one image job kind.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn kind(&self) -> &'static str;
    async fn run(&self, state: &AppState, job: &ImageJob) -> Result<(), AppError>;
}

/// All handlers the dispatcher knows about.
pub fn registry() -> Vec<Box<dyn JobHandler>> {
    vec![
        Box::new(image::ThumbnailJob),
        Box::new(image::WebVariantJob),
    ]
}

/// Queues one job per derived variant for a freshly created gallery item.
/// Runs inside the item's creation transaction so an item never exists
/// without its jobs.
pub async fn enqueue_variants(
    conn: &mut sqlx::PgConnection,
    gallery_item_id: i64,
) -> Result<(), sqlx::Error> {
    for kind in ["thumbnail", "web"] {
        sqlx::query("INSERT INTO image_jobs (gallery_item_id, kind) VALUES ($1, $2)")
            .bind(gallery_item_id)
            .bind(kind)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
