// src/jobs/image.rs

use std::time::Duration;

use async_trait::async_trait;

use super::JobHandler;
use crate::{error::AppError, models::job::ImageJob, state::AppState};

/// Approximates the transform cost. The portal stores URLs, not pixels;
/// a real resizer would slot in here without touching the queue.
const TRANSFORM_DELAY: Duration = Duration::from_millis(150);

/// Derives the URL of a variant from the original by suffixing the file
/// stem: `.../photo.png` -> `.../photo_thumb.png`.
pub fn variant_url(image_url: &str, suffix: &str) -> String {
    match image_url.rfind('.') {
        // Only treat the dot as an extension separator if it is part of the
        // final path segment.
        Some(idx) if !image_url[idx..].contains('/') => {
            format!("{}_{}{}", &image_url[..idx], suffix, &image_url[idx..])
        }
        _ => format!("{}_{}", image_url, suffix),
    }
}

async fn source_url(state: &AppState, gallery_item_id: i64) -> Result<String, AppError> {
    let url: Option<(String,)> =
        sqlx::query_as("SELECT image_url FROM gallery_items WHERE id = $1 AND deleted_at IS NULL")
            .bind(gallery_item_id)
            .fetch_optional(&state.pool)
            .await?;

    url.map(|(u,)| u)
        .ok_or_else(|| AppError::NotFound("Gallery item is gone".to_string()))
}

pub struct ThumbnailJob;

#[async_trait]
impl JobHandler for ThumbnailJob {
    fn kind(&self) -> &'static str {
        "thumbnail"
    }

    async fn run(&self, state: &AppState, job: &ImageJob) -> Result<(), AppError> {
        let original = source_url(state, job.gallery_item_id).await?;
        tokio::time::sleep(TRANSFORM_DELAY).await;

        sqlx::query("UPDATE gallery_items SET thumbnail_url = $1, updated_at = NOW() WHERE id = $2")
            .bind(variant_url(&original, "thumb"))
            .bind(job.gallery_item_id)
            .execute(&state.pool)
            .await?;

        Ok(())
    }
}

pub struct WebVariantJob;

#[async_trait]
impl JobHandler for WebVariantJob {
    fn kind(&self) -> &'static str {
        "web"
    }

    async fn run(&self, state: &AppState, job: &ImageJob) -> Result<(), AppError> {
        let original = source_url(state, job.gallery_item_id).await?;
        tokio::time::sleep(TRANSFORM_DELAY).await;

        sqlx::query("UPDATE gallery_items SET web_url = $1, updated_at = NOW() WHERE id = $2")
            .bind(variant_url(&original, "web"))
            .bind(job.gallery_item_id)
            .execute(&state.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_url_inserts_suffix_before_extension() {
        assert_eq!(
            variant_url("https://cdn.example.com/u/1/photo.png", "thumb"),
            "https://cdn.example.com/u/1/photo_thumb.png"
        );
    }

    #[test]
    fn variant_url_handles_missing_extension() {
        assert_eq!(
            variant_url("https://cdn.example.com/u/1/photo", "web"),
            "https://cdn.example.com/u/1/photo_web"
        );
    }

    #[test]
    fn variant_url_ignores_dots_in_directories() {
        assert_eq!(
            variant_url("https://cdn.example.com/v1.2/photo", "thumb"),
            "https://cdn.example.com/v1.2/photo_thumb"
        );
    }
}
