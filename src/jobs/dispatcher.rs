// src/jobs/dispatcher.rs

use std::time::Duration;

use sqlx::PgPool;

use super::{JobHandler, registry};
use crate::{
    models::{content::ContentKind, job::ImageJob},
    realtime::content_event,
    state::AppState,
};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_ATTEMPTS: i32 = 3;

/// Background dispatcher: claims pending image jobs one at a time and runs
/// the matching handler. Multiple dispatchers are safe thanks to
/// FOR UPDATE SKIP LOCKED on the claim.
pub async fn run(state: AppState) {
    let handlers = registry();
    tracing::info!("Image job dispatcher started");

    loop {
        match claim_next(&state.pool).await {
            Ok(Some(job)) => process(&state, &handlers, job).await,
            Ok(None) => tokio::time::sleep(POLL_INTERVAL).await,
            Err(e) => {
                tracing::error!("Job claim failed: {}", e);
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// Atomically claims the oldest pending job.
async fn claim_next(pool: &PgPool) -> Result<Option<ImageJob>, sqlx::Error> {
    sqlx::query_as::<_, ImageJob>(
        r#"
        UPDATE image_jobs
        SET status = 'processing', attempts = attempts + 1, started_at = NOW()
        WHERE id = (
            SELECT id FROM image_jobs
            WHERE status = 'pending'
            ORDER BY id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, gallery_item_id, kind, status, attempts, last_error,
                  created_at, started_at, finished_at
        "#,
    )
    .fetch_optional(pool)
    .await
}

async fn process(state: &AppState, handlers: &[Box<dyn JobHandler>], job: ImageJob) {
    let result = match handlers.iter().find(|h| h.kind() == job.kind) {
        Some(handler) => handler.run(state, &job).await,
        None => Err(crate::error::AppError::BadRequest(format!(
            "No handler for job kind '{}'",
            job.kind
        ))),
    };

    match result {
        Ok(()) => {
            if let Err(e) = complete(state, &job).await {
                tracing::error!("Failed to finalize job {}: {}", job.id, e);
            }
        }
        Err(e) => {
            tracing::warn!(
                "Job {} ({}) attempt {} failed: {}",
                job.id,
                job.kind,
                job.attempts,
                e
            );
            if let Err(e) = fail(state, &job, &e.to_string()).await {
                tracing::error!("Failed to record job failure {}: {}", job.id, e);
            }
        }
    }
}

/// Marks the job done; when it was the item's last outstanding job, flips
/// the item to 'ready' and notifies its room.
async fn complete(state: &AppState, job: &ImageJob) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE image_jobs SET status = 'done', finished_at = NOW(), last_error = NULL WHERE id = $1",
    )
    .bind(job.id)
    .execute(&state.pool)
    .await?;

    let outstanding: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM image_jobs WHERE gallery_item_id = $1 AND status <> 'done'",
    )
    .bind(job.gallery_item_id)
    .fetch_one(&state.pool)
    .await?;

    if outstanding.0 == 0 {
        sqlx::query(
            "UPDATE gallery_items SET processing_status = 'ready', updated_at = NOW() WHERE id = $1",
        )
        .bind(job.gallery_item_id)
        .execute(&state.pool)
        .await?;

        state
            .hub
            .publish(content_event(
                ContentKind::GalleryItem.room(job.gallery_item_id),
                "gallery.processed",
                serde_json::json!({ "id": job.gallery_item_id, "status": "ready" }),
            ))
            .await;
    }

    Ok(())
}

/// Requeues the job until its retries run out, then marks the job and its
/// item failed.
async fn fail(state: &AppState, job: &ImageJob, error: &str) -> Result<(), sqlx::Error> {
    if job.attempts < MAX_ATTEMPTS {
        sqlx::query("UPDATE image_jobs SET status = 'pending', last_error = $1 WHERE id = $2")
            .bind(error)
            .bind(job.id)
            .execute(&state.pool)
            .await?;
        return Ok(());
    }

    sqlx::query(
        "UPDATE image_jobs SET status = 'failed', finished_at = NOW(), last_error = $1 WHERE id = $2",
    )
    .bind(error)
    .bind(job.id)
    .execute(&state.pool)
    .await?;

    sqlx::query(
        "UPDATE gallery_items SET processing_status = 'failed', updated_at = NOW() WHERE id = $1",
    )
    .bind(job.gallery_item_id)
    .execute(&state.pool)
    .await?;

    state
        .hub
        .publish(content_event(
            ContentKind::GalleryItem.room(job.gallery_item_id),
            "gallery.processed",
            serde_json::json!({ "id": job.gallery_item_id, "status": "failed" }),
        ))
        .await;

    Ok(())
}
