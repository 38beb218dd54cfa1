// src/handlers/gallery.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    jobs,
    models::gallery_item::{CreateGalleryItemRequest, GalleryItem, UpdateGalleryItemRequest},
    state::AppState,
    utils::{html::clean_html, jwt::AuthUser},
};

const COLUMNS: &str = "id, user_id, title, caption, image_url, thumbnail_url, web_url, \
                       processing_status, created_at, updated_at, deleted_at, \
                       comments_count, rating_count, rating_sum";

/// Query parameters for listing gallery items.
#[derive(Debug, Deserialize)]
pub struct GalleryListParams {
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<i64>,
    pub q: Option<String>,
}

/// List gallery items (newest first). Items still being processed are
/// included; clients key off processing_status.
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<GalleryListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let pattern = params.q.map(|q| format!("%{}%", q));

    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM gallery_items
        WHERE deleted_at IS NULL
          AND ($1::TIMESTAMPTZ IS NULL OR created_at < $1)
          AND ($2::TEXT IS NULL OR title ILIKE $2 OR caption ILIKE $2)
        ORDER BY created_at DESC
        LIMIT $3
        "#
    );

    let items = sqlx::query_as::<_, GalleryItem>(&sql)
        .bind(params.cursor)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(items))
}

/// Get a single gallery item by ID.
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {COLUMNS} FROM gallery_items WHERE id = $1 AND deleted_at IS NULL");
    let item = sqlx::query_as::<_, GalleryItem>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Gallery item not found".to_string()))?;

    Ok(Json(item))
}

/// Create a gallery item and queue its variant jobs.
///
/// The item and its jobs are written in one transaction, so the dispatcher
/// can never observe an item without jobs (or the reverse).
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateGalleryItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = user.0.user_id()?;

    let mut tx = state.pool.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO gallery_items (user_id, title, caption, image_url)
        VALUES ($1, $2, $3, $4)
        RETURNING {COLUMNS}
        "#
    );

    let item = sqlx::query_as::<_, GalleryItem>(&sql)
        .bind(user_id)
        .bind(&payload.title)
        .bind(clean_html(&payload.caption))
        .bind(&payload.image_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create gallery item: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    jobs::enqueue_variants(&mut tx, item.id).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Update a gallery item's descriptive fields. Requires: author or admin.
/// The image URL is immutable; re-uploading means creating a new item.
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateGalleryItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = user.0.user_id()?;

    let sql = format!("SELECT {COLUMNS} FROM gallery_items WHERE id = $1 AND deleted_at IS NULL");
    let existing = sqlx::query_as::<_, GalleryItem>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Gallery item not found".to_string()))?;

    if existing.user_id != user_id && !user.0.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to edit this item".to_string(),
        ));
    }

    let title = payload.title.unwrap_or(existing.title);
    let caption = payload.caption.map(|c| clean_html(&c)).unwrap_or(existing.caption);

    let sql = format!(
        r#"
        UPDATE gallery_items
        SET title = $1, caption = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING {COLUMNS}
        "#
    );

    let updated = sqlx::query_as::<_, GalleryItem>(&sql)
        .bind(&title)
        .bind(&caption)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(updated))
}

/// Delete a gallery item (Soft Delete). Requires: author or admin.
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.0.user_id()?;

    let owner: Option<(i64,)> =
        sqlx::query_as("SELECT user_id FROM gallery_items WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;

    let (owner_id,) = owner.ok_or(AppError::NotFound("Gallery item not found".to_string()))?;

    if owner_id != user_id && !user.0.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this item".to_string(),
        ));
    }

    sqlx::query("UPDATE gallery_items SET deleted_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
