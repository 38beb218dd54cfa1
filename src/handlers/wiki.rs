// src/handlers/wiki.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        content::ContentKind,
        wiki_page::{CreateWikiPageRequest, UpdateWikiPageRequest, WikiPage},
    },
    realtime::content_event,
    state::AppState,
    utils::{html::clean_html, jwt::AuthUser},
};

use super::versions;

const COLUMNS: &str = "id, slug, title, body, last_editor, created_at, updated_at, deleted_at, \
                       comments_count, rating_count, rating_sum";

/// Query parameters for listing wiki pages.
#[derive(Debug, Deserialize)]
pub struct WikiListParams {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Lists wiki pages alphabetically, optionally filtered by keyword.
pub async fn list_pages(
    State(state): State<AppState>,
    Query(params): Query<WikiListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(100).min(500);
    let pattern = params.q.map(|q| format!("%{}%", q));

    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM wiki_pages
        WHERE deleted_at IS NULL
          AND ($1::TEXT IS NULL OR title ILIKE $1 OR slug ILIKE $1)
        ORDER BY title ASC
        LIMIT $2
        "#
    );

    let pages = sqlx::query_as::<_, WikiPage>(&sql)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(pages))
}

/// Retrieves a single wiki page by slug.
pub async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {COLUMNS} FROM wiki_pages WHERE slug = $1 AND deleted_at IS NULL");
    let page = sqlx::query_as::<_, WikiPage>(&sql)
        .bind(&slug)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Wiki page not found".to_string()))?;

    Ok(Json(page))
}

/// Creates a wiki page. Any logged-in user may create one; the slug is
/// permanent once taken.
pub async fn create_page(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateWikiPageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = user.0.user_id()?;

    let sql = format!(
        r#"
        INSERT INTO wiki_pages (slug, title, body, last_editor)
        VALUES ($1, $2, $3, $4)
        RETURNING {COLUMNS}
        "#
    );

    let page = sqlx::query_as::<_, WikiPage>(&sql)
        .bind(&payload.slug)
        .bind(&payload.title)
        .bind(clean_html(&payload.body))
        .bind(user_id)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Slug '{}' already exists", payload.slug))
            } else {
                tracing::error!("Failed to create wiki page: {:?}", e);
                AppError::from(e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(page)))
}

/// Edits a wiki page. Wiki-style: any logged-in user may edit; every edit
/// snapshots the previous state so it can be restored.
pub async fn update_page(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateWikiPageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = user.0.user_id()?;

    let sql = format!("SELECT {COLUMNS} FROM wiki_pages WHERE slug = $1 AND deleted_at IS NULL");
    let existing = sqlx::query_as::<_, WikiPage>(&sql)
        .bind(&slug)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Wiki page not found".to_string()))?;

    let page_id = existing.id;
    let prev_title = existing.title.clone();
    let prev_body = existing.body.clone();

    let title = payload.title.unwrap_or(existing.title);
    let body = payload.body.map(|b| clean_html(&b)).unwrap_or(existing.body);

    let mut tx = state.pool.begin().await?;

    versions::snapshot(&mut tx, ContentKind::WikiPage, page_id, &prev_title, &prev_body, user_id)
        .await?;

    let sql = format!(
        r#"
        UPDATE wiki_pages
        SET title = $1, body = $2, last_editor = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING {COLUMNS}
        "#
    );

    let updated = sqlx::query_as::<_, WikiPage>(&sql)
        .bind(&title)
        .bind(&body)
        .bind(user_id)
        .bind(page_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    state
        .hub
        .publish(content_event(
            ContentKind::WikiPage.room(page_id),
            "content.updated",
            serde_json::json!({ "id": page_id, "slug": slug }),
        ))
        .await;

    Ok(Json(updated))
}

/// Restores a page to an earlier version.
///
/// The current state is snapshotted before the rollback, so a restore is
/// itself undoable.
pub async fn restore_version(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, version_no)): Path<(String, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.0.user_id()?;

    let sql = format!("SELECT {COLUMNS} FROM wiki_pages WHERE slug = $1 AND deleted_at IS NULL");
    let page = sqlx::query_as::<_, WikiPage>(&sql)
        .bind(&slug)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Wiki page not found".to_string()))?;

    let mut tx = state.pool.begin().await?;

    let target = versions::fetch(&mut tx, ContentKind::WikiPage, page.id, version_no).await?;

    versions::snapshot(&mut tx, ContentKind::WikiPage, page.id, &page.title, &page.body, user_id)
        .await?;

    let sql = format!(
        r#"
        UPDATE wiki_pages
        SET title = $1, body = $2, last_editor = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING {COLUMNS}
        "#
    );

    let restored = sqlx::query_as::<_, WikiPage>(&sql)
        .bind(&target.title)
        .bind(&target.body)
        .bind(user_id)
        .bind(page.id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    state
        .hub
        .publish(content_event(
            ContentKind::WikiPage.room(page.id),
            "content.updated",
            serde_json::json!({ "id": page.id, "slug": slug, "restored_from": version_no }),
        ))
        .await;

    Ok(Json(restored))
}

/// Deletes a wiki page (Soft Delete). Admin only: pages are communal, so
/// removal is a moderation action rather than an author right.
pub async fn delete_page(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !user.0.is_admin() {
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }

    let result = sqlx::query(
        "UPDATE wiki_pages SET deleted_at = NOW() WHERE slug = $1 AND deleted_at IS NULL",
    )
    .bind(&slug)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Wiki page not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
