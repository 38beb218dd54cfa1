// src/handlers/versions.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::AppError,
    models::{content::ContentKind, version::ContentVersion},
};

use super::interaction::resolve_target;

/// Snapshots the current state of a piece of content into content_versions.
///
/// Called inside the edit transaction, *before* the edit is applied, so the
/// stored row is always the state a restore would bring back. Returns the
/// assigned version number.
pub async fn snapshot(
    conn: &mut PgConnection,
    kind: ContentKind,
    content_id: i64,
    title: &str,
    body: &str,
    edited_by: i64,
) -> Result<i32, sqlx::Error> {
    let (next,): (i32,) = sqlx::query_as(
        r#"
        SELECT COALESCE(MAX(version_no), 0) + 1
        FROM content_versions
        WHERE content_kind = $1 AND content_id = $2
        "#,
    )
    .bind(kind.as_str())
    .bind(content_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO content_versions (content_kind, content_id, version_no, title, body, edited_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(kind.as_str())
    .bind(content_id)
    .bind(next)
    .bind(title)
    .bind(body)
    .bind(edited_by)
    .execute(&mut *conn)
    .await?;

    Ok(next)
}

pub async fn list_for(
    pool: &PgPool,
    kind: ContentKind,
    content_id: i64,
) -> Result<Vec<ContentVersion>, AppError> {
    let versions = sqlx::query_as::<_, ContentVersion>(
        r#"
        SELECT id, content_kind, content_id, version_no, title, body, edited_by, created_at
        FROM content_versions
        WHERE content_kind = $1 AND content_id = $2
        ORDER BY version_no DESC
        "#,
    )
    .bind(kind.as_str())
    .bind(content_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

/// Fetches one specific snapshot.
pub async fn fetch(
    conn: &mut PgConnection,
    kind: ContentKind,
    content_id: i64,
    version_no: i32,
) -> Result<ContentVersion, AppError> {
    sqlx::query_as::<_, ContentVersion>(
        r#"
        SELECT id, content_kind, content_id, version_no, title, body, edited_by, created_at
        FROM content_versions
        WHERE content_kind = $1 AND content_id = $2 AND version_no = $3
        "#,
    )
    .bind(kind.as_str())
    .bind(content_id)
    .bind(version_no)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Version not found".to_string()))
}

/// Lists the edit history of a piece of content, newest first.
/// Mounted under every versioned content router.
pub async fn list_versions(
    State(pool): State<PgPool>,
    Extension(kind): Extension<ContentKind>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let content_id = resolve_target(&pool, kind, &key).await?;
    let versions = list_for(&pool, kind, content_id).await?;
    Ok(Json(versions))
}
