// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::{
    cache,
    error::{AppError, is_unique_violation},
    models::{
        content::ContentKind,
        job::{ImageJob, JobListParams},
        user::User,
    },
    state::AppState,
    utils::{hash::hash_password, jwt::Claims},
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// DTO for Admin creating a user (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(custom(function = validate_role))]
    pub role: String,
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    if role != "user" && role != "admin" {
        return Err(validator::ValidationError::new("invalid_role"));
    }
    Ok(())
}

/// Creates a new user with a specific role.
/// Admin only.
pub async fn create_user(
    State(pool): State<PgPool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(&payload.role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub username: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

/// Updates user information.
/// Admin only.
pub async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    exists.ok_or(AppError::NotFound("User not found".to_string()))?;

    if let Some(new_username) = payload.username {
        sqlx::query("UPDATE users SET username = $1 WHERE id = $2")
            .bind(&new_username)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Username '{}' already exists", new_username))
                } else {
                    AppError::from(e)
                }
            })?;
    }

    if let Some(new_role) = payload.role {
        validate_role(&new_role).map_err(|_| AppError::BadRequest("Invalid role".to_string()))?;
        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(&new_role)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(new_password) = payload.password {
        let hashed = hash_password(&new_password)?;
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(&hashed)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Moderation takedown of any content item (Soft Delete).
/// Admin only.
pub async fn takedown_content(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = ContentKind::parse(&kind)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown content kind '{}'", kind)))?;

    let sql = format!(
        "UPDATE {} SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        kind.table()
    );
    let result = sqlx::query(&sql).bind(id).execute(&state.pool).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Content not found".to_string()));
    }

    if kind == ContentKind::Article {
        cache::invalidate(&state.cache, &cache::detail_key(kind.as_str(), id)).await;
    }

    tracing::info!("Admin takedown: {} {}", kind.as_str(), id);

    Ok(StatusCode::NO_CONTENT)
}

/// Lists image jobs, optionally filtered by status.
/// Admin only.
pub async fn list_jobs(
    State(pool): State<PgPool>,
    Query(params): Query<JobListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).min(200);

    let jobs = sqlx::query_as::<_, ImageJob>(
        r#"
        SELECT id, gallery_item_id, kind, status, attempts, last_error,
               created_at, started_at, finished_at
        FROM image_jobs
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY id DESC
        LIMIT $2
        "#,
    )
    .bind(params.status)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(jobs))
}

/// Requeues a failed image job and flips its item back to pending.
/// Admin only.
pub async fn retry_job(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let job: Option<(i64, String)> =
        sqlx::query_as("SELECT gallery_item_id, status FROM image_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

    let (gallery_item_id, status) = job.ok_or(AppError::NotFound("Job not found".to_string()))?;

    if status != "failed" {
        return Err(AppError::Conflict(format!(
            "Only failed jobs can be retried (job is '{}')",
            status
        )));
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE image_jobs
        SET status = 'pending', attempts = 0, last_error = NULL,
            started_at = NULL, finished_at = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE gallery_items SET processing_status = 'pending', updated_at = NOW() WHERE id = $1",
    )
    .bind(gallery_item_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "id": id, "status": "pending" })))
}

#[derive(Debug, Deserialize)]
pub struct AuditListParams {
    pub limit: Option<i64>,
}

#[derive(Debug, serde::Serialize, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Lists the most recent audit trail entries.
/// Admin only.
pub async fn list_audit(
    State(pool): State<PgPool>,
    Query(params): Query<AuditListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(100).min(500);

    let entries = sqlx::query_as::<_, AuditEntry>(
        r#"
        SELECT id, user_id, method, path, status, created_at
        FROM audit_log
        ORDER BY id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}
