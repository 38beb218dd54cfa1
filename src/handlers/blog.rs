// src/handlers/blog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::types::Json as SqlJson;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        blog_post::{BlogListParams, BlogPost, CreateBlogPostRequest, UpdateBlogPostRequest},
        content::ContentKind,
    },
    realtime::content_event,
    state::AppState,
    utils::{
        html::clean_html,
        jwt::{AuthUser, maybe_claims},
    },
};

use super::versions;

const COLUMNS: &str = "id, user_id, title, body, tags, status, published_at, \
                       created_at, updated_at, deleted_at, comments_count, rating_count, rating_sum";

/// List blog posts visible to the caller: published content, plus the
/// caller's own drafts (all drafts for admins). Optionally filtered by
/// keyword and tag.
pub async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BlogListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let pattern = params.q.map(|q| format!("%{}%", q));

    let claims = maybe_claims(&headers, &state.config.jwt_secret);
    let viewer_id = claims.as_ref().and_then(|c| c.user_id().ok());
    let is_admin = claims.as_ref().is_some_and(|c| c.is_admin());

    // `tags ? $3` is the JSONB array-membership operator.
    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM blog_posts
        WHERE deleted_at IS NULL
          AND (status = 'published'
               OR ($4::BIGINT IS NOT NULL AND user_id = $4)
               OR $5::BOOLEAN)
          AND ($1::TIMESTAMPTZ IS NULL OR created_at < $1)
          AND ($2::TEXT IS NULL OR title ILIKE $2)
          AND ($3::TEXT IS NULL OR tags ? $3)
        ORDER BY created_at DESC
        LIMIT $6
        "#
    );

    let posts = sqlx::query_as::<_, BlogPost>(&sql)
        .bind(params.cursor)
        .bind(pattern)
        .bind(params.tag)
        .bind(viewer_id)
        .bind(is_admin)
        .bind(limit)
        .fetch_all(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list blog posts: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(posts))
}

/// Get a single blog post. Drafts are author/admin only.
pub async fn get_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {COLUMNS} FROM blog_posts WHERE id = $1 AND deleted_at IS NULL");
    let post = sqlx::query_as::<_, BlogPost>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Blog post not found".to_string()))?;

    if post.status != "published" {
        let permitted = maybe_claims(&headers, &state.config.jwt_secret).is_some_and(|c| {
            c.is_admin() || c.user_id().map(|uid| uid == post.user_id).unwrap_or(false)
        });
        if !permitted {
            return Err(AppError::NotFound("Blog post not found".to_string()));
        }
    }

    Ok(Json(post))
}

/// Create a new blog post. Requires login.
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateBlogPostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = user.0.user_id()?;
    let published_at = (payload.status == "published").then(chrono::Utc::now);

    let sql = format!(
        r#"
        INSERT INTO blog_posts (user_id, title, body, tags, status, published_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS}
        "#
    );

    let post = sqlx::query_as::<_, BlogPost>(&sql)
        .bind(user_id)
        .bind(&payload.title)
        .bind(clean_html(&payload.body))
        .bind(SqlJson(&payload.tags))
        .bind(&payload.status)
        .bind(published_at)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create blog post: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Update a blog post. Requires: author or admin.
pub async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBlogPostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = user.0.user_id()?;

    let sql = format!("SELECT {COLUMNS} FROM blog_posts WHERE id = $1 AND deleted_at IS NULL");
    let existing = sqlx::query_as::<_, BlogPost>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Blog post not found".to_string()))?;

    if existing.user_id != user_id && !user.0.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to edit this post".to_string(),
        ));
    }

    let prev_title = existing.title.clone();
    let prev_body = existing.body.clone();

    let title = payload.title.unwrap_or(existing.title);
    let body = payload.body.map(|b| clean_html(&b)).unwrap_or(existing.body);
    let tags = payload.tags.unwrap_or(existing.tags.0);
    let status = payload.status.unwrap_or(existing.status);
    let published_at = existing
        .published_at
        .or_else(|| (status == "published").then(chrono::Utc::now));

    let mut tx = state.pool.begin().await?;

    versions::snapshot(&mut tx, ContentKind::BlogPost, id, &prev_title, &prev_body, user_id)
        .await?;

    let sql = format!(
        r#"
        UPDATE blog_posts
        SET title = $1, body = $2, tags = $3, status = $4, published_at = $5, updated_at = NOW()
        WHERE id = $6
        RETURNING {COLUMNS}
        "#
    );

    let updated = sqlx::query_as::<_, BlogPost>(&sql)
        .bind(&title)
        .bind(&body)
        .bind(SqlJson(&tags))
        .bind(&status)
        .bind(published_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    state
        .hub
        .publish(content_event(
            ContentKind::BlogPost.room(id),
            "content.updated",
            serde_json::json!({ "id": id }),
        ))
        .await;

    Ok(Json(updated))
}

/// Delete a blog post (Soft Delete). Requires: author or admin.
pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.0.user_id()?;

    let owner: Option<(i64,)> =
        sqlx::query_as("SELECT user_id FROM blog_posts WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;

    let (owner_id,) = owner.ok_or(AppError::NotFound("Blog post not found".to_string()))?;

    if owner_id != user_id && !user.0.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this post".to_string(),
        ));
    }

    sqlx::query("UPDATE blog_posts SET deleted_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
