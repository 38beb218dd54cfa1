// src/handlers/articles.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    cache,
    error::AppError,
    models::{
        article::{Article, ArticleListParams, CreateArticleRequest, UpdateArticleRequest},
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

const COLUMNS: &str = "id, user_id, title, summary, body, cover_img, status, published_at, \
                       created_at, updated_at, deleted_at, comments_count, rating_count, rating_sum";

/// List articles visible to the caller (newest first): published content,
/// plus the caller's own drafts (all drafts for admins).
/// Supports cursor-based pagination and a title keyword filter.
pub async fn list_articles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ArticleListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let pattern = params.q.map(|q| format!("%{}%", q));

    let claims = maybe_claims(&headers, &state.config.jwt_secret);
    let viewer_id = claims.as_ref().and_then(|c| c.user_id().ok());
    let is_admin = claims.as_ref().is_some_and(|c| c.is_admin());

    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM articles
        WHERE deleted_at IS NULL
          AND (status = 'published'
               OR ($3::BIGINT IS NOT NULL AND user_id = $3)
               OR $4::BOOLEAN)
          AND ($1::TIMESTAMPTZ IS NULL OR created_at < $1)
          AND ($2::TEXT IS NULL OR title ILIKE $2)
        ORDER BY created_at DESC
        LIMIT $5
        "#
    );

    let articles = sqlx::query_as::<_, Article>(&sql)
        .bind(params.cursor)
        .bind(pattern)
        .bind(viewer_id)
        .bind(is_admin)
        .bind(limit)
        .fetch_all(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list articles: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(articles))
}

/// Get a single article by ID.
///
/// Published articles come from the cache when one is configured. Drafts
/// are visible only to their author or an admin; everyone else gets 404.
pub async fn get_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let key = cache::detail_key(ContentKind::Article.as_str(), id);
    if let Some(article) = cache::get_json::<Article>(&state.cache, &key).await {
        return Ok(Json(article));
    }

    let sql = format!("SELECT {COLUMNS} FROM articles WHERE id = $1 AND deleted_at IS NULL");
    let article = sqlx::query_as::<_, Article>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Article not found".to_string()))?;

    if article.status != "published" {
        let permitted = maybe_claims(&headers, &state.config.jwt_secret).is_some_and(|c| {
            c.is_admin() || c.user_id().map(|uid| uid == article.user_id).unwrap_or(false)
        });
        if !permitted {
            // Hide the existence of drafts.
            return Err(AppError::NotFound("Article not found".to_string()));
        }
    } else {
        cache::put_json(&state.cache, &key, &article).await;
    }

    Ok(Json(article))
}

/// Create a new article. Requires login; the body is sanitized server-side.
pub async fn create_article(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = user.0.user_id()?;
    let published_at = (payload.status == "published").then(chrono::Utc::now);

    let sql = format!(
        r#"
        INSERT INTO articles (user_id, title, summary, body, cover_img, status, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    );

    let article = sqlx::query_as::<_, Article>(&sql)
        .bind(user_id)
        .bind(&payload.title)
        .bind(clean_html(&payload.summary))
        .bind(clean_html(&payload.body))
        .bind(&payload.cover_img)
        .bind(&payload.status)
        .bind(published_at)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create article: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok((StatusCode::CREATED, Json(article)))
}

/// Update an article. Requires: author or admin.
/// The pre-edit state is snapshotted into the version history first.
pub async fn update_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = user.0.user_id()?;

    let sql = format!("SELECT {COLUMNS} FROM articles WHERE id = $1 AND deleted_at IS NULL");
    let existing = sqlx::query_as::<_, Article>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("Article not found".to_string()))?;

    if existing.user_id != user_id && !user.0.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to edit this article".to_string(),
        ));
    }

    let prev_title = existing.title.clone();
    let prev_body = existing.body.clone();

    let title = payload.title.unwrap_or(existing.title);
    let summary = payload.summary.map(|s| clean_html(&s)).unwrap_or(existing.summary);
    let body = payload.body.map(|b| clean_html(&b)).unwrap_or(existing.body);
    let cover_img = payload.cover_img.or(existing.cover_img);
    let status = payload.status.unwrap_or(existing.status);
    let published_at = existing
        .published_at
        .or_else(|| (status == "published").then(chrono::Utc::now));

    let mut tx = state.pool.begin().await?;

    versions::snapshot(&mut tx, ContentKind::Article, id, &prev_title, &prev_body, user_id).await?;

    let sql = format!(
        r#"
        UPDATE articles
        SET title = $1, summary = $2, body = $3, cover_img = $4,
            status = $5, published_at = $6, updated_at = NOW()
        WHERE id = $7
        RETURNING {COLUMNS}
        "#
    );

    let updated = sqlx::query_as::<_, Article>(&sql)
        .bind(&title)
        .bind(&summary)
        .bind(&body)
        .bind(&cover_img)
        .bind(&status)
        .bind(published_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    cache::invalidate(&state.cache, &cache::detail_key(ContentKind::Article.as_str(), id)).await;

    state
        .hub
        .publish(content_event(
            ContentKind::Article.room(id),
            "content.updated",
            serde_json::json!({ "id": id }),
        ))
        .await;

    Ok(Json(updated))
}

/// Delete an article (Soft Delete). Requires: author or admin.
pub async fn delete_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.0.user_id()?;

    let owner: Option<(i64,)> =
        sqlx::query_as("SELECT user_id FROM articles WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;

    let (owner_id,) = owner.ok_or(AppError::NotFound("Article not found".to_string()))?;

    if owner_id != user_id && !user.0.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this article".to_string(),
        ));
    }

    sqlx::query("UPDATE articles SET deleted_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete article: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    cache::invalidate(&state.cache, &cache::detail_key(ContentKind::Article.as_str(), id)).await;

    Ok(StatusCode::NO_CONTENT)
}
