// src/handlers/interaction.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    cache,
    error::AppError,
    models::{
        comment::{CommentResponse, CreateCommentRequest},
        content::ContentKind,
        rating::{RateRequest, RatingSummary},
    },
    realtime::content_event,
    state::AppState,
    utils::{
        html::clean_html,
        jwt::{AuthUser, maybe_claims},
    },
};

/// Resolves the path key of a content router to a numeric content id,
/// checking the target is alive. Wiki routes address content by slug;
/// everything else uses numeric ids.
pub async fn resolve_target(
    pool: &PgPool,
    kind: ContentKind,
    key: &str,
) -> Result<i64, AppError> {
    let id: Option<(i64,)> = match kind {
        ContentKind::WikiPage => {
            sqlx::query_as("SELECT id FROM wiki_pages WHERE slug = $1 AND deleted_at IS NULL")
                .bind(key)
                .fetch_optional(pool)
                .await?
        }
        _ => {
            let id: i64 = key
                .parse()
                .map_err(|_| AppError::BadRequest("Invalid content id".to_string()))?;
            let sql = format!(
                "SELECT id FROM {} WHERE id = $1 AND deleted_at IS NULL",
                kind.table()
            );
            sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?
        }
    };

    id.map(|(id,)| id)
        .ok_or(AppError::NotFound("Content not found".to_string()))
}

/// Drops the cached detail entry for content whose denormalized counts
/// just moved.
async fn invalidate_detail(state: &AppState, kind: ContentKind, id: i64) {
    if kind == ContentKind::Article {
        cache::invalidate(&state.cache, &cache::detail_key(kind.as_str(), id)).await;
    }
}

/// Create a new comment on a piece of content.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    user: AuthUser,
    Path(key): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user_id = user.0.user_id()?;
    let content_id = resolve_target(&state.pool, kind, &key).await?;

    let mut tx = state.pool.begin().await?;

    // Resolve root_id: a reply inherits its parent's root; a reply to a
    // root comment uses the parent itself.
    let mut root_id: Option<i64> = None;
    if let Some(pid) = payload.parent_id {
        let parent: Option<(i64, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT id, root_id FROM comments
            WHERE id = $1 AND content_kind = $2 AND content_id = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(pid)
        .bind(kind.as_str())
        .bind(content_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (parent_id, parent_root) =
            parent.ok_or(AppError::NotFound("Parent comment not found".to_string()))?;
        root_id = Some(parent_root.unwrap_or(parent_id));
    }

    let (new_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO comments (content_kind, content_id, user_id, body, root_id, parent_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(kind.as_str())
    .bind(content_id)
    .bind(user_id)
    .bind(clean_html(&payload.body))
    .bind(root_id)
    .bind(payload.parent_id)
    .fetch_one(&mut *tx)
    .await?;

    let sql = format!(
        "UPDATE {} SET comments_count = comments_count + 1 WHERE id = $1",
        kind.table()
    );
    sqlx::query(&sql).bind(content_id).execute(&mut *tx).await?;

    tx.commit().await?;

    invalidate_detail(&state, kind, content_id).await;

    state
        .hub
        .publish(content_event(
            kind.room(content_id),
            "comment.created",
            serde_json::json!({
                "comment_id": new_id,
                "content_id": content_id,
                "user_id": user_id,
                "username": user.0.username,
            }),
        ))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": new_id })),
    ))
}

/// List all comments on a piece of content, threads grouped together.
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let content_id = resolve_target(&state.pool, kind, &key).await?;

    let comments = sqlx::query_as::<_, CommentResponse>(
        r#"
        SELECT
            c.id, c.content_kind, c.content_id, c.user_id, u.username, c.body,
            c.root_id, c.parent_id, c.created_at, c.deleted_at
        FROM comments c
        JOIN users u ON c.user_id = u.id
        WHERE c.content_kind = $1 AND c.content_id = $2 AND c.deleted_at IS NULL
        ORDER BY COALESCE(c.root_id, c.id), c.created_at ASC
        "#,
    )
    .bind(kind.as_str())
    .bind(content_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(comments))
}

/// Delete a comment (Soft Delete). Requires: author or admin.
pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.0.user_id()?;

    let comment: Option<(i64, String, i64)> = sqlx::query_as(
        "SELECT user_id, content_kind, content_id FROM comments WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;

    let (author_id, kind_raw, content_id) =
        comment.ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if author_id != user_id && !user.0.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this comment".to_string(),
        ));
    }

    let kind = ContentKind::parse(&kind_raw)
        .ok_or_else(|| AppError::InternalServerError(format!("Unknown kind '{}'", kind_raw)))?;

    let mut tx = state.pool.begin().await?;

    sqlx::query("UPDATE comments SET deleted_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let sql = format!(
        "UPDATE {} SET comments_count = GREATEST(0, comments_count - 1) WHERE id = $1",
        kind.table()
    );
    sqlx::query(&sql).bind(content_id).execute(&mut *tx).await?;

    tx.commit().await?;

    invalidate_detail(&state, kind, content_id).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Submit or change the caller's rating for a piece of content.
/// The denormalized aggregates on the content row move in the same
/// transaction, so a re-rate adjusts rather than double-counts.
pub async fn rate_content(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    user: AuthUser,
    Path(key): Path<String>,
    Json(payload): Json<RateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user_id = user.0.user_id()?;
    let content_id = resolve_target(&state.pool, kind, &key).await?;

    let mut tx = state.pool.begin().await?;

    let existing: Option<(i32,)> = sqlx::query_as(
        "SELECT score FROM ratings WHERE user_id = $1 AND content_kind = $2 AND content_id = $3",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(content_id)
    .fetch_optional(&mut *tx)
    .await?;

    match existing {
        None => {
            sqlx::query(
                r#"
                INSERT INTO ratings (user_id, content_kind, content_id, score)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(user_id)
            .bind(kind.as_str())
            .bind(content_id)
            .bind(payload.score)
            .execute(&mut *tx)
            .await?;

            let sql = format!(
                "UPDATE {} SET rating_count = rating_count + 1, rating_sum = rating_sum + $1 WHERE id = $2",
                kind.table()
            );
            sqlx::query(&sql)
                .bind(payload.score as i64)
                .bind(content_id)
                .execute(&mut *tx)
                .await?;
        }
        Some((old_score,)) => {
            sqlx::query(
                r#"
                UPDATE ratings SET score = $1, updated_at = NOW()
                WHERE user_id = $2 AND content_kind = $3 AND content_id = $4
                "#,
            )
            .bind(payload.score)
            .bind(user_id)
            .bind(kind.as_str())
            .bind(content_id)
            .execute(&mut *tx)
            .await?;

            let sql = format!(
                "UPDATE {} SET rating_sum = rating_sum + $1 WHERE id = $2",
                kind.table()
            );
            sqlx::query(&sql)
                .bind((payload.score - old_score) as i64)
                .bind(content_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    let sql = format!(
        "SELECT rating_count, rating_sum FROM {} WHERE id = $1",
        kind.table()
    );
    let (count, sum): (i32, i64) = sqlx::query_as(&sql)
        .bind(content_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    invalidate_detail(&state, kind, content_id).await;

    let summary = RatingSummary::from_aggregates(count, sum, Some(payload.score));

    state
        .hub
        .publish(content_event(
            kind.room(content_id),
            "rating.updated",
            serde_json::json!({
                "content_id": content_id,
                "count": summary.count,
                "average": summary.average,
            }),
        ))
        .await;

    Ok(Json(summary))
}

/// Remove the caller's rating.
pub async fn delete_rating(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    user: AuthUser,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.0.user_id()?;
    let content_id = resolve_target(&state.pool, kind, &key).await?;

    let mut tx = state.pool.begin().await?;

    let existing: Option<(i32,)> = sqlx::query_as(
        "SELECT score FROM ratings WHERE user_id = $1 AND content_kind = $2 AND content_id = $3",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(content_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (old_score,) = existing.ok_or(AppError::NotFound("Rating not found".to_string()))?;

    sqlx::query("DELETE FROM ratings WHERE user_id = $1 AND content_kind = $2 AND content_id = $3")
        .bind(user_id)
        .bind(kind.as_str())
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

    let sql = format!(
        r#"
        UPDATE {} SET rating_count = GREATEST(0, rating_count - 1),
                      rating_sum = GREATEST(0, rating_sum - $1)
        WHERE id = $2
        "#,
        kind.table()
    );
    sqlx::query(&sql)
        .bind(old_score as i64)
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    invalidate_detail(&state, kind, content_id).await;

    Ok(StatusCode::NO_CONTENT)
}

/// The rating aggregate for a piece of content. `mine` is filled in when
/// the request carries a valid token.
pub async fn get_rating(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let content_id = resolve_target(&state.pool, kind, &key).await?;

    let sql = format!(
        "SELECT rating_count, rating_sum FROM {} WHERE id = $1",
        kind.table()
    );
    let (count, sum): (i32, i64) = sqlx::query_as(&sql)
        .bind(content_id)
        .fetch_one(&state.pool)
        .await?;

    let mine = match maybe_claims(&headers, &state.config.jwt_secret) {
        Some(claims) => {
            let user_id = claims.user_id()?;
            let row: Option<(i32,)> = sqlx::query_as(
                "SELECT score FROM ratings WHERE user_id = $1 AND content_kind = $2 AND content_id = $3",
            )
            .bind(user_id)
            .bind(kind.as_str())
            .bind(content_id)
            .fetch_optional(&state.pool)
            .await?;
            row.map(|(s,)| s)
        }
        None => None,
    };

    Ok(Json(RatingSummary::from_aggregates(count, sum, mine)))
}
