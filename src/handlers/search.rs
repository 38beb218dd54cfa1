// src/handlers/search.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::{error::AppError, models::content::ContentKind};

/// Query parameters for cross-type search.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Restrict to one content type (API name, e.g. "articles").
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

/// One search result row.
#[derive(Debug, Serialize, FromRow)]
pub struct SearchHit {
    pub kind: String,
    pub id: i64,
    pub title: String,
    pub snippet: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The per-kind arm of the search UNION. Drafts stay hidden for the kinds
/// that have them; gallery matches on the caption since it has no body.
fn kind_select(kind: ContentKind) -> String {
    let (snippet_source, visibility) = match kind {
        ContentKind::GalleryItem => ("caption", ""),
        ContentKind::WikiPage => ("body", ""),
        _ => ("body", "AND status = 'published'"),
    };

    format!(
        "SELECT '{kind}' AS kind, id, title, LEFT({snippet_source}, 160) AS snippet, created_at \
         FROM {table} \
         WHERE deleted_at IS NULL {visibility} \
           AND (title ILIKE $1 OR {snippet_source} ILIKE $1)",
        kind = kind.as_str(),
        table = kind.table(),
    )
}

/// Searches titles and bodies across all content types.
pub async fn search(
    State(pool): State<PgPool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Search query must not be empty".to_string()));
    }
    if query.len() > 100 {
        return Err(AppError::BadRequest("Search query too long".to_string()));
    }

    let kinds: Vec<ContentKind> = match &params.kind {
        Some(raw) => {
            let kind = ContentKind::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown content kind '{}'", raw)))?;
            vec![kind]
        }
        None => ContentKind::ALL.to_vec(),
    };

    let limit = params.limit.unwrap_or(20).min(100);
    let pattern = format!("%{}%", query);

    let arms: Vec<String> = kinds.into_iter().map(kind_select).collect();
    let sql = format!(
        "SELECT * FROM ({}) AS hits ORDER BY created_at DESC LIMIT $2",
        arms.join(" UNION ALL ")
    );

    let hits = sqlx::query_as::<_, SearchHit>(&sql)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Search failed: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(hits))
}
