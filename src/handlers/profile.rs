use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::{FromRow, PgPool};

use crate::{error::AppError, models::user::MeResponse, utils::jwt::Claims};

#[derive(FromRow)]
struct ProfileRow {
    id: i64,
    username: String,
    role: String,
    created_at: chrono::DateTime<chrono::Utc>,
    articles_count: i64,
    blog_posts_count: i64,
    stories_count: i64,
    gallery_count: i64,
    comments_count: i64,
    rating_count: i64,
    rating_sum: i64,
}

/// Get the current user's profile and content statistics.
/// Backs the frontend dashboard's "my activity" panel.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    // Scalar subqueries per owned table; the author indexes keep these cheap.
    let row = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT
            u.id, u.username, u.role, u.created_at,
            (SELECT COUNT(*) FROM articles WHERE user_id = u.id AND deleted_at IS NULL) AS articles_count,
            (SELECT COUNT(*) FROM blog_posts WHERE user_id = u.id AND deleted_at IS NULL) AS blog_posts_count,
            (SELECT COUNT(*) FROM stories WHERE user_id = u.id AND deleted_at IS NULL) AS stories_count,
            (SELECT COUNT(*) FROM gallery_items WHERE user_id = u.id AND deleted_at IS NULL) AS gallery_count,
            (SELECT COUNT(*) FROM comments WHERE user_id = u.id AND deleted_at IS NULL) AS comments_count,
            ((SELECT COALESCE(SUM(rating_count), 0) FROM articles WHERE user_id = u.id AND deleted_at IS NULL)
              + (SELECT COALESCE(SUM(rating_count), 0) FROM blog_posts WHERE user_id = u.id AND deleted_at IS NULL)
              + (SELECT COALESCE(SUM(rating_count), 0) FROM stories WHERE user_id = u.id AND deleted_at IS NULL)
              + (SELECT COALESCE(SUM(rating_count), 0) FROM gallery_items WHERE user_id = u.id AND deleted_at IS NULL)
            )::BIGINT AS rating_count,
            ((SELECT COALESCE(SUM(rating_sum), 0) FROM articles WHERE user_id = u.id AND deleted_at IS NULL)
              + (SELECT COALESCE(SUM(rating_sum), 0) FROM blog_posts WHERE user_id = u.id AND deleted_at IS NULL)
              + (SELECT COALESCE(SUM(rating_sum), 0) FROM stories WHERE user_id = u.id AND deleted_at IS NULL)
              + (SELECT COALESCE(SUM(rating_sum), 0) FROM gallery_items WHERE user_id = u.id AND deleted_at IS NULL)
            )::BIGINT AS rating_sum
        FROM users u
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let average_rating_received = if row.rating_count > 0 {
        row.rating_sum as f64 / row.rating_count as f64
    } else {
        0.0
    };

    Ok(Json(MeResponse {
        id: row.id,
        username: row.username,
        role: row.role,
        created_at: row.created_at,
        articles_count: row.articles_count,
        blog_posts_count: row.blog_posts_count,
        stories_count: row.stories_count,
        gallery_count: row.gallery_count,
        comments_count: row.comments_count,
        average_rating_received,
    }))
}

#[derive(FromRow)]
struct DashboardRow {
    articles: i64,
    blog_posts: i64,
    wiki_pages: i64,
    gallery_items: i64,
    stories: i64,
    users: i64,
    comments: i64,
    latest_published: Option<chrono::DateTime<chrono::Utc>>,
}

/// Portal-wide counts for the public dashboard.
pub async fn dashboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query_as::<_, DashboardRow>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM articles WHERE deleted_at IS NULL AND status = 'published') AS articles,
            (SELECT COUNT(*) FROM blog_posts WHERE deleted_at IS NULL AND status = 'published') AS blog_posts,
            (SELECT COUNT(*) FROM wiki_pages WHERE deleted_at IS NULL) AS wiki_pages,
            (SELECT COUNT(*) FROM gallery_items WHERE deleted_at IS NULL) AS gallery_items,
            (SELECT COUNT(*) FROM stories WHERE deleted_at IS NULL AND status = 'published') AS stories,
            (SELECT COUNT(*) FROM users) AS users,
            (SELECT COUNT(*) FROM comments WHERE deleted_at IS NULL) AS comments,
            GREATEST(
                (SELECT MAX(published_at) FROM articles WHERE deleted_at IS NULL AND status = 'published'),
                (SELECT MAX(published_at) FROM blog_posts WHERE deleted_at IS NULL AND status = 'published'),
                (SELECT MAX(published_at) FROM stories WHERE deleted_at IS NULL AND status = 'published')
            ) AS latest_published
        "#,
    )
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({
        "content": {
            "articles": row.articles,
            "blog": row.blog_posts,
            "wiki": row.wiki_pages,
            "gallery": row.gallery_items,
            "stories": row.stories,
        },
        "users": row.users,
        "comments": row.comments,
        "latest_published": row.latest_published,
    })))
}
