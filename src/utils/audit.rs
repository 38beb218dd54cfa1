// src/utils/audit.rs

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};

use crate::{state::AppState, utils::jwt::maybe_claims};

/// Axum Middleware: audit trail.
///
/// Records every mutating API request (method, path, status, actor) into the
/// audit_log table. The insert runs on a detached task so a slow or failing
/// write never delays the response.
pub async fn audit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if !is_audited(&method, &path) {
        return next.run(req).await;
    }

    let actor = maybe_claims(req.headers(), &state.config.jwt_secret)
        .and_then(|c| c.user_id().ok());

    let response = next.run(req).await;
    let status = response.status().as_u16() as i32;

    let pool = state.pool.clone();
    tokio::spawn(async move {
        let result = sqlx::query(
            "INSERT INTO audit_log (user_id, method, path, status) VALUES ($1, $2, $3, $4)",
        )
        .bind(actor)
        .bind(method.as_str())
        .bind(&path)
        .bind(status)
        .execute(&pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to record audit entry for {} {}: {}", method, path, e);
        }
    });

    response
}

fn is_audited(method: &Method, path: &str) -> bool {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return false;
    }
    // Login/register carry credentials; keep them out of the trail.
    path.starts_with("/api") && !path.starts_with("/api/auth")
}
