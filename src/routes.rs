// src/routes.rs

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderName, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        admin, articles, auth, blog, gallery, health, interaction, notifications, profile, search,
        stories, versions, wiki,
    },
    models::content::ContentKind,
    state::AppState,
    utils::{
        audit::audit_middleware,
        csrf::{CSRF_HEADER, csrf_middleware},
        jwt::{admin_middleware, auth_middleware},
    },
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, content types, interactions, admin).
/// * Applies global middleware (Trace, CORS, CSRF guard, audit trail).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let frontend_origin: axum::http::HeaderValue = state.config.frontend_origin.parse().unwrap();
    let cors = CorsLayer::new()
        .allow_origin([frontend_origin])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
        ]);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(20)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/csrf", get(auth::issue_csrf))
        // Credential endpoints are the brute-force target; rate limit them.
        .layer(GovernorLayer::new(governor_conf));

    let article_routes = Router::new()
        .route("/", get(articles::list_articles).post(articles::create_article))
        .route(
            "/{id}",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route("/{id}/versions", get(versions::list_versions))
        .route(
            "/{id}/comments",
            get(interaction::list_comments).post(interaction::create_comment),
        )
        .route(
            "/{id}/rating",
            get(interaction::get_rating)
                .put(interaction::rate_content)
                .delete(interaction::delete_rating),
        )
        .layer(Extension(ContentKind::Article));

    let blog_routes = Router::new()
        .route("/", get(blog::list_posts).post(blog::create_post))
        .route(
            "/{id}",
            get(blog::get_post).put(blog::update_post).delete(blog::delete_post),
        )
        .route("/{id}/versions", get(versions::list_versions))
        .route(
            "/{id}/comments",
            get(interaction::list_comments).post(interaction::create_comment),
        )
        .route(
            "/{id}/rating",
            get(interaction::get_rating)
                .put(interaction::rate_content)
                .delete(interaction::delete_rating),
        )
        .layer(Extension(ContentKind::BlogPost));

    // Wiki content is addressed by slug, including its sub-resources.
    let wiki_routes = Router::new()
        .route("/", get(wiki::list_pages).post(wiki::create_page))
        .route(
            "/{slug}",
            get(wiki::get_page).put(wiki::update_page).delete(wiki::delete_page),
        )
        .route("/{slug}/versions", get(versions::list_versions))
        .route("/{slug}/versions/{version}/restore", post(wiki::restore_version))
        .route(
            "/{slug}/comments",
            get(interaction::list_comments).post(interaction::create_comment),
        )
        .route(
            "/{slug}/rating",
            get(interaction::get_rating)
                .put(interaction::rate_content)
                .delete(interaction::delete_rating),
        )
        .layer(Extension(ContentKind::WikiPage));

    let gallery_routes = Router::new()
        .route("/", get(gallery::list_items).post(gallery::create_item))
        .route(
            "/{id}",
            get(gallery::get_item)
                .put(gallery::update_item)
                .delete(gallery::delete_item),
        )
        .route(
            "/{id}/comments",
            get(interaction::list_comments).post(interaction::create_comment),
        )
        .route(
            "/{id}/rating",
            get(interaction::get_rating)
                .put(interaction::rate_content)
                .delete(interaction::delete_rating),
        )
        .layer(Extension(ContentKind::GalleryItem));

    let story_routes = Router::new()
        .route("/", get(stories::list_stories).post(stories::create_story))
        .route(
            "/{id}",
            get(stories::get_story)
                .put(stories::update_story)
                .delete(stories::delete_story),
        )
        .route("/{id}/versions", get(versions::list_versions))
        .route(
            "/{id}/comments",
            get(interaction::list_comments).post(interaction::create_comment),
        )
        .route(
            "/{id}/rating",
            get(interaction::get_rating)
                .put(interaction::rate_content)
                .delete(interaction::delete_rating),
        )
        .layer(Extension(ContentKind::Story));

    let comment_routes = Router::new().route("/{id}", delete(interaction::delete_comment));

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", put(admin::update_user).delete(admin::delete_user))
        .route("/content/{kind}/{id}", delete(admin::takedown_content))
        .route("/jobs", get(admin::list_jobs))
        .route("/jobs/{id}/retry", post(admin::retry_job))
        .route("/audit", get(admin::list_audit))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::live))
        .route("/ready", get(health::ready));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/articles", article_routes)
        .nest("/api/blog", blog_routes)
        .nest("/api/wiki", wiki_routes)
        .nest("/api/gallery", gallery_routes)
        .nest("/api/stories", story_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/health", health_routes)
        .route("/api/search", get(search::search))
        .route("/api/stats/dashboard", get(profile::dashboard))
        .route("/api/ws/notifications", get(notifications::ws_notifications))
        // Global Middleware (applied from outside in)
        .layer(middleware::from_fn(csrf_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
