// tests/content_tests.rs

use std::net::SocketAddr;
use std::time::Duration;

use portal_backend::{
    config::Config, jobs, realtime::NotificationHub, routes, state::AppState,
};
use sqlx::postgres::PgPoolOptions;

/// Spawns the app plus the image job dispatcher, as main() does.
async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "content_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        frontend_origin: "http://localhost:3000".to_string(),
        cache_url: None,
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool,
        config,
        cache: None,
        hub: NotificationHub::new(),
    };

    tokio::spawn(jobs::dispatcher::run(state.clone()));

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    Some(address)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn register_and_login(address: &str, client: &reqwest::Client) -> String {
    let username = unique_name("u");

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .unwrap();

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    login["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn wiki_edit_history_and_restore() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;
    let slug = unique_name("page").replace('_', "-");

    // Create, then edit.
    let created = client
        .post(format!("{}/api/wiki", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "slug": slug,
            "title": "Original title",
            "body": "Original body",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);

    let updated: serde_json::Value = client
        .put(format!("{}/api/wiki/{}", address, slug))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "body": "Edited body" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["body"], "Edited body");
    assert_eq!(updated["title"], "Original title");

    // The edit left version 1 behind, holding the original state.
    let versions: Vec<serde_json::Value> = client
        .get(format!("{}/api/wiki/{}/versions", address, slug))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["body"], "Original body");

    // Restore version 1; the pre-restore state gets its own snapshot.
    let restored: serde_json::Value = client
        .post(format!("{}/api/wiki/{}/versions/1/restore", address, slug))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(restored["body"], "Original body");

    let versions: Vec<serde_json::Value> = client
        .get(format!("{}/api/wiki/{}/versions", address, slug))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["body"], "Edited body");

    // Duplicate slug conflicts.
    let dup = client
        .post(format!("{}/api/wiki", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "slug": slug, "title": "t", "body": "b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status().as_u16(), 409);
}

#[tokio::test]
async fn wiki_rejects_bad_slugs() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;

    let response = client
        .post(format!("{}/api/wiki", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "slug": "Not A Slug", "title": "t", "body": "b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn blog_tag_filter() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;
    let marker = unique_name("tag");

    client
        .post(format!("{}/api/blog", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Tagged post",
            "body": "content",
            "tags": [marker, "second"],
            "status": "published",
        }))
        .send()
        .await
        .unwrap();

    let hits: Vec<serde_json::Value> = client
        .get(format!("{}/api/blog?tag={}", address, marker))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["title"], "Tagged post");

    let misses: Vec<serde_json::Value> = client
        .get(format!("{}/api/blog?tag={}-nope", address, marker))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(misses.is_empty());
}

#[tokio::test]
async fn gallery_item_is_processed_by_the_job_queue() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;

    let created: serde_json::Value = client
        .post(format!("{}/api/gallery", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Sunset",
            "caption": "over the bay",
            "image_url": "https://cdn.example.com/u/1/sunset.jpg",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["processing_status"], "pending");

    // The dispatcher picks the jobs up in the background; poll until both
    // variants are in place.
    let mut item = created;
    for _ in 0..50 {
        if item["processing_status"] == "ready" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        item = client
            .get(format!("{}/api/gallery/{}", address, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    }

    assert_eq!(item["processing_status"], "ready");
    assert_eq!(
        item["thumbnail_url"],
        "https://cdn.example.com/u/1/sunset_thumb.jpg"
    );
    assert_eq!(item["web_url"], "https://cdn.example.com/u/1/sunset_web.jpg");
}

#[tokio::test]
async fn gallery_rejects_non_http_image_urls() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;

    let response = client
        .post(format!("{}/api/gallery", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Bad",
            "image_url": "javascript:alert(1)",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn search_spans_content_types() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;
    let marker = unique_name("needle");

    client
        .post(format!("{}/api/articles", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": format!("About {}", marker),
            "body": "article body",
            "status": "published",
        }))
        .send()
        .await
        .unwrap();

    client
        .post(format!("{}/api/stories", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "A story",
            "body": format!("the {} appears here", marker),
            "status": "published",
        }))
        .send()
        .await
        .unwrap();

    // Draft content must stay invisible.
    client
        .post(format!("{}/api/blog", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": format!("Hidden {}", marker),
            "body": "draft body",
        }))
        .send()
        .await
        .unwrap();

    let hits: Vec<serde_json::Value> = client
        .get(format!("{}/api/search?q={}", address, marker))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let kinds: Vec<&str> = hits.iter().map(|h| h["kind"].as_str().unwrap()).collect();
    assert!(kinds.contains(&"articles"));
    assert!(kinds.contains(&"stories"));
    assert!(!kinds.contains(&"blog"));

    // Kind filter narrows the result.
    let hits: Vec<serde_json::Value> = client
        .get(format!("{}/api/search?q={}&kind=stories", address, marker))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(hits.iter().all(|h| h["kind"] == "stories"));

    // Blank queries are rejected.
    let response = client
        .get(format!("{}/api/search?q=%20", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn dashboard_counts_published_content() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;

    client
        .post(format!("{}/api/articles", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Front page",
            "body": "b",
            "status": "published",
        }))
        .send()
        .await
        .unwrap();

    let stats: serde_json::Value = client
        .get(format!("{}/api/stats/dashboard", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(stats["content"]["articles"].is_i64());
    assert!(stats["users"].is_i64());
    // At least one published article exists, so the high-water mark is set.
    assert!(stats["latest_published"].is_string());
}
