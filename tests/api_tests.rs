// tests/api_tests.rs

use std::net::SocketAddr;

use portal_backend::{config::Config, realtime::NotificationHub, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL, or None (skipping the test) when no database is
/// configured in the environment.
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
        jwt_secret: "test_secret_for_integration_tests".to_string(),
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

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

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

async fn register_and_login(address: &str, client: &reqwest::Client) -> (String, String) {
    let username = unique_name("u");
    let password = "password123";

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    (username, login["token"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn unknown_route_is_404() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_probes_respond() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    for path in ["/api/health", "/api/health/live", "/api/health/ready"] {
        let response = client
            .get(format!("{}{}", address, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200, "probe {} failed", path);
    }
}

#[tokio::test]
async fn register_fails_validation() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": "yo", "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let username = unique_name("dup");

    for expected in [201, 409] {
        let response = client
            .post(format!("{}/api/auth/register", address))
            .json(&serde_json::json!({ "username": username, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), expected);
    }
}

#[tokio::test]
async fn csrf_guard_blocks_cookieless_mutations() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // No bearer token, no CSRF cookie: the guard rejects before auth runs.
    let response = client
        .post(format!("{}/api/articles", address))
        .json(&serde_json::json!({ "title": "t", "body": "b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Fetch a token; it arrives both as cookie and body.
    let csrf_resp = client
        .get(format!("{}/api/auth/csrf", address))
        .send()
        .await
        .unwrap();
    assert_eq!(csrf_resp.status().as_u16(), 200);
    let set_cookie = csrf_resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("portal_csrf="));
    let body: serde_json::Value = csrf_resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    // Matching cookie + header passes the guard; the request then fails
    // auth instead (401), proving the guard ran first.
    let response = client
        .post(format!("{}/api/articles", address))
        .header("Cookie", format!("portal_csrf={}", token))
        .header("x-csrf-token", token)
        .json(&serde_json::json!({ "title": "t", "body": "b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn article_draft_lifecycle() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&address, &client).await;

    // Create a draft.
    let created: serde_json::Value = client
        .post(format!("{}/api/articles", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Draft article",
            "summary": "A summary",
            "body": "<p>Hello</p><script>alert(1)</script>",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    // Sanitization stripped the script but kept the paragraph.
    assert!(created["body"].as_str().unwrap().contains("<p>Hello</p>"));
    assert!(!created["body"].as_str().unwrap().contains("script"));

    // Anonymous readers cannot see the draft.
    let anon = client
        .get(format!("{}/api/articles/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(anon.status().as_u16(), 404);

    // The author can.
    let mine = client
        .get(format!("{}/api/articles/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(mine.status().as_u16(), 200);

    // Same visibility rule on the listing: hidden from anonymous callers,
    // present for the author.
    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/api/articles", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.iter().all(|a| a["id"] != id));

    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/api/articles", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.iter().any(|a| a["id"] == id));

    // Publish it.
    let updated: serde_json::Value = client
        .put(format!("{}/api/articles/{}", address, id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "status": "published" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["status"], "published");
    assert!(updated["published_at"].is_string());

    // Now public.
    let public = client
        .get(format!("{}/api/articles/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(public.status().as_u16(), 200);

    // The edit snapshotted the pre-publish state.
    let versions: Vec<serde_json::Value> = client
        .get(format!("{}/api/articles/{}/versions", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["version_no"], 1);

    // Soft delete hides it again.
    let deleted = client
        .delete(format!("{}/api/articles/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let gone = client
        .get(format!("{}/api/articles/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn only_the_author_or_admin_can_edit() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token_a) = register_and_login(&address, &client).await;
    let (_, token_b) = register_and_login(&address, &client).await;

    let created: serde_json::Value = client
        .post(format!("{}/api/articles", address))
        .bearer_auth(&token_a)
        .json(&serde_json::json!({ "title": "Mine", "body": "content", "status": "published" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/api/articles/{}", address, id))
        .bearer_auth(&token_b)
        .json(&serde_json::json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .delete(format!("{}/api/articles/{}", address, id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn profile_reflects_activity() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (username, token) = register_and_login(&address, &client).await;

    client
        .post(format!("{}/api/articles", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "title": "One", "body": "b", "status": "published" }))
        .send()
        .await
        .unwrap();

    let me: serde_json::Value = client
        .get(format!("{}/api/profile/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(me["username"], username.as_str());
    assert_eq!(me["articles_count"], 1);
    assert_eq!(me["comments_count"], 0);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&address, &client).await;

    // No token at all.
    let response = client
        .get(format!("{}/api/admin/users", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Plain user token.
    let response = client
        .get(format!("{}/api/admin/users", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
