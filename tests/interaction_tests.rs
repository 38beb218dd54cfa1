// tests/interaction_tests.rs

use std::net::SocketAddr;

use portal_backend::{config::Config, realtime::NotificationHub, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

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
        jwt_secret: "interaction_test_secret".to_string(),
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

async fn create_published_article(
    address: &str,
    client: &reqwest::Client,
    token: &str,
) -> i64 {
    let created: serde_json::Value = client
        .post(format!("{}/api/articles", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "title": "Discussion target",
            "body": "content",
            "status": "published",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    created["id"].as_i64().unwrap()
}

#[tokio::test]
async fn threaded_comments_flow() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token_a = register_and_login(&address, &client).await;
    let token_b = register_and_login(&address, &client).await;
    let article_id = create_published_article(&address, &client, &token_a).await;

    // B opens a thread.
    let root: serde_json::Value = client
        .post(format!("{}/api/articles/{}/comments", address, article_id))
        .bearer_auth(&token_b)
        .json(&serde_json::json!({ "body": "First!" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let root_id = root["id"].as_i64().unwrap();

    // A replies; the reply lands in B's thread.
    let reply: serde_json::Value = client
        .post(format!("{}/api/articles/{}/comments", address, article_id))
        .bearer_auth(&token_a)
        .json(&serde_json::json!({ "body": "Welcome", "parent_id": root_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let reply_id = reply["id"].as_i64().unwrap();

    let comments: Vec<serde_json::Value> = client
        .get(format!("{}/api/articles/{}/comments", address, article_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comments.len(), 2);

    let reply_row = comments.iter().find(|c| c["id"] == reply_id).unwrap();
    assert_eq!(reply_row["root_id"].as_i64().unwrap(), root_id);
    assert_eq!(reply_row["parent_id"].as_i64().unwrap(), root_id);
    assert!(reply_row["username"].is_string());

    // The denormalized count followed.
    let article: serde_json::Value = client
        .get(format!("{}/api/articles/{}", address, article_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(article["comments_count"], 2);

    // B cannot delete A's reply.
    let response = client
        .delete(format!("{}/api/comments/{}", address, reply_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // A deletes it; the count falls back.
    let response = client
        .delete(format!("{}/api/comments/{}", address, reply_id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let article: serde_json::Value = client
        .get(format!("{}/api/articles/{}", address, article_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(article["comments_count"], 1);
}

#[tokio::test]
async fn replying_to_a_missing_comment_is_404() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;
    let article_id = create_published_article(&address, &client, &token).await;

    let response = client
        .post(format!("{}/api/articles/{}/comments", address, article_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "body": "into the void", "parent_id": 999999 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn rating_upsert_adjusts_aggregates() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token_a = register_and_login(&address, &client).await;
    let token_b = register_and_login(&address, &client).await;
    let article_id = create_published_article(&address, &client, &token_a).await;

    // B rates 5.
    let summary: serde_json::Value = client
        .put(format!("{}/api/articles/{}/rating", address, article_id))
        .bearer_auth(&token_b)
        .json(&serde_json::json!({ "score": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["average"], 5.0);

    // B changes their mind: still one rating, new average.
    let summary: serde_json::Value = client
        .put(format!("{}/api/articles/{}/rating", address, article_id))
        .bearer_auth(&token_b)
        .json(&serde_json::json!({ "score": 3 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["average"], 3.0);

    // A joins in.
    let summary: serde_json::Value = client
        .put(format!("{}/api/articles/{}/rating", address, article_id))
        .bearer_auth(&token_a)
        .json(&serde_json::json!({ "score": 4 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["count"], 2);
    assert_eq!(summary["average"], 3.5);

    // Anonymous aggregate has no "mine"; B's does.
    let anon: serde_json::Value = client
        .get(format!("{}/api/articles/{}/rating", address, article_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(anon["mine"].is_null());

    let mine: serde_json::Value = client
        .get(format!("{}/api/articles/{}/rating", address, article_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine["mine"], 3);

    // B withdraws; only A's rating remains.
    let response = client
        .delete(format!("{}/api/articles/{}/rating", address, article_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let summary: serde_json::Value = client
        .get(format!("{}/api/articles/{}/rating", address, article_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["average"], 4.0);
}

#[tokio::test]
async fn out_of_range_scores_are_rejected() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;
    let article_id = create_published_article(&address, &client, &token).await;

    for score in [0, 6, -1] {
        let response = client
            .put(format!("{}/api/articles/{}/rating", address, article_id))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "score": score }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "score {} accepted", score);
    }
}

#[tokio::test]
async fn wiki_interactions_are_addressed_by_slug() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let token = register_and_login(&address, &client).await;
    let slug = unique_name("talk").replace('_', "-");

    client
        .post(format!("{}/api/wiki", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "slug": slug, "title": "Talk page", "body": "b" }))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/wiki/{}/comments", address, slug))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "body": "On the talk page" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let summary: serde_json::Value = client
        .put(format!("{}/api/wiki/{}/rating", address, slug))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "score": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["count"], 1);
}
