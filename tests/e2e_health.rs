//! E2E tests for health check, route mounts and metrics

mod common;

use axum::{Router, routing::get};
use common::{TestServer, bare_client};
use storefront::api::ApiMounts;
use storefront::session::CurrentSession;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_health_check_creates_no_session() {
    let server = TestServer::new().await;

    let response = bare_client().get(&server.url("/health")).send().await.unwrap();

    assert!(response.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/health"))
        .header("Origin", "http://127.0.0.1")
        .send()
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/unknown/route"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unmounted_api_prefixes_answer_not_implemented() {
    let server = TestServer::new().await;

    for path in [
        "/api/productos",
        "/api/productos/123",
        "/api/carrito",
        "/api/usuario",
        "/api/usuario/perfil",
    ] {
        let response = server.client.get(&server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 501, "path {path}");

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().is_some(), "path {path}");
    }

    let response = server
        .client
        .post(&server.url("/api/carrito/items"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 501);
}

#[tokio::test]
async fn test_custom_mount_sees_the_session() {
    async fn whoami(CurrentSession(session): CurrentSession) -> String {
        session
            .user()
            .await
            .map(|user| user.display_name)
            .unwrap_or_else(|| "anonymous".to_string())
    }

    let mounts = ApiMounts::default().with_usuario(Router::new().route("/", get(whoami)));
    let server = TestServer::with_mounts(mounts).await;

    let response = server
        .client
        .get(&server.url("/api/usuario"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "anonymous");

    server.login_with("good").await;
    let logout = server.client.get(&server.url("/tw-logout")).send().await.unwrap();
    assert_eq!(common::location(&logout), "/api/usuario");

    let response = server
        .client
        .get(&server.url("/api/usuario"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "anonymous");

    server.login_with("good").await;
    let response = server
        .client
        .get(&server.url("/api/usuario"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "Alice");

    // Other prefixes keep their placeholder.
    let response = server
        .client
        .get(&server.url("/api/productos"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 501);
}

#[tokio::test]
async fn test_metrics_exposes_login_counters() {
    let server = TestServer::new().await;
    server.login_with("good").await;
    server.login_with("denied").await;

    let response = bare_client()
        .get(&server.url("/metrics"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("set-cookie").is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("storefront_login_attempts_total{outcome=\"success\"}"));
    assert!(body.contains("storefront_login_attempts_total{outcome=\"denied\"}"));
    assert!(body.contains("storefront_sessions_created_total"));
}
