//! Staff journey through the back-office: log in, open tenant pages and get
//! logged out when the backend stops accepting the token.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use cardapio_backoffice::config::BackofficeConfig;
use cardapio_backoffice::state::AppState;
use cardapio_client::ApiConfig;
use cardapio_integration_tests::{DEAD_SOCKET_URL, Recorder, fixtures, serve, serve_backend, url};
use chrono::FixedOffset;
use serde_json::{Value, json};

const SLUG: &str = "pizzaria-do-ze";

fn backend_router(expired: Arc<AtomicBool>) -> Router {
    Router::new()
        .route(
            "/api/v1/auth/login",
            post(|Json(body): Json<Value>| async move {
                let role = match (body["email"].as_str(), body["senha"].as_str()) {
                    (Some("ana@pizzaria.com"), Some("segredo123")) => "admin",
                    (Some("beto@pizzaria.com"), Some("segredo123")) => "funcionario",
                    _ => {
                        return (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({"message": "Credenciais inválidas"})),
                        )
                            .into_response();
                    }
                };
                Json(fixtures::sessao("tok-1", role, 2, SLUG)).into_response()
            }),
        )
        .route(
            "/api/v1/empresas/{id}/avisos",
            get(move |headers: HeaderMap| {
                let expired = Arc::clone(&expired);
                async move {
                    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
                    if expired.load(Ordering::SeqCst) || bearer != Some("Bearer tok-1") {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "token expirado"})))
                            .into_response();
                    }
                    Json(json!([fixtures::aviso(1, 2, "Fechado na segunda")])).into_response()
                }
            }),
        )
}

struct Backoffice {
    base: String,
    http: reqwest::Client,
    backend: Recorder,
    expired: Arc<AtomicBool>,
}

impl Backoffice {
    async fn start() -> Self {
        let expired = Arc::new(AtomicBool::new(false));
        let (backend_addr, backend) = serve_backend(backend_router(Arc::clone(&expired)))
            .await
            .unwrap();

        let config = BackofficeConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost:3001".to_string(),
            api: ApiConfig::new(&url(backend_addr), Some(DEAD_SOCKET_URL)).unwrap(),
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let app = cardapio_backoffice::app(AppState::new(config).unwrap());
        let addr = serve(app).await.unwrap();

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base: url(addr),
            http,
            backend,
            expired,
        }
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap()
    }

    async fn login(&self, email: &str, senha: &str) -> reqwest::Response {
        self.http
            .post(format!("{}/login", self.base))
            .form(&[("email", email), ("senha", senha)])
            .send()
            .await
            .unwrap()
    }
}

fn location(response: &reqwest::Response) -> &str {
    response.headers().get("location").unwrap().to_str().unwrap()
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_lands_on_kitchen_board() {
    let office = Backoffice::start().await;

    let response = office.login("ana@pizzaria.com", "segredo123").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), format!("/{SLUG}/pedidos"));

    // Logged in users skip the login page.
    let response = office.get("/login").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), format!("/{SLUG}/pedidos"));
}

#[tokio::test]
async fn test_wrong_password_rerenders_login() {
    let office = Backoffice::start().await;

    let response = office.login("ana@pizzaria.com", "errada").await;
    assert_eq!(response.status(), 401);
    let html = response.text().await.unwrap();
    assert!(html.contains("E-mail ou senha inválidos."));
    assert!(html.contains("ana@pizzaria.com"));

    let response = office.get(&format!("/{SLUG}/avisos")).await;
    assert_eq!(location(&response), "/login");
}

// =============================================================================
// Tenant pages
// =============================================================================

#[tokio::test]
async fn test_manager_pages_use_session_token() {
    let office = Backoffice::start().await;
    office.login("ana@pizzaria.com", "segredo123").await;

    let response = office.get(&format!("/{SLUG}/avisos")).await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Fechado na segunda"));
    assert_eq!(
        office
            .backend
            .authorization("/api/v1/empresas/2/avisos")
            .await
            .as_deref(),
        Some("Bearer tok-1")
    );
}

#[tokio::test]
async fn test_other_tenant_and_employee_roles_are_refused() {
    let office = Backoffice::start().await;
    office.login("beto@pizzaria.com", "segredo123").await;

    let response = office.get(&format!("/{SLUG}/avisos")).await;
    assert_eq!(response.status(), 403);

    let response = office.get("/outra-pizzaria/pedidos").await;
    assert_eq!(response.status(), 403);

    let response = office.get("/admin/empresas").await;
    assert_eq!(response.status(), 403);

    assert_eq!(office.backend.hits("/api/v1/empresas/2/avisos").await, 0);
}

// =============================================================================
// Expired token
// =============================================================================

#[tokio::test]
async fn test_backend_rejection_logs_user_out() {
    let office = Backoffice::start().await;
    office.login("ana@pizzaria.com", "segredo123").await;
    assert_eq!(office.get(&format!("/{SLUG}/avisos")).await.status(), 200);

    office.expired.store(true, Ordering::SeqCst);
    let response = office.get(&format!("/{SLUG}/avisos")).await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/login");

    // The session no longer holds a user, so the login page renders.
    office.expired.store(false, Ordering::SeqCst);
    let response = office.get("/login").await;
    assert_eq!(response.status(), 200);

    let response = office.get(&format!("/{SLUG}/avisos")).await;
    assert_eq!(response.status(), 303);
    assert_eq!(office.backend.hits("/api/v1/empresas/2/avisos").await, 2);
}

#[tokio::test]
async fn test_htmx_request_with_expired_token_gets_hx_redirect() {
    let office = Backoffice::start().await;
    office.login("ana@pizzaria.com", "segredo123").await;
    office.expired.store(true, Ordering::SeqCst);

    let response = office
        .http
        .get(format!("{}/{SLUG}/avisos", office.base))
        .header("hx-request", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("hx-redirect").unwrap(), "/login");
}
