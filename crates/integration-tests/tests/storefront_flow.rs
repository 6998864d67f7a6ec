//! Customer journey through the public menu: browse, fill the cart, check
//! out and land on the tracker.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use cardapio_client::ApiConfig;
use cardapio_integration_tests::{DEAD_SOCKET_URL, fixtures, serve, serve_backend, url};
use cardapio_storefront::config::StorefrontConfig;
use cardapio_storefront::state::AppState;
use chrono::FixedOffset;
use serde_json::{Value, json};
use tokio::sync::Mutex;

const SLUG: &str = "pizzaria-do-ze";

type Captured = Arc<Mutex<Option<Value>>>;

fn backend_router(captured: Captured, online: Arc<AtomicBool>) -> Router {
    Router::new()
        .route(
            "/api/v1/public/empresas/{slug}",
            get(move || {
                let online = Arc::clone(&online);
                async move {
                    let mut empresa = fixtures::empresa(2, SLUG);
                    empresa["permitir_pedidos_online"] = json!(online.load(Ordering::SeqCst));
                    Json(empresa)
                }
            }),
        )
        .route(
            "/api/v1/public/empresas/{slug}/produtos",
            get(|| async {
                Json(json!([
                    fixtures::produto(1, 2, "Margherita", 42.0),
                    fixtures::produto(2, 2, "Calabresa", 45.5)
                ]))
            }),
        )
        .route(
            "/api/v1/public/empresas/{slug}/avisos",
            get(|| async { Json(json!([fixtures::aviso(1, 2, "Aberto no feriado")])) }),
        )
        .route(
            "/api/v1/public/empresas/{slug}/enderecos",
            get(|| async {
                Json(json!([
                    {"id": 1, "empresa_id": 2, "bairro": "Centro", "taxa_entrega": 6, "ativo": true}
                ]))
            }),
        )
        .route(
            "/api/v1/public/pedidos",
            post(move |Json(body): Json<Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    *captured.lock().await = Some(body);
                    (StatusCode::CREATED, Json(fixtures::pedido(42, 2, "pendente")))
                }
            }),
        )
        .route(
            "/api/v1/public/pedidos/{id}",
            get(|| async { Json(fixtures::pedido(42, 2, "pendente")) }),
        )
}

struct Storefront {
    base: String,
    http: reqwest::Client,
    captured: Captured,
    online: Arc<AtomicBool>,
    state: AppState,
}

impl Storefront {
    async fn start() -> Self {
        let captured = Captured::default();
        let online = Arc::new(AtomicBool::new(true));
        let (backend, _) = serve_backend(backend_router(Arc::clone(&captured), Arc::clone(&online)))
            .await
            .unwrap();

        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            api: ApiConfig::new(&url(backend), Some(DEAD_SOCKET_URL)).unwrap(),
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let state = AppState::new(config).unwrap();
        let addr = serve(cardapio_storefront::app(state.clone())).await.unwrap();

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base: url(addr),
            http,
            captured,
            online,
            state,
        }
    }

    /// Turn online ordering off and drop the cached company.
    async fn close(&self) {
        self.online.store(false, Ordering::SeqCst);
        self.state.api().invalidate_empresa(SLUG).await;
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.http
            .post(format!("{}{path}", self.base))
            .form(form)
            .send()
            .await
            .unwrap()
    }
}

// =============================================================================
// Menu
// =============================================================================

#[tokio::test]
async fn test_menu_lists_products_and_notices() {
    let store = Storefront::start().await;

    let response = store.get(&format!("/{SLUG}")).await;
    assert_eq!(response.status(), 200);
    let html = response.text().await.unwrap();

    assert!(html.contains("Pizzaria do Zé"));
    assert!(html.contains("Margherita"));
    assert!(html.contains("Calabresa"));
    assert!(html.contains("Aberto no feriado"));
}

#[tokio::test]
async fn test_malformed_slug_is_not_found() {
    let store = Storefront::start().await;

    let response = store.get("/Nao_Existe!").await;
    assert_eq!(response.status(), 404);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_places_order_and_redirects_to_tracker() {
    let store = Storefront::start().await;

    let badge = store
        .post(
            &format!("/{SLUG}/carrinho/adicionar"),
            &[("produto_id", "1"), ("quantidade", "2"), ("adicional", "101")],
        )
        .await;
    assert_eq!(badge.status(), 200);
    assert!(badge.headers().contains_key("hx-trigger"));
    assert!(badge.text().await.unwrap().contains("Carrinho (2)"));

    let entrega = store
        .post(&format!("/{SLUG}/carrinho/entrega"), &[("tipo", "retirada")])
        .await;
    assert_eq!(entrega.status(), 200);

    let response = store
        .post(
            &format!("/{SLUG}/checkout"),
            &[
                ("nome", "Ana"),
                ("telefone", "31 99999-0000"),
                ("forma_pagamento", "pix"),
            ],
        )
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(
        response.headers().get("location").unwrap(),
        &format!("/{SLUG}/pedido/42")
    );

    let sent = store.captured.lock().await.clone().unwrap();
    assert_eq!(sent["empresa_id"], 2);
    assert_eq!(sent["tipo_entrega"], "retirada");
    assert_eq!(sent["forma_pagamento"], "pix");
    assert_eq!(sent["itens"][0]["quantidade"], 2);
    assert_eq!(sent["itens"][0]["adicionais"], json!([101]));

    let tracker = store.get(&format!("/{SLUG}/pedido/42")).await;
    assert_eq!(tracker.status(), 200);
    assert!(tracker.text().await.unwrap().contains("Pedido #0042 recebido!"));

    // The cart was emptied by the order.
    let badge = store.get(&format!("/{SLUG}/carrinho/contador")).await;
    assert!(badge.text().await.unwrap().contains("Carrinho (0)"));
}

#[tokio::test]
async fn test_checkout_without_name_is_rejected() {
    let store = Storefront::start().await;

    store
        .post(&format!("/{SLUG}/carrinho/adicionar"), &[("produto_id", "2")])
        .await;
    store
        .post(&format!("/{SLUG}/carrinho/entrega"), &[("tipo", "retirada")])
        .await;

    let response = store
        .post(
            &format!("/{SLUG}/checkout"),
            &[("nome", " "), ("telefone", "31 99999-0000")],
        )
        .await;
    assert_eq!(response.status(), 422);
    assert!(store.captured.lock().await.is_none());
}

#[tokio::test]
async fn test_empty_cart_checkout_goes_back_to_cart() {
    let store = Storefront::start().await;

    let response = store.get(&format!("/{SLUG}/checkout")).await;
    assert_eq!(response.status(), 303);
    assert_eq!(
        response.headers().get("location").unwrap(),
        &format!("/{SLUG}/carrinho")
    );
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_closed_menu_cart_can_shrink_but_not_grow() {
    let store = Storefront::start().await;
    store
        .post(
            &format!("/{SLUG}/carrinho/adicionar"),
            &[("produto_id", "1"), ("quantidade", "2")],
        )
        .await;
    store.close().await;

    let grow = store
        .post(
            &format!("/{SLUG}/carrinho/atualizar"),
            &[("item", "1::"), ("quantidade", "50")],
        )
        .await;
    assert_eq!(grow.status(), 409);
    assert_eq!(
        grow.text().await.unwrap(),
        "Pedidos online estão desativados no momento."
    );

    let shrink = store
        .post(
            &format!("/{SLUG}/carrinho/atualizar"),
            &[("item", "1::"), ("quantidade", "1")],
        )
        .await;
    assert_eq!(shrink.status(), 200);
    let html = shrink.text().await.unwrap();
    assert!(html.contains(r#"value="1" min="0" max="99" aria-label="Quantidade" disabled"#));

    let badge = store.get(&format!("/{SLUG}/carrinho/contador")).await;
    assert!(badge.text().await.unwrap().contains("Carrinho (1)"));

    let add = store
        .post(&format!("/{SLUG}/carrinho/adicionar"), &[("produto_id", "2")])
        .await;
    assert_eq!(add.status(), 409);
}

#[tokio::test]
async fn test_notes_typed_before_delivery_type_are_kept() {
    let store = Storefront::start().await;
    store
        .post(&format!("/{SLUG}/carrinho/adicionar"), &[("produto_id", "1")])
        .await;

    let notes = store
        .post(
            &format!("/{SLUG}/carrinho/entrega"),
            &[("tipo", ""), ("observacoes", "sem cebola")],
        )
        .await;
    assert_eq!(notes.status(), 200);
    let html = notes.text().await.unwrap();
    assert!(html.contains(">sem cebola</textarea>"));
    assert!(html.contains("Escolha como deseja receber para continuar."));

    let entrega = store
        .post(
            &format!("/{SLUG}/carrinho/entrega"),
            &[("tipo", "retirada"), ("observacoes", "sem cebola")],
        )
        .await;
    assert_eq!(entrega.status(), 200);

    store
        .post(
            &format!("/{SLUG}/checkout"),
            &[
                ("nome", "Ana"),
                ("telefone", "31 99999-0000"),
                ("forma_pagamento", "pix"),
            ],
        )
        .await;
    let sent = store.captured.lock().await.clone().unwrap();
    assert_eq!(sent["observacoes"], "sem cebola");
}
