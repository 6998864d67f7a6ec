//! Integration tests for Cardápio.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cardapio-integration-tests
//! ```
//!
//! Both binaries' routers run in-process against a fake restaurant backend
//! served by axum on an ephemeral port, so nothing external is needed.
//!
//! # Test Categories
//!
//! - `rest_client` - error mapping, caching and auth headers of the REST client
//! - `realtime_hub` - socket.io handshake, room ref counting and reconnects
//! - `storefront_flow` - menu, cart and checkout through HTTP
//! - `backoffice_flow` - staff login, tenant pages and expired tokens

pub mod fixtures;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// One request seen by the fake backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// Requests received by a fake backend, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub async fn all(&self) -> Vec<Recorded> {
        self.requests.lock().await.clone()
    }

    /// How many times `path` was requested.
    pub async fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// `Authorization` header of the last request to `path`.
    pub async fn authorization(&self, path: &str) -> Option<String> {
        self.requests
            .lock()
            .await
            .iter()
            .rev()
            .find(|r| r.path == path)
            .and_then(|r| r.authorization.clone())
    }

    fn record(&self, request: &Request) -> impl Future<Output = ()> + Send + use<> {
        let authorization = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let requests = Arc::clone(&self.requests);
        async move {
            requests.lock().await.push(Recorded {
                method,
                path,
                authorization,
            });
        }
    }
}

async fn record_request(State(recorder): State<Recorder>, request: Request, next: Next) -> Response {
    recorder.record(&request).await;
    next.run(request).await
}

/// Serve `router` on an ephemeral local port with peer addresses attached.
///
/// # Errors
///
/// Returns an error if no local port can be bound.
pub async fn serve(router: Router) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let service = router.into_make_service_with_connect_info::<SocketAddr>();
        let _ = axum::serve(listener, service).await;
    });
    Ok(addr)
}

/// Serve a fake backend, recording every request it receives.
///
/// The router's routes are relative to the backend host, e.g.
/// `/api/v1/public/empresas/{slug}`.
///
/// # Errors
///
/// Returns an error if no local port can be bound.
pub async fn serve_backend(router: Router) -> std::io::Result<(SocketAddr, Recorder)> {
    let recorder = Recorder::default();
    let router = router.layer(middleware::from_fn_with_state(
        recorder.clone(),
        record_request,
    ));
    let addr = serve(router).await?;
    Ok((addr, recorder))
}

/// Base URL of a locally served app.
#[must_use]
pub fn url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

/// A socket URL nothing listens on, so realtime hubs stay disconnected.
pub const DEAD_SOCKET_URL: &str = "http://127.0.0.1:9";
