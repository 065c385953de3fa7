//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, request ID, concurrency limit)
//! - Dispatch requests by path and method
//! - Record per-request metrics
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::cors::preflight_response;
use crate::http::middleware::{concurrency_limit, ConcurrencyLimit};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{method_not_allowed, status_page};
use crate::observability::metrics;
use crate::proxy::Forwarder;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub endpoint: Arc<str>,
}

/// HTTP server for the CORS proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let state = AppState {
            forwarder: Arc::new(Forwarder::new(&config)?),
            endpoint: Arc::from(config.proxy.endpoint.as_str()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let limit = ConcurrencyLimit::new(config.listener.max_concurrent_requests);

        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(axum::middleware::from_fn_with_state(limit, concurrency_limit))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoint = %self.config.proxy.endpoint,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Route dispatch: proxy endpoint by method, status page everywhere else.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let request_id = request_id(&request);

    if !request.uri().path().starts_with(&*state.endpoint) {
        let response = status_page();
        metrics::record_request(method.as_str(), response.status().as_u16(), "status", start_time);
        return response;
    }

    let (kind, response) = match method {
        Method::OPTIONS => ("preflight", preflight_response(request.headers())),
        Method::GET | Method::HEAD | Method::POST => {
            match state.forwarder.forward(request, &request_id).await {
                Ok((delivery, response)) => (delivery.label(), response),
                Err(e) => {
                    if e.status().is_server_error() {
                        tracing::error!(request_id = %request_id, error = %e, "Proxy request failed");
                    } else {
                        tracing::warn!(request_id = %request_id, error = %e, "Proxy request rejected");
                    }
                    (e.kind(), e.into_response())
                }
            }
        }
        _ => ("rejected", method_not_allowed()),
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        status = response.status().as_u16(),
        kind,
        "Request complete"
    );
    metrics::record_request(method.as_str(), response.status().as_u16(), kind, start_time);
    response
}
