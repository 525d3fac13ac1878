//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request id, tracing, timeout, body limit, metrics)
//! - Guard write routes with the API key
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::http::Request as HttpRequest;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::gateway::ChainTransactionGateway;
use crate::http::auth::require_api_key;
use crate::http::handlers;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ChainTransactionGateway>,
    pub api_key: Option<Arc<str>>,
}

/// HTTP front end for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(gateway: Arc<ChainTransactionGateway>, config: &ServerConfig) -> Self {
        let state = AppState {
            gateway,
            api_key: config.api_key.as_deref().map(Arc::from),
        };
        if state.api_key.is_none() {
            tracing::warn!("No API key configured; write routes are open");
        }
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let writes = Router::new()
            .route("/api/v1/session/connect", post(handlers::connect))
            .route("/api/v1/donations", post(handlers::send_donation))
            .route("/api/v1/loans/fund", post(handlers::fund_loan))
            .route("/api/v1/form", get(handlers::get_form).put(handlers::put_form))
            .route("/api/v1/form/submit", post(handlers::submit_form))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

        let reads = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/v1/session", get(handlers::get_session))
            .route("/api/v1/transactions", get(handlers::list_transactions))
            .route("/api/v1/transactions/zakat", get(handlers::list_zakat_transactions))
            .route("/api/v1/transactions/count", get(handlers::transaction_count));

        reads
            .merge(writes)
            .with_state(state)
            .layer(middleware::from_fn(track_requests))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &HttpRequest<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id(request),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// The configured router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Count requests by matched route and status.
async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    metrics::record_http_request(&route, response.status().as_u16());
    response
}
