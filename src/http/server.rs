//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Bind server to listener
//! - Stop accepting and drain on shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::handlers::{self, ServiceState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, X_REQUEST_ID};
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::observability::metrics;
use crate::service::ConfigService;

/// HTTP server exposing the management API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &AppConfig, service: Arc<ConfigService>) -> Self {
        Self {
            router: Self::build_router(config, service),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: ServiceState) -> Router {
        Router::new()
            .route("/healthz", get(handlers::health))
            .route(
                "/v1/namespaces",
                get(handlers::list_namespaces).post(handlers::create_namespace),
            )
            .route(
                "/v1/namespaces/{id}",
                get(handlers::get_namespace).put(handlers::update_namespace),
            )
            .route("/v1/namespaces/{id}/publish", post(handlers::publish_namespace))
            .route("/v1/namespaces/{id}/watch", get(handlers::watch_namespace))
            .route(
                "/v1/config-files",
                get(handlers::list_files).post(handlers::create_file),
            )
            .route(
                "/v1/config-files/{id}",
                get(handlers::get_file).put(handlers::update_file),
            )
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The router, for serving in-process (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal is received.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;
    metrics::record_request(&method, &route, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_swap::ArcSwap;
    use axum::body::Body;
    use axum::http::{self, header, StatusCode};
    use tower::ServiceExt;

    use crate::kv::MemoryKv;
    use crate::storage::MemoryStore;

    fn server(max_body_bytes: usize) -> HttpServer {
        let mut config = AppConfig::default();
        config.listener.max_body_bytes = max_body_bytes;
        let service = Arc::new(ConfigService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryKv::new()),
            Arc::new(ArcSwap::from_pointee(config.clone())),
        ));
        HttpServer::new(&config, service)
    }

    #[tokio::test]
    async fn test_stack_serves_and_tags_requests() {
        let response = server(1024)
            .router()
            .oneshot(http::Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_before_handler() {
        let body = format!(r#"{{"config":"{}"}}"#, "x".repeat(256));
        let request = http::Request::put("/v1/config-files/1")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let response = server(64).router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
