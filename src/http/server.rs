//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum Router with the single `GET /` route
//! - Wire up middleware (request ID, tracing)
//! - Fetch the target URL and shape the response by content type
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{HeaderMap, Request, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_id, target_url, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{
    content_type, html_response, passthrough_response, plain_text, MISSING_TARGET_BODY,
    PROXY_ERROR_BODY,
};
use crate::observability::metrics::{self, Outcome};
use crate::rewrite::{is_html, rewrite_image_sources};
use crate::upstream::{decode_text, FetchError, UpstreamClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamClient,
    pub rewrite_prefix: Arc<str>,
}

/// HTTP server for the image proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, FetchError> {
        let state = AppState {
            upstream: UpstreamClient::new(&config.upstream)?,
            rewrite_prefix: config.rewrite_prefix().into(),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The fully layered router, e.g. for driving with `tower::ServiceExt`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_url = %self.config.proxy.base_url,
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

/// `GET /?u=<target>`: fetch the target and relay it.
async fn proxy_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers);

    let Some(target) = target_url(query.as_deref()) else {
        tracing::debug!(request_id = %request_id, "Missing target query parameter");
        metrics::record_request(Outcome::MissingTarget, 400, start_time);
        return plain_text(StatusCode::BAD_REQUEST, MISSING_TARGET_BODY);
    };

    tracing::debug!(request_id = %request_id, target = %target, "Fetching upstream");

    let upstream = match state.upstream.fetch(&target).await {
        Ok(response) => response,
        Err(e) => return fetch_failed(request_id, &target, &e, start_time),
    };

    let status = upstream.status();
    if !status.is_success() {
        tracing::warn!(
            request_id = %request_id,
            target = %target,
            status = status.as_u16(),
            "Upstream returned non-success status"
        );
        metrics::record_request(Outcome::UpstreamFailure, 200, start_time);
        return plain_text(StatusCode::OK, PROXY_ERROR_BODY);
    }

    let upstream_headers = upstream.headers().clone();
    let html = is_html(content_type(&upstream_headers));

    let body = match state.upstream.read_body(upstream).await {
        Ok(body) => body,
        Err(e) => return fetch_failed(request_id, &target, &e, start_time),
    };

    let outcome = if html { Outcome::Html } else { Outcome::Passthrough };
    metrics::record_upstream_bytes(outcome, body.len());
    tracing::debug!(
        request_id = %request_id,
        target = %target,
        bytes = body.len(),
        html,
        "Upstream body buffered"
    );

    let response = if html {
        let rewritten = rewrite_image_sources(&decode_text(&body), &state.rewrite_prefix);
        html_response(&upstream_headers, rewritten)
    } else {
        passthrough_response(&upstream_headers, body)
    };

    metrics::record_request(outcome, 200, start_time);
    response
}

fn fetch_failed(request_id: &str, target: &str, error: &FetchError, start_time: Instant) -> Response {
    tracing::error!(
        request_id = %request_id,
        target = %target,
        error = %error,
        "Fetch error"
    );
    metrics::record_request(Outcome::FetchFailed, 500, start_time);
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, PROXY_ERROR_BODY)
}
