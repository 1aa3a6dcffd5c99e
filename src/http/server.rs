//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router that sends every request to the handler
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Apply the configured upload directory
//! - Wrap each request in a `Request`/`Response` pair for the handler
//! - Serve until the shutdown signal fires

use std::future::Future;
use std::time::{Duration, Instant};

use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Response as AxumResponse},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::EssenConfig;
use crate::http::request::Request;
use crate::http::request_id::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::Response;
use crate::observability::metrics;
use crate::upload::UploadSettings;

/// Application code invoked for every request.
///
/// Implemented for any `async fn(Request, Response) -> impl IntoResponse`.
pub trait Handler: Clone + Send + Sync + 'static {
    type Future: Future<Output = AxumResponse> + Send + 'static;

    fn call(&self, request: Request, response: Response) -> Self::Future;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request, Response) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    type Future = std::pin::Pin<Box<dyn Future<Output = AxumResponse> + Send>>;

    fn call(&self, request: Request, response: Response) -> Self::Future {
        let fut = (self)(request, response);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// State injected into the dispatch function.
#[derive(Clone)]
pub struct AppState<H> {
    pub handler: H,
    pub uploads: UploadSettings,
    pub max_body_bytes: usize,
}

/// HTTP server running one handler.
pub struct HttpServer {
    router: Router,
    config: EssenConfig,
    uploads: UploadSettings,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new<H: Handler>(config: EssenConfig, handler: H) -> Self {
        let uploads = UploadSettings::new();
        if let Some(upload) = &config.upload {
            uploads.set(upload.clone());
        }

        let state = AppState {
            handler,
            uploads: uploads.clone(),
            max_body_bytes: config.server.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            uploads,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<H: Handler>(config: &EssenConfig, state: AppState<H>) -> Router {
        Router::new()
            .fallback(dispatch::<H>)
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving without a listener (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Upload settings shared by every request of this server.
    pub fn uploads(&self) -> UploadSettings {
        self.uploads.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EssenConfig {
        &self.config
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
            upload_dir = ?self.uploads.get().map(|c| c.upload_dir.clone()),
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
}

fn request_id_of(headers: &axum::http::HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span around every request, carrying the id set by `SetRequestIdLayer`.
fn request_span(request: &axum::http::Request<axum::body::Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id_of(request.headers()),
    )
}

async fn dispatch<H: Handler>(
    State(state): State<AppState<H>>,
    request: axum::extract::Request,
) -> AxumResponse {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let request = Request::new(request, state.uploads.clone(), state.max_body_bytes);
    tracing::debug!(
        request_id = request.request_id().unwrap_or("unknown"),
        method = %method,
        path = %path,
        "Dispatching request"
    );

    let response = state.handler.call(request, Response::new()).await;

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}
