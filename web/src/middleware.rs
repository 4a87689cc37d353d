//! Correlation-id tracking, shared by the ingestion surface and the
//! management API (§6): every request — whether it's an SDK posting an
//! event or a dashboard call — gets tagged once, here, rather than each
//! handler generating its own id.
//!
//! # Flow
//!
//! 1. **Extract** the correlation id from `X-Correlation-ID` (or generate a
//!    new UUID) before the request reaches a handler.
//! 2. **Store** it in the request's extensions so [`CorrelationIdExt`] can
//!    pull it back out (ingestion's credential-resolution errors and the
//!    management API's `AppError` responses both get logged against it).
//! 3. **Open a tracing span** (`vigil_http_request`) carrying the
//!    correlation id, method, and URI for the lifetime of the request.
//! 4. **Echo** it back on the response header so a client can correlate its
//!    own logs with ours.
//!
//! ```ignore
//! use vigil_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/api/v1/issues/:id", get(issues::get))
//!     .layer(correlation_id_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Build the layer that tags every request — ingestion and management
/// alike — with a correlation id, per [`build_router`](crate::routes::build_router).
#[must_use]
pub fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "vigil_http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

/// Pulls the correlation id [`CorrelationIdLayer`] stashed in a request's
/// extensions back out, for handlers and error logging
/// (see [`crate::error::AppError`]'s server-error log lines) that want to
/// tie their output to the same id the client sees echoed back.
pub trait CorrelationIdExt {
    /// Get the correlation ID from request extensions.
    ///
    /// # Panics
    ///
    /// Panics if [`correlation_id_layer`] is not installed on the router —
    /// `build_router` always installs it, so this should never fire outside
    /// a test harness that builds a bare `Router`.
    fn correlation_id(&self) -> Uuid;

    /// Try to get the correlation ID from request extensions.
    ///
    /// Returns `None` if the correlation ID middleware is not installed.
    fn try_correlation_id(&self) -> Option<Uuid>;
}

impl CorrelationIdExt for Request {
    fn correlation_id(&self) -> Uuid {
        self.extensions().get::<Uuid>().copied().expect("CorrelationId middleware not installed")
    }

    fn try_correlation_id(&self) -> Option<Uuid> {
        self.extensions().get::<Uuid>().copied()
    }
}

use tracing::Instrument;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, response::IntoResponse, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn correlation_id_generated_if_missing() {
        let app = Router::new().route("/test", get(|| async { "ok" })).layer(correlation_id_layer());

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        let correlation_id = response.headers().get(CORRELATION_ID_HEADER).expect("header present");
        assert!(Uuid::parse_str(correlation_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn correlation_id_preserved_from_request() {
        let app = Router::new().route("/test", get(|| async { "ok" })).layer(correlation_id_layer());

        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let response_id = response.headers().get(CORRELATION_ID_HEADER).expect("header present").to_str().unwrap();
        assert_eq!(response_id, request_uuid.to_string());
    }

    #[tokio::test]
    async fn correlation_id_reachable_from_request_extensions() {
        use axum::body::Body;

        async fn handler(req: Request<Body>) -> impl IntoResponse {
            let correlation_id = req.correlation_id();
            format!("Correlation ID: {correlation_id}")
        }

        let app = Router::new().route("/test", get(handler)).layer(correlation_id_layer());
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn invalid_uuid_generates_new() {
        let app = Router::new().route("/test", get(|| async { "ok" })).layer(correlation_id_layer());

        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let correlation_id = response.headers().get(CORRELATION_ID_HEADER).expect("header present");
        let uuid_str = correlation_id.to_str().unwrap();
        assert!(Uuid::parse_str(uuid_str).is_ok());
        assert_ne!(uuid_str, "not-a-uuid");
    }
}
