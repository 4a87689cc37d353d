//! Health and version endpoints (§6.2's public surface).

use axum::http::StatusCode;

/// `GET /health` — basic liveness, no dependency checks.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// `GET /api/version` — the crate version this build was compiled from.
#[allow(clippy::unused_async)]
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn version_is_nonempty() {
        assert!(!version().await.is_empty());
    }
}
