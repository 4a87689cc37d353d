//! Router assembly (§6): the ingestion surface, the management API, and
//! health checks behind one [`axum::Router`].

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::BoxError;
use axum::Router;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health, ingest, issues, organizations, projects};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// Layered, outside in: compression, CORS, a per-request deadline
/// (`request_timeout`, from `ServerConfig::request_timeout_secs`), the
/// correlation-id layer, and `tower_http`'s request tracing — every
/// response carries a correlation id and is logged via a `tracing` span the
/// same way a request into any other route in this workspace is.
#[must_use]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let ingest_routes = Router::new()
        .route("/:project_id/store/", post(ingest::store))
        .route("/v1/errors/ingest", post(ingest::ingest));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/change-password", post(auth::change_password))
        .route("/profile", patch(auth::update_profile));

    let organization_routes = Router::new()
        .route("/", post(organizations::create))
        .route("/:org_id", get(organizations::get))
        .route("/:org_id", patch(organizations::update))
        .route("/:org_id", axum::routing::delete(organizations::delete))
        .route("/:org_id/members", get(organizations::list_members))
        .route("/:org_id/members", post(organizations::add_member))
        .route("/:org_id/members/:user_id", patch(organizations::change_member_role))
        .route("/:org_id/members/:user_id", axum::routing::delete(organizations::remove_member))
        .route("/:org_id/projects", post(projects::create))
        .route("/:org_id/projects", get(projects::list));

    let project_routes = Router::new()
        .route("/:project_id", get(projects::get))
        .route("/:project_id", axum::routing::delete(projects::delete))
        .route("/:project_id/keys/regenerate", post(projects::regenerate_keys))
        .route("/:project_id/configuration", patch(projects::configuration))
        .route("/:project_id/issues", get(issues::list))
        .route("/:project_id/issues/stats", get(issues::stats));

    let issue_routes = Router::new()
        .route("/bulk-update", post(issues::bulk_update))
        .route("/:issue_id", get(issues::get))
        .route("/:issue_id", patch(issues::update))
        .route("/:issue_id/comments", get(issues::list_comments))
        .route("/:issue_id/comments", post(issues::add_comment))
        .route("/:issue_id/activity", get(issues::list_activity))
        .route("/:issue_id/events", get(issues::list_events));

    let api_v1 = Router::new()
        .nest("/auth", auth_routes)
        .nest("/organizations", organization_routes)
        .nest("/projects", project_routes)
        .nest("/issues", issue_routes);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/version", get(health::version))
        .nest("/api", ingest_routes)
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(correlation_id_layer())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

async fn handle_timeout(err: BoxError) -> StatusCode {
    if err.is::<tower::timeout::error::Elapsed>() {
        StatusCode::REQUEST_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
