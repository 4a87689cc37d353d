//! Process entry point: load configuration, connect to Postgres, assemble
//! the Axum router, and serve with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::Duration;

use vigil_auth::{Keypair, TokenPolicy};
use vigil_core::config::Config;
use vigil_core::environment::SystemClock;
use vigil_storage::{connect, PgIngestRepository, PgIssueRepository, PgTenancyRepository, PgUserRepository};
use vigil_web::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();

    let pool = connect(&config.database).await.context("connecting to postgres")?;

    let keys = match &config.auth.signing_key_pem {
        Some(pem) => Keypair::from_private_pem(pem).context("loading signing key from JWT_SIGNING_KEY_PEM")?,
        None => {
            tracing::warn!("no JWT_SIGNING_KEY_PEM set, generating an ephemeral signing key");
            Keypair::generate().context("generating signing key")?
        }
    };

    let token_policy = TokenPolicy {
        issuer: config.auth.jwt_issuer.clone(),
        access_ttl: Duration::seconds(config.auth.access_token_ttl_secs),
        refresh_ttl: Duration::seconds(config.auth.refresh_token_ttl_secs),
    };

    let state = AppState::new(
        Arc::new(PgTenancyRepository::new(pool.clone())),
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgIssueRepository::new(pool.clone())),
        Arc::new(PgIngestRepository::new(pool)),
        Arc::new(SystemClock),
        Arc::new(keys),
        Arc::new(token_policy),
        Arc::from(config.ingest.dsn_host.as_str()),
    );

    let request_timeout = StdDuration::from_secs(config.server.request_timeout_secs);
    let shutdown_timeout = StdDuration::from_secs(config.server.shutdown_timeout_secs);

    let app = build_router(state, request_timeout);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("parsing bind address")?;
    let listener = tokio::net::TcpListener::bind(addr).await.context("binding listener")?;
    tracing::info!(%addr, "vigil server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await
        .context("server error")?;

    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then gives in-flight requests
/// `shutdown_timeout` to finish draining before forcing an exit — otherwise
/// `axum::serve`'s graceful shutdown would wait indefinitely for a
/// connection that never closes.
async fn shutdown_signal(shutdown_timeout: StdDuration) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received, draining in-flight requests");

    tokio::spawn(async move {
        tokio::time::sleep(shutdown_timeout).await;
        tracing::warn!(?shutdown_timeout, "graceful shutdown deadline exceeded, forcing exit");
        std::process::exit(1);
    });
}
