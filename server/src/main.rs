//! gtfo: GitHub Token Factory (OIDC) server
//!
//! Lightweight HTTP server using hyper on a multi-threaded tokio runtime.
//! Each connection is served on its own task; SIGINT or SIGTERM stops
//! accepting and lets open connections finish.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use gtfo_core::config::Config;
use gtfo_core::error::{ApiError, Result};
use gtfo_core::github::Clients;
use gtfo_core::oidc::new_verifier;
use gtfo_core::platform::{Clock, HttpClient};
use gtfo_core::policy::AuthorizationEngine;
use gtfo_core::sts::{Issuer, TokenService};

mod platform;
mod routes;

use platform::{ProcessEnv, ReqwestHttpClient, SystemClock};
use routes::{handle_request, AppState};

/// How long open connections get to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gtfo exited");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::load(&ProcessEnv)?;
    let state = Arc::new(build_state(&config)?);

    let listener = TcpListener::bind(&config.addr)
        .await
        .map_err(|e| ApiError::internal(format!("failed to bind {}: {}", config.addr, e)))?;
    info!(
        addr = %config.addr,
        issuers = ?config.issuers,
        owner_repo = %config.checker.rego.owner_repo,
        from_repos = config.checker.rego.from_repos,
        "gtfo listening"
    );

    serve(listener, state).await;
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let verifier = new_verifier(
        &config.issuers,
        config.audience.clone(),
        http.clone(),
        clock.clone(),
    )?;
    let clients = Arc::new(Clients::new(
        config.github.clone(),
        http.clone(),
        clock.clone(),
    ));
    let engine = AuthorizationEngine::new(clients.clone(), config.checker.rego.clone());
    let service = TokenService::new(verifier, engine, Issuer::new(clients));

    Ok(AppState::new(service, http))
}

async fn serve(listener: TcpListener, state: Arc<AppState>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                debug!(%peer, "accepted connection");

                let state = state.clone();
                let mut shutdown_rx = shutdown_rx.clone();
                connections.spawn(async move {
                    let service = service_fn(move |req| handle_request(req, state.clone()));
                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    tokio::pin!(conn);

                    tokio::select! {
                        result = conn.as_mut() => {
                            if let Err(e) = result {
                                debug!(error = %e, "connection error");
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            conn.as_mut().graceful_shutdown();
                            if let Err(e) = conn.await {
                                debug!(error = %e, "connection error during shutdown");
                            }
                        }
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    drop(listener);
    let _ = shutdown_tx.send(true);

    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("connections still open after grace period");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
