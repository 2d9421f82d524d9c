//! Quiz Night Back binary entrypoint wiring the REST engine and its storage.

use std::{env, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::{bank::MemoryQuestionBank, store::memory::MemoryGameStore};
use state::{AppState, SharedState};

/// Default location on disk where the server looks for the question bank.
const DEFAULT_BANK_PATH: &str = "config/question_bank.json";
/// Environment variable that overrides [`DEFAULT_BANK_PATH`].
const BANK_PATH_ENV: &str = "QUIZ_NIGHT_BANK_PATH";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    app_state
        .install_store(Arc::new(MemoryGameStore::new()))
        .await;

    tokio::spawn(run_bank_supervisor(app_state.clone(), resolve_bank_path()));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Supervises question bank loading by retrying in the background, so a
/// missing or malformed bank file keeps the server up in degraded mode
/// until the file is fixed in place.
async fn run_bank_supervisor(state: SharedState, path: PathBuf) {
    let initial_delay_ms = 1000;
    let mut delay = Duration::from_millis(initial_delay_ms);
    let max_delay = Duration::from_secs(10);

    loop {
        match MemoryQuestionBank::load_from_path(&path) {
            Ok(bank) => {
                info!(
                    path = %path.display(),
                    questions = bank.len(),
                    "question bank loaded; leaving degraded mode"
                );
                state.install_bank(Arc::new(bank)).await;
                return;
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "question bank load failed; retrying"
                );
                sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
        }
    }
}

/// Resolve the question bank path taking the environment override into account.
fn resolve_bank_path() -> PathBuf {
    env::var_os(BANK_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BANK_PATH))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
