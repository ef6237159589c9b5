// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Auth Rate Limiter Service
//!
//! Throttles sensitive authentication endpoints (login, signup) to a fixed
//! number of requests per window per client. Browser clients call the check
//! endpoint before submitting credentials; a limiter or store outage is
//! surfaced as a warning, never as a blocked request.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_MAX_REQUESTS`: Max requests per window (default: 5)
//! - `RATE_LIMIT_WINDOW_SECS`: Window duration in seconds (default: 900)
//! - `RATE_LIMIT_CLEANUP_INTERVAL`: Checks between cleanup sweeps (default: 100)
//! - `SESSION_BACKOFF_SECS`: Backoff after a provider 429 (default: 30)
//! - `SESSION_CIRCUIT_WINDOW_SECS`: Circuit breaker window (default: 300)

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use auth_rate_limiter::{
    clock::SystemClock,
    config::Config,
    handlers::{check_rate_limit, health, metrics_text, AppState},
    limiter::RateLimiter,
    store::{MemoryStore, RateLimitStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests_per_window,
        window_secs = config.rate_limit.window_secs,
        cleanup_interval = config.rate_limit.cleanup_interval,
        "Starting auth rate limiter"
    );

    // Create application state. The in-memory store backs a single
    // instance; multi-instance deployments substitute a shared store
    // implementing the same port.
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let clock = Arc::new(SystemClock);
    let limiter = RateLimiter::new(
        config.rate_limit.clone(),
        store.clone() as Arc<dyn RateLimitStore>,
        clock.clone(),
    );

    let state = Arc::new(AppState {
        limiter,
        clock: clock.clone(),
        config: config.clone(),
    });

    // Spawn periodic cleanup task alongside the limiter's opportunistic
    // every-Nth-check sweep.
    let cleanup_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            match cleanup_store.delete_expired(chrono::Utc::now()).await {
                Ok(deleted) if deleted > 0 => {
                    info!(deleted, "expired rate limit records removed")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "periodic rate limit cleanup failed"),
            }
        }
    });

    // Build router
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/auth/rate-limit", post(check_rate_limit));

    if config.metrics.enabled {
        app = app.route(&config.metrics.path, get(metrics_text));
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        rate_limit: auth_rate_limiter::config::RateLimitConfig {
            max_requests_per_window: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
            cleanup_interval: std::env::var("RATE_LIMIT_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        },
        session: auth_rate_limiter::config::SessionGuardConfig {
            rate_limit_backoff_secs: std::env::var("SESSION_BACKOFF_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            circuit_breaker_window_secs: std::env::var("SESSION_CIRCUIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        },
        ..Default::default()
    }
}
