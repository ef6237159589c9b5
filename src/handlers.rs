// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the auth guard service.
//!
//! The check endpoint is called directly by browser clients before they
//! submit a login or signup attempt. It answers 429 with retry guidance
//! once a client has exhausted its window, and degrades to a 200 with a
//! `warning` field when the counter store is unhealthy so a limiter outage
//! never blocks authentication.

use crate::clock::Clock;
use crate::config::Config;
use crate::limiter::{LimiterError, RateLimiter};
use crate::metrics;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
}

/// Rate limit check request body.
#[derive(Debug, Deserialize)]
pub struct RateLimitCheckRequest {
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Successful (allowed) check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitCheckResponse {
    pub success: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Rejected (429) check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRejectedResponse {
    pub error: String,
    pub retry_after: u64,
    pub reset_at: DateTime<Utc>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "auth-rate-limiter",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics_text() -> String {
    metrics::render()
}

/// Check and consume one request from the caller's window for an endpoint.
pub async fn check_rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<RateLimitCheckRequest>>,
) -> Response {
    let endpoint = body
        .as_ref()
        .and_then(|Json(req)| req.endpoint.as_deref())
        .unwrap_or("")
        .trim()
        .to_owned();

    if endpoint.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Endpoint is required".to_string(),
            }),
        )
            .into_response();
    }

    let client_key = resolve_client_key(&headers, Some(addr.ip()));
    debug!(client_key = %client_key, endpoint = %endpoint, "processing rate limit check");

    let decision = match state.limiter.check_and_consume(&client_key, &endpoint).await {
        Ok(decision) => decision,
        Err(LimiterError::InvalidRequest) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Endpoint is required".to_string(),
                }),
            )
                .into_response();
        }
    };

    if decision.allowed {
        if decision.degraded.is_some() {
            metrics::CHECKS_DEGRADED.inc();
        } else {
            metrics::CHECKS_ALLOWED.inc();
        }
        let limit = state.config.rate_limit.max_requests_per_window;
        (
            StatusCode::OK,
            [
                ("X-RateLimit-Limit", limit.to_string()),
                ("X-RateLimit-Remaining", decision.remaining.to_string()),
                ("X-RateLimit-Reset", decision.reset_at.to_rfc3339()),
            ],
            Json(RateLimitCheckResponse {
                success: true,
                remaining: decision.remaining,
                reset_at: decision.reset_at,
                warning: decision.degraded,
            }),
        )
            .into_response()
    } else {
        metrics::CHECKS_REJECTED.inc();
        let retry_after = decision.retry_after_secs(state.clock.now());
        info!(
            client_key = %client_key,
            endpoint = %endpoint,
            retry_after,
            "request rate limited"
        );
        (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", retry_after.to_string())],
            Json(RateLimitRejectedResponse {
                error: "Too many requests. Please try again later.".to_string(),
                retry_after,
                reset_at: decision.reset_at,
            }),
        )
            .into_response()
    }
}

/// Resolve the stable caller identifier: first entry of `x-forwarded-for`,
/// else the peer address, else the literal `"unknown"`.
pub fn resolve_client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    match peer {
        Some(ip) => ip.to_string(),
        None => "unknown".to_string(),
    }
}
