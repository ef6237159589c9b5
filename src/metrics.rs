// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the auth guard.

use lazy_static::lazy_static;
use prometheus::{register_counter, Counter, Encoder, TextEncoder};

lazy_static! {
    pub static ref CHECKS_ALLOWED: Counter = register_counter!(
        "auth_rate_limit_allowed_total",
        "Requests allowed by the rate limiter"
    )
    .unwrap();
    pub static ref CHECKS_REJECTED: Counter = register_counter!(
        "auth_rate_limit_rejected_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref CHECKS_DEGRADED: Counter = register_counter!(
        "auth_rate_limit_degraded_total",
        "Checks that failed open because the counter store was unavailable"
    )
    .unwrap();
    pub static ref SESSION_SHORT_CIRCUITS: Counter = register_counter!(
        "auth_session_short_circuits_total",
        "Session lookups answered by the open circuit breaker without a provider call"
    )
    .unwrap();
}

/// Render the default registry in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
