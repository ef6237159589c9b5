// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the auth guard service.
//!
//! Defaults match the limits enforced by the production login/signup
//! endpoints: 5 requests per 15-minute window per client and endpoint.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for the auth rate limiter service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Session guard configuration
    #[serde(default)]
    pub session: SessionGuardConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Fixed-window rate limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests allowed per window per (client, endpoint) pair
    /// (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: u32,

    /// Window duration in seconds (default: 900, i.e. 15 minutes)
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,

    /// Every Nth check schedules a best-effort sweep of expired records
    /// (default: 100; 0 disables opportunistic cleanup)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
}

/// Session circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionGuardConfig {
    /// Cooldown after the identity provider returns a rate-limit response,
    /// in seconds (default: 30)
    #[serde(default = "default_rate_limit_backoff_secs")]
    pub rate_limit_backoff_secs: i64,

    /// How long lookups short-circuit after an unrecoverable credential
    /// failure, in seconds (default: 300, i.e. 5 minutes)
    #[serde(default = "default_circuit_window_secs")]
    pub circuit_breaker_window_secs: i64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> i64 {
    900 // 15 minutes
}

fn default_cleanup_interval() -> u64 {
    100
}

fn default_rate_limit_backoff_secs() -> i64 {
    30
}

fn default_circuit_window_secs() -> i64 {
    300 // 5 minutes
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            session: SessionGuardConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl Default for SessionGuardConfig {
    fn default() -> Self {
        Self {
            rate_limit_backoff_secs: default_rate_limit_backoff_secs(),
            circuit_breaker_window_secs: default_circuit_window_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the window duration
    pub fn window_duration(&self) -> Duration {
        Duration::seconds(self.window_secs)
    }
}

impl SessionGuardConfig {
    /// Get the rate limit backoff duration
    pub fn backoff_duration(&self) -> Duration {
        Duration::seconds(self.rate_limit_backoff_secs)
    }

    /// Get the circuit breaker window duration
    pub fn circuit_window(&self) -> Duration {
        Duration::seconds(self.circuit_breaker_window_secs)
    }
}
