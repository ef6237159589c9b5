// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter backed by a shared counter store.
//!
//! One counter row per `(client_key, endpoint)` pair. The counter resets
//! entirely at the window boundary rather than sliding. Rejected requests
//! are not counted against the window, and any store failure is translated
//! into an allowed decision: the limiter must never become the reason login
//! itself is down.

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::store::{RateLimitRecord, RateLimitStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Outcome of a rate limit check.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// When the current window ends.
    pub reset_at: DateTime<Utc>,
    /// Set when the store failed and the decision is a fail-open estimate.
    pub degraded: Option<String>,
}

impl RateLimitDecision {
    /// Whole seconds until `reset_at`, rounded up. Zero once the window has
    /// passed.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis as u64).div_ceil(1000)
        }
    }
}

/// Caller-side misuse of the limiter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("endpoint is required")]
    InvalidRequest,
}

/// Storage-backed fixed-window rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    calls: AtomicU64,
}

impl RateLimiter {
    pub fn new(
        config: RateLimitConfig,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            calls: AtomicU64::new(0),
        }
    }

    /// Check the limit for a `(client_key, endpoint)` pair and consume one
    /// request from the window if allowed.
    ///
    /// A single store round trip each for read and write, no retries. A
    /// rejected request never mutates the stored counter. Concurrent
    /// writers racing on the same pair resolve last-write-wins through the
    /// store's upsert, which can under-count by one request; accepted for a
    /// soft limit.
    pub async fn check_and_consume(
        &self,
        client_key: &str,
        endpoint: &str,
    ) -> Result<RateLimitDecision, LimiterError> {
        if endpoint.trim().is_empty() {
            return Err(LimiterError::InvalidRequest);
        }

        self.maybe_schedule_cleanup();

        let now = self.clock.now();
        let max = self.config.max_requests_per_window;

        let existing = match self.store.get(client_key, endpoint).await {
            Ok(record) => record,
            Err(e) => return Ok(self.fail_open(client_key, endpoint, now, &e)),
        };

        // A record whose window ends exactly now is already expired; the
        // active-window comparison is strict.
        if let Some(record) = existing {
            if record.window_expires_at > now {
                if record.request_count >= max {
                    debug!(
                        client_key,
                        endpoint,
                        reset_at = %record.window_expires_at,
                        "rate limit exceeded"
                    );
                    return Ok(RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: record.window_expires_at,
                        degraded: None,
                    });
                }

                let updated = RateLimitRecord {
                    request_count: record.request_count + 1,
                    updated_at: Some(now),
                    ..record
                };
                let remaining = max.saturating_sub(updated.request_count);
                let reset_at = updated.window_expires_at;

                return match self.store.upsert(updated).await {
                    Ok(()) => Ok(RateLimitDecision {
                        allowed: true,
                        remaining,
                        reset_at,
                        degraded: None,
                    }),
                    Err(e) => Ok(self.fail_open(client_key, endpoint, now, &e)),
                };
            }
        }

        // No record, or the stored window has expired: start a fresh one.
        let reset_at = now + self.config.window_duration();
        let record = RateLimitRecord {
            client_key: client_key.to_owned(),
            endpoint: endpoint.to_owned(),
            request_count: 1,
            window_expires_at: reset_at,
            updated_at: Some(now),
        };

        match self.store.upsert(record).await {
            Ok(()) => Ok(RateLimitDecision {
                allowed: true,
                remaining: max.saturating_sub(1),
                reset_at,
                degraded: None,
            }),
            Err(e) => Ok(self.fail_open(client_key, endpoint, now, &e)),
        }
    }

    /// The store is unhealthy: log and allow. Availability of login wins
    /// over strict enforcement.
    fn fail_open(
        &self,
        client_key: &str,
        endpoint: &str,
        now: DateTime<Utc>,
        error: &StoreError,
    ) -> RateLimitDecision {
        warn!(
            client_key,
            endpoint,
            error = %error,
            "rate limit store unavailable, failing open"
        );
        RateLimitDecision {
            allowed: true,
            remaining: self.config.max_requests_per_window.saturating_sub(1),
            reset_at: now + self.config.window_duration(),
            degraded: Some(error.to_string()),
        }
    }

    /// Every `cleanup_interval`-th check kicks off a sweep of expired rows.
    /// Fire-and-forget: the sweep runs detached and only logs its outcome.
    fn maybe_schedule_cleanup(&self) {
        let interval = self.config.cleanup_interval;
        if interval == 0 {
            return;
        }
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % interval != 0 {
            return;
        }

        let store = self.store.clone();
        let cutoff = self.clock.now();
        tokio::spawn(async move {
            match store.delete_expired(cutoff).await {
                Ok(deleted) => debug!(deleted, "expired rate limit records swept"),
                Err(e) => warn!(error = %e, "rate limit cleanup sweep failed"),
            }
        });
    }
}
