// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Session guard: circuit breaker around the identity provider's session
//! lookup.
//!
//! One guard instance per process, constructed at the composition root.
//! Concurrent callers share a single in-flight lookup, a confirmed-invalid
//! credential stops further provider calls for a cooldown window, and a
//! rate-limit response from the provider triggers a shorter backoff instead
//! of a retry storm.

use crate::clock::Clock;
use crate::config::SessionGuardConfig;
use crate::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// An authenticated session as returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Normalized provider failure: an optional HTTP status plus the message
/// text. Classification works on this shape alone, independent of any
/// transport.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "provider error {}: {}", status, self.message),
            None => write!(f, "provider error: {}", self.message),
        }
    }
}

/// How a provider failure should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The provider is throttling us. Back off briefly.
    RateLimited,
    /// The stored credential is invalid or expired. Open the circuit.
    InvalidCredential,
    /// Anything else. Surface the error, leave the breaker alone.
    Transient,
}

/// Classify a provider failure. Status codes decide first; message
/// substrings are the fallback for providers that bury the condition in
/// the error text.
pub fn classify_failure(failure: &ProviderFailure) -> FailureKind {
    if failure.status == Some(429) {
        return FailureKind::RateLimited;
    }
    let message = failure.message.to_lowercase();
    if message.contains("rate limit") || message.contains("too many requests") {
        return FailureKind::RateLimited;
    }
    if failure.status == Some(400) {
        return FailureKind::InvalidCredential;
    }
    if message.contains("refresh token") || message.contains("refresh_token") {
        return FailureKind::InvalidCredential;
    }
    FailureKind::Transient
}

/// Identity provider port.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Fetch the current session. `Ok(None)` means "not signed in", which
    /// is a healthy outcome, not a failure.
    async fn fetch_session(&self) -> Result<Option<Session>, ProviderFailure>;

    /// Drop locally persisted credentials so a stale or corrupt token is
    /// never resent.
    async fn clear_credentials(&self);
}

/// Errors surfaced to session consumers. Raw provider errors never escape;
/// callers only branch on these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("identity provider is rate limiting, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("session is no longer valid, re-authentication required")]
    SessionInvalid,

    #[error("session lookup failed: {0}")]
    Provider(String),
}

/// Result of a session lookup: a session, no session, or a guard error.
pub type SessionLookup = Result<Option<Session>, SessionError>;

type SharedLookup = Shared<BoxFuture<'static, SessionLookup>>;

#[derive(Debug, Default)]
struct BreakerState {
    invalidated: bool,
    circuit_open_until: Option<DateTime<Utc>>,
    last_rate_limited_at: Option<DateTime<Utc>>,
}

impl BreakerState {
    fn clear(&mut self) {
        self.invalidated = false;
        self.circuit_open_until = None;
        self.last_rate_limited_at = None;
    }
}

/// Process-wide session lookup guard.
pub struct SessionGuard {
    provider: Arc<dyn SessionProvider>,
    clock: Arc<dyn Clock>,
    config: SessionGuardConfig,
    state: Arc<Mutex<BreakerState>>,
    in_flight: tokio::sync::Mutex<Option<SharedLookup>>,
}

impl SessionGuard {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        clock: Arc<dyn Clock>,
        config: SessionGuardConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            config,
            state: Arc::new(Mutex::new(BreakerState::default())),
            in_flight: tokio::sync::Mutex::new(None),
        }
    }

    /// Look up the current session.
    ///
    /// Short-circuits without touching the provider while the circuit is
    /// open or the rate-limit backoff is running. Otherwise all callers
    /// that arrive while a lookup is pending await the same future and
    /// observe the identical outcome.
    pub async fn session(&self) -> SessionLookup {
        let now = self.clock.now();

        if let Some(short_circuit) = self.short_circuit(now) {
            metrics::SESSION_SHORT_CIRCUITS.inc();
            return Err(short_circuit);
        }

        let (lookup, initiated) = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) => (pending.clone(), false),
                None => {
                    let lookup = self.start_lookup();
                    *slot = Some(lookup.clone());
                    (lookup, true)
                }
            }
        };

        let outcome = lookup.await;
        if initiated {
            *self.in_flight.lock().await = None;
        }
        outcome
    }

    /// Sign-in succeeded elsewhere: resume normal lookups immediately
    /// without waiting out any window.
    pub fn reset(&self) {
        debug!("session guard reset");
        self.state.lock().unwrap().clear();
    }

    fn short_circuit(&self, now: DateTime<Utc>) -> Option<SessionError> {
        let state = self.state.lock().unwrap();

        if state.invalidated {
            if let Some(until) = state.circuit_open_until {
                if now < until {
                    debug!(until = %until, "session circuit open, short-circuiting");
                    return Some(SessionError::SessionInvalid);
                }
            }
        }

        if let Some(limited_at) = state.last_rate_limited_at {
            let until = limited_at + self.config.backoff_duration();
            if now < until {
                let millis = (until - now).num_milliseconds().max(0);
                debug!(until = %until, "session lookups backing off after provider 429");
                return Some(SessionError::RateLimited {
                    retry_after_secs: (millis as u64).div_ceil(1000),
                });
            }
        }

        None
    }

    fn start_lookup(&self) -> SharedLookup {
        let provider = self.provider.clone();
        let clock = self.clock.clone();
        let state = self.state.clone();
        let config = self.config.clone();

        async move {
            match provider.fetch_session().await {
                Ok(Some(session)) => {
                    state.lock().unwrap().clear();
                    Ok(Some(session))
                }
                Ok(None) => Ok(None),
                Err(failure) => {
                    let now = clock.now();
                    match classify_failure(&failure) {
                        FailureKind::RateLimited => {
                            warn!(%failure, "identity provider rate limited session lookup");
                            state.lock().unwrap().last_rate_limited_at = Some(now);
                            provider.clear_credentials().await;
                            Err(SessionError::RateLimited {
                                retry_after_secs: config.rate_limit_backoff_secs.max(0) as u64,
                            })
                        }
                        FailureKind::InvalidCredential => {
                            warn!(%failure, "credential rejected, opening session circuit");
                            {
                                let mut state = state.lock().unwrap();
                                state.invalidated = true;
                                state.circuit_open_until = Some(now + config.circuit_window());
                            }
                            provider.clear_credentials().await;
                            Err(SessionError::SessionInvalid)
                        }
                        FailureKind::Transient => {
                            debug!(%failure, "transient session lookup failure");
                            Err(SessionError::Provider(failure.message))
                        }
                    }
                }
            }
        }
        .boxed()
        .shared()
    }
}
