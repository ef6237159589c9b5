// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Auth guard for Who's on Pole.
//!
//! Two small, independent protection policies for the authentication path:
//!
//! - A storage-backed fixed-window rate limiter for sensitive endpoints
//!   (login/signup), 5 requests per 15-minute window per client and
//!   endpoint, failing open when the counter store is unhealthy.
//! - A per-process session guard that coalesces concurrent session lookups
//!   into one provider call and opens a circuit breaker after an
//!   unrecoverable credential failure or a provider rate-limit response.
//!
//! The limiter is exposed over HTTP by the service binary; the session
//! guard is a library component consumed wherever "the current session" is
//! needed.

pub mod clock;
pub mod config;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod session;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use limiter::{RateLimitDecision, RateLimiter};
pub use session::{SessionError, SessionGuard, SessionProvider};
pub use store::{MemoryStore, RateLimitRecord, RateLimitStore};
