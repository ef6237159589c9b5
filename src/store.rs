// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Persistence port for rate limit counters.
//!
//! The limiter holds one row per `(client_key, endpoint)` pair in a shared
//! store so the limit survives process restarts and holds across instances.
//! [`MemoryStore`] is the single-instance backend used by the binary and the
//! tests; a shared database backend implements the same trait in
//! multi-instance deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Persisted counter row. At most one per `(client_key, endpoint)` pair;
/// the pair is the upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Stable identifier for the caller (forwarded address or peer address).
    pub client_key: String,
    /// Logical name of the protected operation ("login", "signup", ...).
    pub endpoint: String,
    /// Requests observed inside the current window. Always >= 1.
    pub request_count: u32,
    /// End of the current fixed window.
    pub window_expires_at: DateTime<Utc>,
    /// Last mutation time. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Store-level failure. The limiter never propagates this to callers; it
/// fails open instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
}

/// Repository port for rate limit persistence.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Fetch the record for a key pair, if one exists.
    async fn get(
        &self,
        client_key: &str,
        endpoint: &str,
    ) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Insert or replace the record for its key pair. Last write wins;
    /// concurrent writers racing on the same pair may under-count by one
    /// request, which the limiter accepts as a soft-limit relaxation.
    async fn upsert(&self, record: RateLimitRecord) -> Result<(), StoreError>;

    /// Remove records whose window expired before `before`. Returns the
    /// number of rows removed.
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// In-memory store backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), RateLimitRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records. Used by cleanup logging and tests.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(
        &self,
        client_key: &str,
        endpoint: &str,
    ) -> Result<Option<RateLimitRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .get(&(client_key.to_owned(), endpoint.to_owned()))
            .cloned())
    }

    async fn upsert(&self, record: RateLimitRecord) -> Result<(), StoreError> {
        let key = (record.client_key.clone(), record.endpoint.clone());
        let mut records = self.records.write().await;
        records.insert(key, record);
        Ok(())
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let initial = records.len();
        records.retain(|_, record| record.window_expires_at >= before);
        Ok((initial - records.len()) as u64)
    }
}
