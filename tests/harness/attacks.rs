// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: Apache-2.0

//! Attack patterns simulated against the login rate limiter.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of check calls to issue
    pub total_requests: usize,
    /// Number of unique client keys to simulate
    pub unique_clients: usize,
    /// Number of unique endpoints to spread requests across
    pub unique_endpoints: usize,
    /// Whether the counter store stays healthy during the attack
    pub store_healthy: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_clients: 1,
            unique_endpoints: 1,
            store_healthy: true,
        }
    }
}

impl AttackConfig {
    /// One client hammering the login endpoint.
    pub fn single_client_brute_force() -> Self {
        Self {
            total_requests: 200,
            ..Default::default()
        }
    }

    /// Credential stuffing: many clients, each probing a shared endpoint.
    pub fn credential_stuffing() -> Self {
        Self {
            total_requests: 1000,
            unique_clients: 100,
            ..Default::default()
        }
    }

    /// One client rotating across endpoints to dodge a per-endpoint limit.
    pub fn endpoint_rotation() -> Self {
        Self {
            total_requests: 40,
            unique_endpoints: 4,
            ..Default::default()
        }
    }

    /// Attack arriving while the counter store is down.
    pub fn store_outage() -> Self {
        Self {
            total_requests: 50,
            unique_clients: 5,
            store_healthy: false,
            ..Default::default()
        }
    }
}
