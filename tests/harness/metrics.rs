// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: Apache-2.0

//! Outcome collection for attack simulation runs.

use std::collections::HashMap;

/// Possible outcomes for a simulated check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    RateLimited,
    FailedOpen,
}

/// Collects outcomes during an attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    outcomes: HashMap<Outcome, usize>,
    allowed_per_client: HashMap<String, usize>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one check outcome.
    pub fn record(&mut self, outcome: Outcome, client_key: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if outcome != Outcome::RateLimited {
            *self
                .allowed_per_client
                .entry(client_key.to_string())
                .or_insert(0) += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Ratio of rejected requests to total.
    pub fn block_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(Outcome::RateLimited) as f64 / total as f64
    }

    /// Largest number of requests any single client got through.
    pub fn max_allowed_for_one_client(&self) -> usize {
        self.allowed_per_client.values().copied().max().unwrap_or(0)
    }

    pub fn report(&self) -> String {
        format!(
            "=== Attack Report ===\n\
             Total:        {}\n\
             Allowed:      {}\n\
             Rate limited: {}\n\
             Failed open:  {}\n\
             Block rate:   {:.1}%\n\
             Max allowed for one client: {}",
            self.total(),
            self.count(Outcome::Allowed),
            self.count(Outcome::RateLimited),
            self.count(Outcome::FailedOpen),
            self.block_rate() * 100.0,
            self.max_allowed_for_one_client(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();
        metrics.record(Outcome::Allowed, "10.0.0.1");
        metrics.record(Outcome::Allowed, "10.0.0.1");
        metrics.record(Outcome::RateLimited, "10.0.0.1");

        assert_eq!(metrics.total(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.max_allowed_for_one_client(), 2);
        assert!((metrics.block_rate() - 1.0 / 3.0).abs() < 0.01);
    }
}
