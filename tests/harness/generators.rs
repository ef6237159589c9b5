// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for attack simulation.

/// Generate a pool of client keys shaped like forwarded addresses.
pub fn generate_client_keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = (i >> 16) & 0xFF;
            let b = (i >> 8) & 0xFF;
            let c = i & 0xFF;
            format!("10.{a}.{b}.{c}")
        })
        .collect()
}

/// Generate a pool of protected endpoint names.
pub fn generate_endpoints(count: usize) -> Vec<String> {
    const NAMES: &[&str] = &["login", "signup", "password-reset", "magic-link"];
    (0..count)
        .map(|i| {
            if i < NAMES.len() {
                NAMES[i].to_string()
            } else {
                format!("{}-{}", NAMES[i % NAMES.len()], i / NAMES.len())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_client_keys_unique() {
        let keys = generate_client_keys(256);
        assert_eq!(keys.len(), 256);
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_endpoints_unique() {
        let endpoints = generate_endpoints(10);
        assert_eq!(endpoints.len(), 10);
        let unique: std::collections::HashSet<_> = endpoints.iter().collect();
        assert_eq!(unique.len(), 10);
        assert_eq!(endpoints[0], "login");
    }
}
