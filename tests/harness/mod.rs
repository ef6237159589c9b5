// SPDX-FileCopyrightText: 2026 Who's on Pole contributors
// SPDX-License-Identifier: Apache-2.0

//! Test harness for brute-force simulation against the auth rate limiter.
//!
//! Provides attack pattern configurations, key/endpoint generators and
//! outcome metrics used to validate the throttling controls.

pub mod attacks;
pub mod generators;
pub mod metrics;
