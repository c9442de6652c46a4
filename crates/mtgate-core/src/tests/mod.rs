//! Test module for mtgate-core
//!
//! This module contains tests for:
//! - Service unit parsing, rendering, and round-trips
//! - Coordinator serialization, cooldown, and idempotence
//! - Rate limiting windows
//! - Link generation
//! - Registry persistence and lifecycle
//! - Membership reconciliation flows

mod ratelimit_tests;
mod reconciler_tests;
