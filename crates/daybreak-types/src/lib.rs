//! Shared domain types for Daybreak.
//!
//! This crate contains the types used across the Daybreak assistant core:
//! user sessions, forecast samples and cache entries, configuration, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, chrono-tz, thiserror.

pub mod config;
pub mod error;
pub mod session;
pub mod weather;
