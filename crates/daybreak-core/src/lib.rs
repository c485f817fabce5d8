//! Time-aware orchestration core for Daybreak.
//!
//! This crate defines the three components the assistant's correctness hangs
//! on -- the per-user session store, the zone-aware job scheduler, and the
//! two-tier forecast cache -- plus the collaborator traits ("ports") the
//! infrastructure layer implements. It depends only on `daybreak-types`,
//! never on HTTP or the filesystem.

pub mod clock;
pub mod orchestrator;
pub mod records;
pub mod schedule;
pub mod sender;
pub mod session;
pub mod weather;
