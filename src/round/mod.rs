//! Round Engine.
//!
//! Creates successive rounds, assigns beneficiaries by rotation, tracks
//! per-participant payment state, detects lateness, and propagates settled
//! totals to the owning group.

pub mod engine;
pub mod types;

pub use engine::RoundEngine;
pub use types::{Beneficiary, Participant, PaymentStatus, Round, RoundStats, RoundStatus};
