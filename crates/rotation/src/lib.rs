//! Duty rotation engine.
//!
//! This crate provides:
//! - `RotationRule` parsing for the persisted rule strings
//! - Window arithmetic (`next_window`, `initial_window`)
//! - An id-indexed `Roster` for round robin
//! - `RotationAdvancer`, the catch-up loop over missed periods
//! - `ManualReassigner` for out-of-band overrides
//! - Collaborator traits plus an in-memory store

pub mod advancer;
pub mod memory;
pub mod ports;
pub mod reassign;
pub mod roster;
pub mod rule;
pub mod window;

pub use advancer::{
    catch_up, AdvanceOutcome, AdvanceStatus, CatchUpReport, DutyPassResult, RotationAdvancer,
    DEFAULT_MAX_ITERATIONS,
};
pub use memory::InMemoryStore;
pub use ports::{AssignmentStore, ChangeKind, DutySnapshot, FailureSink, WorkingDayOracle};
pub use reassign::ManualReassigner;
pub use roster::Roster;
pub use rule::RotationRule;
pub use window::{initial_window, last_occurrence, next_window, Window};
