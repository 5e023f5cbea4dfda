//! Shared DTOs (schemas-as-code) for the sm3patch workspace.
//!
//! # Design constraints
//! - The run report is written next to the build artifacts and read by scripts.
//! - Prefer adding optional fields over changing semantics.

pub mod report;
pub mod step;

/// Schema identifiers.
pub mod schema {
    pub const SM3PATCH_RUN_V1: &str = "sm3patch.run.v1";
}
