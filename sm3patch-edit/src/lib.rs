//! Patch engine for sm3patch steps.
//!
//! Responsibilities:
//! - Pure anchor-replace and pattern-removal functions with typed outcomes.
//! - Apply ordered steps to a target tree (or to memory, for a dry run).
//! - Generate a unified diff preview.

mod apply;
mod error;
mod patch;
mod preview;
mod step;

pub use apply::{ApplyOptions, PatchSession, StepApplied, apply_step, sha256_hex};
pub use error::{EditError, EditResult, PatchError};
pub use patch::{PatchOutcome, Patched, remove_pattern, replace_anchor};
pub use preview::render_patch;
pub use step::{PatchStep, StepAction};
