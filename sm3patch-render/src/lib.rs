//! Rendering helpers for console output and human-readable artifacts.
//!
//! Nothing here writes to a terminal. Console lines are returned as
//! [`ConsoleRecord`]s and coloured by the binary.

mod console;
mod markdown;

pub use console::{ConsoleRecord, RecordLevel};
pub use markdown::render_run_md;
