//! Orchestration for sm3patch.
//!
//! This crate owns the fixed SM3 step catalog and the run sequence:
//! clean the target tree, apply the steps, build, clean again.
//! External processes sit behind [`ports::VcsPort`] and [`ports::BuildPort`]
//! so the sequence can be driven without git or a .NET SDK.

pub mod adapters;
pub mod build;
pub mod catalog;
pub mod pipeline;
pub mod ports;
pub mod process;
pub mod revert;
pub mod settings;
