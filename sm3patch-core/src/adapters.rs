//! Default process-backed port implementations.

use crate::ports::{BuildPort, CommandOutcome, ProcessLine, VcsPort};
use crate::process::run_streaming;
use anyhow::Context;
use camino::Utf8Path;
use std::process::Command;

/// `git checkout .` followed by `git checkout <revision>`.
#[derive(Debug, Clone, Default)]
pub struct GitVcsPort;

impl VcsPort for GitVcsPort {
    fn restore_baseline(
        &self,
        repo_root: &Utf8Path,
        revision: &str,
        on_line: &mut dyn FnMut(ProcessLine),
    ) -> anyhow::Result<CommandOutcome> {
        let discard = run_streaming(
            Command::new("git")
                .args(["checkout", "."])
                .current_dir(repo_root),
            on_line,
        )?;
        if !discard.success {
            return Ok(discard);
        }

        run_streaming(
            Command::new("git")
                .args(["checkout", revision])
                .current_dir(repo_root),
            on_line,
        )
    }
}

/// Runs a configured build command line from the target tree root.
#[derive(Debug, Clone)]
pub struct CommandBuildPort {
    command: Vec<String>,
}

impl CommandBuildPort {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl BuildPort for CommandBuildPort {
    fn build(
        &self,
        repo_root: &Utf8Path,
        on_line: &mut dyn FnMut(ProcessLine),
    ) -> anyhow::Result<CommandOutcome> {
        let (program, args) = self
            .command
            .split_first()
            .context("build command is empty")?;
        run_streaming(
            Command::new(program).args(args).current_dir(repo_root),
            on_line,
        )
    }
}
