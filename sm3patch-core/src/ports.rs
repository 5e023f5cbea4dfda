//! Port traits abstracting the external processes away from the pipeline.

use camino::Utf8Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of child process output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLine {
    pub stream: OutputStream,
    pub text: String,
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// `None` when the process was killed by a signal or never started.
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandOutcome {
    pub fn ok() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
        }
    }

    pub fn failed(exit_code: Option<i32>) -> Self {
        Self {
            exit_code,
            success: false,
        }
    }
}

/// Version control of the target tree.
pub trait VcsPort {
    /// Discard working-tree changes and check out `revision`.
    fn restore_baseline(
        &self,
        repo_root: &Utf8Path,
        revision: &str,
        on_line: &mut dyn FnMut(ProcessLine),
    ) -> anyhow::Result<CommandOutcome>;
}

/// The target tree's build tool.
pub trait BuildPort {
    /// Run a release build from `repo_root`, forwarding output as it arrives.
    fn build(
        &self,
        repo_root: &Utf8Path,
        on_line: &mut dyn FnMut(ProcessLine),
    ) -> anyhow::Result<CommandOutcome>;
}
