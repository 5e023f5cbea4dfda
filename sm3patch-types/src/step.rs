use serde::{Deserialize, Serialize};

/// How a patch step changes its target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Write a whole file from an embedded template.
    WriteTemplate,
    /// Splice new code around a literal anchor.
    ReplaceAnchor,
    /// Delete every match of a structural pattern.
    RemovePattern,
}

/// Reported outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Applied,
    AlreadyApplied,
    AnchorNotFound,
    PreconditionFailed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Applied and already-applied both leave the file in its patched state.
    pub fn is_success(self) -> bool {
        matches!(self, StepStatus::Applied | StepStatus::AlreadyApplied)
    }

    pub fn label(self) -> &'static str {
        match self {
            StepStatus::Applied => "applied",
            StepStatus::AlreadyApplied => "already applied",
            StepStatus::AnchorNotFound => "anchor not found",
            StepStatus::PreconditionFailed => "precondition failed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl StepKind {
    pub fn label(self) -> &'static str {
        match self {
            StepKind::WriteTemplate => "write_template",
            StepKind::ReplaceAnchor => "replace_anchor",
            StepKind::RemovePattern => "remove_pattern",
        }
    }
}
