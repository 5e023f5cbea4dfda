//! Error types for sm3patch-edit.
//!
//! Two layers:
//! - [`PatchError`]: the typed, expected failures of a pure patch function.
//!   The caller decides whether they abort the run.
//! - [`EditError`]: everything else (template lookup, I/O), which always does.

use sm3patch_templates::TemplateError;
use thiserror::Error;

/// Expected failure of a patch function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The locate pattern does not occur in the file. The content is left untouched.
    #[error("anchor not found: {anchor}")]
    AnchorNotFound {
        /// The literal anchor or pattern source that was searched for.
        anchor: String,
    },

    /// The file the step depends on is missing, unreadable or empty.
    #[error("precondition failed: {message}")]
    PreconditionFailed {
        /// Which file, and what was wrong with it.
        message: String,
    },
}

/// Non-recoverable errors while applying a step.
#[derive(Debug, Error)]
pub enum EditError {
    /// A template named by a step is not packaged.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// I/O or other runtime failure.
    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

/// Result type alias using EditError.
pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::{EditError, PatchError};
    use sm3patch_templates::TemplateError;

    #[test]
    fn template_error_names_the_template() {
        let err = EditError::from(TemplateError::NotFound {
            name: "Sm3.cs".to_string(),
        });
        assert!(matches!(err, EditError::Template(_)));
        assert!(err.to_string().contains("Sm3.cs"));
    }

    #[test]
    fn runtime_error_keeps_the_cause() {
        let err = EditError::from(anyhow::anyhow!("boom"));
        assert!(matches!(err, EditError::Runtime(_)));
        assert!(err.to_string().contains("boom"));
        assert!(err.to_string().contains("runtime error"));
    }

    #[test]
    fn patch_error_display_includes_variant() {
        let err = PatchError::AnchorNotFound {
            anchor: "default:".to_string(),
        };
        assert_eq!(err.to_string(), "anchor not found: default:");
    }
}
