use anyhow::Context;
use camino::Utf8PathBuf;
use regex::Regex;
use sm3patch_types::step::StepKind;

/// One ordered transformation of the target tree.
#[derive(Debug, Clone)]
pub struct PatchStep {
    pub id: String,
    pub title: String,
    /// Relative to the target tree root.
    pub path: Utf8PathBuf,
    pub action: StepAction,
}

#[derive(Debug, Clone)]
pub enum StepAction {
    /// Overwrite the file with a packaged template.
    WriteTemplate { template: String },

    /// Literal anchor-replace guarded by an idempotency marker.
    ReplaceAnchor {
        marker: String,
        anchor: String,
        replacement: String,
    },

    /// Structural removal; `marker` disappearing means the step is done.
    RemovePattern { marker: String, pattern: Regex },
}

impl PatchStep {
    pub fn write_template(
        id: impl Into<String>,
        title: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            path: path.into(),
            action: StepAction::WriteTemplate {
                template: template.into(),
            },
        }
    }

    pub fn replace_anchor(
        id: impl Into<String>,
        title: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
        marker: impl Into<String>,
        anchor: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            path: path.into(),
            action: StepAction::ReplaceAnchor {
                marker: marker.into(),
                anchor: anchor.into(),
                replacement: replacement.into(),
            },
        }
    }

    pub fn remove_pattern(
        id: impl Into<String>,
        title: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
        marker: impl Into<String>,
        pattern: &str,
    ) -> anyhow::Result<Self> {
        let pattern = Regex::new(pattern).with_context(|| format!("compile pattern {pattern}"))?;
        Ok(Self {
            id: id.into(),
            title: title.into(),
            path: path.into(),
            action: StepAction::RemovePattern {
                marker: marker.into(),
                pattern,
            },
        })
    }

    pub fn kind(&self) -> StepKind {
        match self.action {
            StepAction::WriteTemplate { .. } => StepKind::WriteTemplate,
            StepAction::ReplaceAnchor { .. } => StepKind::ReplaceAnchor,
            StepAction::RemovePattern { .. } => StepKind::RemovePattern,
        }
    }

    pub fn template_name(&self) -> Option<&str> {
        match &self.action {
            StepAction::WriteTemplate { template } => Some(template.as_str()),
            _ => None,
        }
    }
}
