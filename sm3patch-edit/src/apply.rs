use crate::error::{EditResult, PatchError};
use crate::patch::{self, PatchOutcome, Patched};
use crate::preview::render_patch;
use crate::step::{PatchStep, StepAction};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use sha2::{Digest, Sha256};
use sm3patch_templates::TemplateStore;
use sm3patch_types::report::StepRecord;
use sm3patch_types::step::{StepKind, StepStatus};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Compute every step in memory without writing to the target tree.
    pub dry_run: bool,
}

/// Result of running one step against the tree.
#[derive(Debug, Clone)]
pub struct StepApplied {
    pub step_id: String,
    pub title: String,
    pub kind: StepKind,
    pub path: Utf8PathBuf,
    pub status: StepStatus,
    pub message: Option<String>,
    pub sha256_before: Option<String>,
    pub sha256_after: Option<String>,
}

impl StepApplied {
    pub fn changed(&self) -> bool {
        self.sha256_before != self.sha256_after
    }

    pub fn to_record(&self) -> StepRecord {
        StepRecord {
            step_id: self.step_id.clone(),
            title: self.title.clone(),
            kind: self.kind,
            path: self.path.to_string(),
            status: self.status,
            message: self.message.clone(),
            sha256_before: self.sha256_before.clone(),
            sha256_after: self.sha256_after.clone(),
        }
    }
}

/// Applies steps in order against one target tree.
///
/// The session remembers the first-seen content of every file it touches, so a
/// dry run sees the effect of earlier steps and [`PatchSession::patch`] can
/// render the whole change set.
pub struct PatchSession<'a> {
    root: Utf8PathBuf,
    templates: &'a TemplateStore,
    opts: ApplyOptions,
    before: BTreeMap<Utf8PathBuf, Option<String>>,
    current: BTreeMap<Utf8PathBuf, Option<String>>,
}

impl<'a> PatchSession<'a> {
    pub fn new(root: impl Into<Utf8PathBuf>, templates: &'a TemplateStore, opts: ApplyOptions) -> Self {
        Self {
            root: root.into(),
            templates,
            opts,
            before: BTreeMap::new(),
            current: BTreeMap::new(),
        }
    }

    pub fn apply(&mut self, step: &PatchStep) -> EditResult<StepApplied> {
        let rel = step.path.clone();
        let old = self.read(&rel);

        let result = match &step.action {
            StepAction::WriteTemplate { template } => {
                let content = self.templates.get(template)?;
                let outcome = if old.as_deref() == Some(content) {
                    PatchOutcome::AlreadyApplied
                } else {
                    PatchOutcome::Applied
                };
                Ok(Patched {
                    outcome,
                    content: content.to_string(),
                })
            }
            StepAction::ReplaceAnchor {
                marker,
                anchor,
                replacement,
            } => require_content(&rel, old.as_deref())
                .and_then(|text| patch::replace_anchor(text, marker, anchor, replacement)),
            StepAction::RemovePattern { marker, pattern } => require_content(&rel, old.as_deref())
                .and_then(|text| patch::remove_pattern(text, marker, pattern)),
        };

        let (status, mut message, new) = match result {
            Ok(patched) => {
                let status = match patched.outcome {
                    PatchOutcome::Applied => StepStatus::Applied,
                    PatchOutcome::AlreadyApplied => StepStatus::AlreadyApplied,
                };
                (status, None, Some(patched.content))
            }
            Err(PatchError::AnchorNotFound { anchor }) => (
                StepStatus::AnchorNotFound,
                Some(format!(
                    "anchor not found in {}: {}",
                    rel,
                    anchor.lines().next().unwrap_or_default()
                )),
                old.clone(),
            ),
            Err(PatchError::PreconditionFailed { message }) => {
                (StepStatus::PreconditionFailed, Some(message), old.clone())
            }
        };

        // Template writes are unconditional; in-place edits only write when they changed something.
        let must_write = match step.kind() {
            StepKind::WriteTemplate => status.is_success(),
            StepKind::ReplaceAnchor | StepKind::RemovePattern => status == StepStatus::Applied,
        };

        if let (true, Some(content)) = (must_write, new.as_deref()) {
            if self.opts.dry_run {
                debug!(step = step.id.as_str(), path = rel.as_str(), "dry-run: not written");
                message.get_or_insert_with(|| "dry-run: not written".to_string());
            } else {
                self.write(&rel, content)?;
            }
            self.current.insert(rel.clone(), Some(content.to_string()));
        }

        Ok(StepApplied {
            step_id: step.id.clone(),
            title: step.title.clone(),
            kind: step.kind(),
            path: rel,
            status,
            message,
            sha256_before: old.as_deref().map(|s| sha256_hex(s.as_bytes())),
            sha256_after: new.as_deref().map(|s| sha256_hex(s.as_bytes())),
        })
    }

    /// Unified diff of everything this session changed.
    pub fn patch(&self) -> String {
        render_patch(&self.before, &self.current)
    }

    fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }

    fn read(&mut self, rel: &Utf8Path) -> Option<String> {
        if let Some(content) = self.current.get(rel) {
            return content.clone();
        }

        let abs = self.abs(rel);
        let content = match fs::read_to_string(&abs) {
            Ok(s) => Some(s),
            Err(e) => {
                debug!(path = abs.as_str(), error = %e, "target file not readable");
                None
            }
        };
        self.before.insert(rel.to_path_buf(), content.clone());
        self.current.insert(rel.to_path_buf(), content.clone());
        content
    }

    fn write(&self, rel: &Utf8Path, content: &str) -> anyhow::Result<()> {
        let abs = self.abs(rel);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create parent dir for {}", abs))?;
        }
        fs::write(&abs, content).with_context(|| format!("write {}", abs))
    }
}

/// Apply a single step outside of a longer session.
pub fn apply_step(
    root: &Utf8Path,
    step: &PatchStep,
    templates: &TemplateStore,
    opts: &ApplyOptions,
) -> EditResult<StepApplied> {
    PatchSession::new(root, templates, opts.clone()).apply(step)
}

fn require_content<'c>(rel: &Utf8Path, content: Option<&'c str>) -> Result<&'c str, PatchError> {
    match content {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(PatchError::PreconditionFailed {
            message: format!(
                "{} file is empty or not found.",
                rel.file_name().unwrap_or(rel.as_str())
            ),
        }),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
