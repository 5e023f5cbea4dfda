use crate::step::{StepKind, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Machine-readable record of one `sm3patch` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub target: TargetInfo,
    pub run: RunInfo,

    #[serde(default)]
    pub steps: Vec<StepRecord>,

    #[serde(default)]
    pub cleans: Vec<CleanRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildRecord>,

    pub summary: RunSummary,
    pub verdict: Verdict,
}

impl RunReport {
    pub fn new(tool: ToolInfo, target: TargetInfo, dry_run: bool) -> Self {
        Self {
            schema: crate::schema::SM3PATCH_RUN_V1.to_string(),
            tool,
            target,
            run: RunInfo {
                started_at: Utc::now(),
                ended_at: None,
                dry_run,
            },
            steps: vec![],
            cleans: vec![],
            build: None,
            summary: RunSummary::default(),
            verdict: Verdict::default(),
        }
    }

    /// Recompute `summary` and `verdict` from the recorded steps, cleans and build.
    pub fn finish(&mut self, aborted: bool) {
        let mut summary = RunSummary {
            steps_total: self.steps.len() as u64,
            aborted,
            ..RunSummary::default()
        };
        for step in &self.steps {
            match step.status {
                StepStatus::Applied => summary.applied += 1,
                StepStatus::AlreadyApplied => summary.already_applied += 1,
                StepStatus::AnchorNotFound => summary.anchor_not_found += 1,
                StepStatus::PreconditionFailed | StepStatus::Failed => summary.failed += 1,
                StepStatus::Skipped => summary.skipped += 1,
            }
        }

        let mut reasons = Vec::new();
        if aborted {
            reasons.push("run aborted".to_string());
        }
        if summary.failed > 0 {
            reasons.push(format!("{} step(s) failed", summary.failed));
        }
        let build_failed = self.build.as_ref().is_some_and(|b| !b.success);
        if build_failed {
            reasons.push("build failed".to_string());
        }
        let fail = !reasons.is_empty();

        if summary.anchor_not_found > 0 {
            reasons.push(format!(
                "{} anchor(s) not found; tree may not be at the baseline",
                summary.anchor_not_found
            ));
        }
        let clean_failures = self.cleans.iter().filter(|c| !c.success).count();
        if clean_failures > 0 {
            reasons.push(format!("{clean_failures} clean(s) failed"));
        }

        let status = if fail {
            VerdictStatus::Fail
        } else if reasons.is_empty() {
            VerdictStatus::Pass
        } else {
            VerdictStatus::Warn
        };

        self.summary = summary;
        self.verdict = Verdict { status, reasons };
        self.run.ended_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Target tree root.
    pub source: String,
    /// Npgsql version tag requested on the command line.
    pub version: String,
    /// Revision the tree is reset to before and after patching.
    pub baseline: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_id: String,
    pub title: String,
    pub kind: StepKind,
    pub path: String,
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanPhase {
    BeforePatch,
    AfterBuild,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanRecord {
    pub phase: CleanPhase,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    pub success: bool,

    #[serde(default)]
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps_total: u64,
    pub applied: u64,
    pub already_applied: u64,
    pub anchor_not_found: u64,
    pub failed: u64,
    pub skipped: u64,
    pub aborted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    #[default]
    Pass,
    Warn,
    Fail,
}
