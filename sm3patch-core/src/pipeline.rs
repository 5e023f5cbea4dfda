//! The clean → patch → build → clean sequence.

use crate::build::build_and_collect;
use crate::catalog::{self, PatchStage};
use crate::ports::{BuildPort, ProcessLine, VcsPort};
use crate::revert::{self, CleanOutcome};
use crate::settings::{OnFailure, PatchSettings};
use sm3patch_edit::{ApplyOptions, EditError, PatchSession, PatchStep};
use sm3patch_render::ConsoleRecord;
use sm3patch_templates::{TemplateError, TemplateStore};
use sm3patch_types::report::{
    BuildRecord, CleanPhase, CleanRecord, RunReport, StepRecord, TargetInfo, ToolInfo,
};
use sm3patch_types::step::StepStatus;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A packaged template is missing or empty; nothing was touched.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A stage failed under an `Abort` policy. The report covers the run so far.
    #[error("{step_id}: {message}")]
    Aborted {
        step_id: String,
        message: String,
        report: Box<RunReport>,
    },

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::Template(_) => 3,
            ToolError::Aborted { .. } | ToolError::Internal(_) => 1,
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            ToolError::Aborted { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

/// Outcome of a run that reached the end of the sequence.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Unified diff of every change the patch steps made (or would make).
    pub patch: String,
}

impl RunOutcome {
    pub fn build_failed(&self) -> bool {
        self.report.build.as_ref().is_some_and(|b| !b.success)
    }

    pub fn exit_code(&self) -> u8 {
        if self.build_failed() { 1 } else { 0 }
    }
}

const CLEAN_FAILED: &str = "Clean failed, please check the output above.";
const BUILD_FAILED: &str = "Build failed, please check the output above.";
const ARTIFACTS_FAILED: &str = "artifact relocation failed";

/// Run the whole sequence against `settings.source`.
///
/// Progress goes to `sink` as console records; the caller decides how to
/// present them. Report files are the caller's business too.
pub fn run_patch(
    settings: &PatchSettings,
    templates: &TemplateStore,
    vcs: &dyn VcsPort,
    build: &dyn BuildPort,
    tool: ToolInfo,
    sink: &mut dyn FnMut(ConsoleRecord),
) -> Result<RunOutcome, ToolError> {
    templates.validate(catalog::required_templates())?;
    let stages = catalog::npgsql_sm3_stages()?;
    let steps: Vec<&PatchStep> = stages.iter().flat_map(|s| s.steps.iter()).collect();

    let root = &settings.source;
    let policy = settings.policy;
    let mut report = RunReport::new(
        tool,
        TargetInfo {
            source: root.to_string(),
            version: settings.version.clone(),
            baseline: settings.baseline.clone(),
            output: settings.output.to_string(),
        },
        settings.dry_run,
    );
    let mut stage_no = 0;

    info!(
        source = root.as_str(),
        baseline = settings.baseline.as_str(),
        dry_run = settings.dry_run,
        "starting run"
    );

    stage_no += 1;
    sink(ConsoleRecord::banner(stage_no));
    sink(ConsoleRecord::info("Cleaning old files..."));
    if settings.dry_run {
        sink(ConsoleRecord::info("dry-run: clean skipped"));
    } else {
        let outcome = match run_clean(settings, vcs, CleanPhase::BeforePatch, &mut report, sink) {
            Ok(outcome) => outcome,
            Err(e) => return Err(clean_error(report, "clean/before-patch", e, &steps, sink)),
        };
        if !outcome.success() && policy.on_initial_clean_failure() == OnFailure::Abort {
            return Err(abort(report, "clean/before-patch", CLEAN_FAILED, &steps));
        }
    }

    let mut session = PatchSession::new(
        root.clone(),
        templates,
        ApplyOptions {
            dry_run: settings.dry_run,
        },
    );
    let mut done = 0;
    for PatchStage { title, steps: stage_steps } in &stages {
        stage_no += 1;
        sink(ConsoleRecord::banner(stage_no));
        sink(ConsoleRecord::info(*title));

        for step in stage_steps {
            let applied = match session.apply(step) {
                Ok(applied) => applied,
                Err(EditError::Template(e)) => return Err(e.into()),
                Err(EditError::Runtime(e)) => {
                    let message = format!("{e:#}");
                    sink(ConsoleRecord::error(message.clone()));
                    report.steps.push(StepRecord {
                        status: StepStatus::Failed,
                        message: Some(message.clone()),
                        ..skipped_record(step)
                    });
                    return Err(abort(report, &step.id, &message, &steps[done + 1..]));
                }
            };
            done += 1;
            report.steps.push(applied.to_record());

            let message = applied.message.clone().unwrap_or_default();
            let on_failure = match applied.status {
                StepStatus::AnchorNotFound => {
                    warn!(step = step.id.as_str(), "{message}");
                    sink(ConsoleRecord::warn(message.clone()));
                    policy.on_anchor_miss()
                }
                StepStatus::PreconditionFailed | StepStatus::Failed => {
                    sink(ConsoleRecord::error(message.clone()));
                    policy.on_precondition_failure()
                }
                status => {
                    sink(ConsoleRecord::info(format!("  {} ({})", step.title, status.label())));
                    OnFailure::Continue
                }
            };
            if on_failure == OnFailure::Abort {
                return Err(abort(report, &step.id, &message, &steps[done..]));
            }
        }
    }

    stage_no += 1;
    sink(ConsoleRecord::banner(stage_no));
    sink(ConsoleRecord::info("Build Npgsql with SM3 support"));
    if settings.dry_run {
        sink(ConsoleRecord::info("dry-run: build skipped"));
    } else {
        let outcome = {
            let mut forward = |line: ProcessLine| sink(ConsoleRecord::output(line.text));
            build_and_collect(root, &settings.output, &settings.build, build, &mut forward)
        };
        if let Some(cause) = &outcome.relocation_error {
            sink(ConsoleRecord::error(format!("{ARTIFACTS_FAILED}: {cause}")));
        } else if !outcome.command.success {
            sink(ConsoleRecord::error(BUILD_FAILED));
        }
        let record = BuildRecord {
            exit_code: outcome.command.exit_code,
            success: outcome.success(),
            artifacts: outcome.artifacts,
        };
        let failed = !record.success;
        report.build = Some(record);
        if failed && policy.on_build_failure() == OnFailure::Abort {
            return Err(abort(report, "build", BUILD_FAILED, &[]));
        }
    }

    stage_no += 1;
    sink(ConsoleRecord::banner(stage_no));
    sink(ConsoleRecord::info("Build completed, cleaning up old files..."));
    if settings.dry_run {
        sink(ConsoleRecord::info("dry-run: clean skipped"));
    } else if let Err(e) = run_clean(settings, vcs, CleanPhase::AfterBuild, &mut report, sink) {
        return Err(clean_error(report, "clean/after-build", e, &[], sink));
    }

    sink(ConsoleRecord::info("Bye!"));
    report.finish(false);
    info!(verdict = ?report.verdict.status, "run finished");

    Ok(RunOutcome {
        report,
        patch: session.patch(),
    })
}

fn run_clean(
    settings: &PatchSettings,
    vcs: &dyn VcsPort,
    phase: CleanPhase,
    report: &mut RunReport,
    sink: &mut dyn FnMut(ConsoleRecord),
) -> anyhow::Result<CleanOutcome> {
    let outcome = {
        let mut forward = |line: ProcessLine| sink(ConsoleRecord::output(line.text));
        revert::clean(&settings.source, &settings.baseline, vcs, &mut forward)?
    };
    if !outcome.success() {
        sink(ConsoleRecord::error(CLEAN_FAILED));
    }
    report.cleans.push(CleanRecord {
        phase,
        removed: outcome.removed.iter().map(|p| p.to_string()).collect(),
        exit_code: outcome.vcs.exit_code,
        success: outcome.success(),
    });
    Ok(outcome)
}

/// A clean that could not delete a generated file: the tree is in an unknown state.
fn clean_error(
    report: RunReport,
    stage: &str,
    err: anyhow::Error,
    remaining: &[&PatchStep],
    sink: &mut dyn FnMut(ConsoleRecord),
) -> ToolError {
    let message = format!("{err:#}");
    sink(ConsoleRecord::error(message.clone()));
    abort(report, stage, &message, remaining)
}

fn skipped_record(step: &PatchStep) -> StepRecord {
    StepRecord {
        step_id: step.id.clone(),
        title: step.title.clone(),
        kind: step.kind(),
        path: step.path.to_string(),
        status: StepStatus::Skipped,
        message: None,
        sha256_before: None,
        sha256_after: None,
    }
}

fn abort(mut report: RunReport, step_id: &str, message: &str, remaining: &[&PatchStep]) -> ToolError {
    warn!(step = step_id, "run aborted: {message}");
    report
        .steps
        .extend(remaining.iter().map(|step| skipped_record(step)));
    report.finish(true);
    ToolError::Aborted {
        step_id: step_id.to_string(),
        message: message.to_string(),
        report: Box::new(report),
    }
}
