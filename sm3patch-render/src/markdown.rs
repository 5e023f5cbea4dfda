use sm3patch_types::report::{CleanPhase, RunReport, VerdictStatus};

pub fn render_run_md(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str("# sm3patch run\n\n");
    out.push_str(&format!("- Verdict: `{}`\n", verdict_label(report.verdict.status)));
    out.push_str(&format!("- Npgsql version: `{}`\n", report.target.version));
    out.push_str(&format!("- Baseline: `{}`\n", report.target.baseline));
    out.push_str(&format!("- Source: `{}`\n", report.target.source));
    out.push_str(&format!("- Output: `{}`\n", report.target.output));
    if report.run.dry_run {
        out.push_str("- Mode: dry-run\n");
    }
    out.push_str(&format!(
        "- Steps: {} (applied {}, already applied {}, anchor not found {}, failed {})\n",
        report.summary.steps_total,
        report.summary.applied,
        report.summary.already_applied,
        report.summary.anchor_not_found,
        report.summary.failed
    ));
    for reason in &report.verdict.reasons {
        out.push_str(&format!("- Reason: {}\n", reason));
    }
    out.push('\n');

    out.push_str("## Steps\n\n");
    if report.steps.is_empty() {
        out.push_str("_No steps ran._\n\n");
    }
    for (i, step) in report.steps.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, step.step_id));
        out.push_str(&format!("- Title: {}\n", step.title));
        out.push_str(&format!("- Kind: `{}`\n", step.kind.label()));
        out.push_str(&format!("- Target: `{}`\n", step.path));
        out.push_str(&format!("- Status: `{}`\n", step.status.label()));
        if let Some(msg) = &step.message {
            out.push_str(&format!("- Message: {}\n", msg));
        }
        if step.sha256_before != step.sha256_after {
            let before = step.sha256_before.as_deref().unwrap_or("-");
            let after = step.sha256_after.as_deref().unwrap_or("-");
            out.push_str(&format!("- sha256: {} → {}\n", short(before), short(after)));
        }
        out.push('\n');
    }

    if !report.cleans.is_empty() {
        out.push_str("## Cleanup\n\n");
        for clean in &report.cleans {
            let phase = match clean.phase {
                CleanPhase::BeforePatch => "before patch",
                CleanPhase::AfterBuild => "after build",
            };
            let exit = clean
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "- {}: {} (exit {}, removed {} file(s))\n",
                phase,
                if clean.success { "ok" } else { "failed" },
                exit,
                clean.removed.len()
            ));
        }
        out.push('\n');
    }

    if let Some(build) = &report.build {
        out.push_str("## Build\n\n");
        out.push_str(&format!(
            "- Result: {}\n",
            if build.success { "ok" } else { "failed" }
        ));
        if let Some(code) = build.exit_code {
            out.push_str(&format!("- Exit code: {}\n", code));
        }
        for artifact in &build.artifacts {
            out.push_str(&format!("- Artifact: `{}`\n", artifact));
        }
    }

    out
}

fn verdict_label(s: VerdictStatus) -> &'static str {
    match s {
        VerdictStatus::Pass => "pass",
        VerdictStatus::Warn => "warn",
        VerdictStatus::Fail => "fail",
    }
}

fn short(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}
