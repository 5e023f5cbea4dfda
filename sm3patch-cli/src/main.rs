mod config;
mod console;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use config::{ConfigMerger, RunArgs};
use fs_err as fs;
use sm3patch_core::adapters::{CommandBuildPort, GitVcsPort};
use sm3patch_core::catalog;
use sm3patch_core::pipeline::{ToolError, run_patch};
use sm3patch_render::render_run_md;
use sm3patch_templates::TemplateStore;
use sm3patch_types::report::{RunReport, ToolInfo};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const REPORT_JSON: &str = "sm3patch-report.json";
const REPORT_MD: &str = "sm3patch-report.md";

/// `--version` names the Npgsql tag to patch, so clap's own version flag is off.
#[derive(Debug, Parser)]
#[command(
    name = "sm3patch",
    disable_version_flag = true,
    about = "Patch an Npgsql source tree with SM3 password authentication and build it."
)]
struct Cli {
    /// Npgsql version tag the tree is reset to, like v9.0.3.
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    version: Option<String>,

    /// Npgsql source code folder (a git checkout).
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    source: Option<String>,

    /// Directory that receives the built Npgsql.* artifacts and the run report.
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    output: Option<String>,

    /// Config file (default: ./sm3patch.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Show what would change without cleaning, writing or building.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, thiserror::Error)]
enum UsageError {
    #[error("Npgsql version is required, like v9.0.3")]
    MissingVersion,
    #[error("Npgsql source code folder is required")]
    MissingSource,
    #[error("output directory is required")]
    MissingOutput,
}

impl Cli {
    fn run_args(&self) -> Result<RunArgs, UsageError> {
        let version = required(&self.version).ok_or(UsageError::MissingVersion)?;
        let source = required(&self.source).ok_or(UsageError::MissingSource)?;
        let output = required(&self.output).ok_or(UsageError::MissingOutput)?;
        Ok(RunArgs {
            version: version.to_string(),
            source: Utf8PathBuf::from(source),
            output: Utf8PathBuf::from(output),
            dry_run: self.dry_run,
        })
    }
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    println!("Welcome to Npgsql SM3 Authentication Builder!");
    println!();

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            console::print_error(format!("{e:#}"));
            ExitCode::from(1)
        }
    }
}

fn real_main(cli: Cli) -> anyhow::Result<u8> {
    let args = match cli.run_args() {
        Ok(args) => args,
        Err(e) => {
            console::print_error(&e);
            return Ok(2);
        }
    };

    let cwd = std::env::current_dir().context("read current directory")?;
    let cwd = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| anyhow::anyhow!("current directory is not UTF-8: {}", p.display()))?;
    let file_config =
        config::load_or_default(cli.config.as_deref(), &cwd).context("load sm3patch.toml config")?;
    let settings = ConfigMerger::new(file_config).into_settings(args)?;

    let templates = TemplateStore::embedded();
    if let Err(e) = prepare(&settings.output, &templates) {
        return failed(&settings.output, e);
    }

    let vcs = GitVcsPort;
    let build = CommandBuildPort::new(settings.build.command.clone());
    let tool = ToolInfo {
        name: "sm3patch".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let result = run_patch(
        &settings,
        &templates,
        &vcs,
        &build,
        tool,
        &mut console::print_record,
    );

    match result {
        Ok(outcome) => {
            write_report(&settings.output, &outcome.report)?;
            if settings.dry_run {
                print!("{}", outcome.patch);
            }
            info!(verdict = ?outcome.report.verdict.status, "done");
            Ok(outcome.exit_code())
        }
        Err(e) => failed(&settings.output, e),
    }
}

/// Checks the packaged templates before the output directory is created.
fn prepare(output: &Utf8Path, templates: &TemplateStore) -> Result<(), ToolError> {
    templates.validate(catalog::required_templates())?;
    fs::create_dir_all(output).with_context(|| format!("create {output}"))?;
    Ok(())
}

fn failed(output: &Utf8Path, e: ToolError) -> anyhow::Result<u8> {
    if let Some(report) = e.report() {
        write_report(output, report)?;
    }
    match &e {
        ToolError::Template(inner) => console::print_error(inner),
        ToolError::Aborted {
            step_id, message, ..
        } => console::print_error(format!("run aborted at {step_id}: {message}")),
        ToolError::Internal(inner) => console::print_error(format!("{inner:#}")),
    }
    Ok(e.exit_code())
}

fn write_report(out_dir: &Utf8Path, report: &RunReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize run report")?;
    let json_path = out_dir.join(REPORT_JSON);
    fs::write(&json_path, json).with_context(|| format!("write {}", json_path))?;

    let md_path = out_dir.join(REPORT_MD);
    fs::write(&md_path, render_run_md(report)).with_context(|| format!("write {}", md_path))?;
    debug!("wrote {} and {}", json_path, md_path);
    Ok(())
}
