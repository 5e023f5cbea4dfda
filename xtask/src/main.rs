use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use fs_err as fs;
use sm3patch_templates::TemplateStore;
use std::process::Command as ProcessCommand;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by sm3patch.
    PrintSchemas,
    /// Print the patch steps in execution order.
    ListSteps,
    /// Write the embedded C# templates to a directory for review.
    ExportTemplates {
        #[arg(long, default_value = "target/templates")]
        dir: Utf8PathBuf,
    },
    /// Run the end-to-end binary tests (needs git on PATH).
    E2e,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas => {
            println!("{}", sm3patch_types::schema::SM3PATCH_RUN_V1);
        }
        Command::ListSteps => {
            for step in sm3patch_core::catalog::npgsql_sm3_steps()? {
                println!("{:<36} {:<15} {}", step.id, step.kind().label(), step.path);
            }
        }
        Command::ExportTemplates { dir } => {
            let store = TemplateStore::embedded();
            fs::create_dir_all(&dir).with_context(|| format!("create {dir}"))?;
            for name in store.names() {
                let path = dir.join(name);
                fs::write(&path, store.get(name)?).with_context(|| format!("write {path}"))?;
            }
            println!("exported {} template(s) to {dir}", store.len());
        }
        Command::E2e => {
            let status = ProcessCommand::new("cargo")
                .args(["test", "-p", "sm3patch", "--test", "cli_parsing"])
                .status()
                .context("run end-to-end tests")?;
            if !status.success() {
                anyhow::bail!("e2e failed");
            }
        }
    }
    Ok(())
}
