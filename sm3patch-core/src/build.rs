//! Release build and artifact relocation.

use crate::ports::{BuildPort, CommandOutcome, ProcessLine};
use crate::settings::BuildSettings;
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub command: CommandOutcome,
    /// File names moved into the output directory, sorted.
    pub artifacts: Vec<String>,
    /// Set when the build succeeded but its artifacts could not be moved.
    pub relocation_error: Option<String>,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.command.success && self.relocation_error.is_none()
    }
}

/// Run the build and, when it succeeds, move the artifacts into `output`.
///
/// A build that cannot be started counts as a failed build.
pub fn build_and_collect(
    root: &Utf8Path,
    output: &Utf8Path,
    settings: &BuildSettings,
    port: &dyn BuildPort,
    on_line: &mut dyn FnMut(ProcessLine),
) -> BuildOutcome {
    let command = match port.build(root, on_line) {
        Ok(outcome) => outcome,
        Err(e) => {
            on_line(ProcessLine {
                stream: crate::ports::OutputStream::Stderr,
                text: format!("{e:#}"),
            });
            CommandOutcome::failed(None)
        }
    };

    if !command.success {
        return BuildOutcome {
            command,
            artifacts: vec![],
            relocation_error: None,
        };
    }

    match relocate_artifacts(
        &root.join(&settings.artifacts_dir),
        &settings.artifact_prefix,
        output,
    ) {
        Ok(artifacts) => {
            info!(count = artifacts.len(), output = output.as_str(), "artifacts collected");
            BuildOutcome {
                command,
                artifacts,
                relocation_error: None,
            }
        }
        Err(e) => {
            let message = format!("{e:#}");
            warn!(error = %message, "artifact relocation failed");
            BuildOutcome {
                command,
                artifacts: vec![],
                relocation_error: Some(message),
            }
        }
    }
}

/// Move every file in `src_dir` whose name starts with `prefix` into `dest_dir`,
/// overwriting existing files.
pub fn relocate_artifacts(
    src_dir: &Utf8Path,
    prefix: &str,
    dest_dir: &Utf8Path,
) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(src_dir).with_context(|| format!("read artifacts dir {src_dir}"))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with(prefix) {
            names.push(name);
        }
    }
    names.sort();

    fs::create_dir_all(dest_dir).with_context(|| format!("create output dir {dest_dir}"))?;
    for name in &names {
        move_file(&src_dir.join(name), &dest_dir.join(name))?;
    }
    Ok(names)
}

fn move_file(from: &Utf8Path, to: &Utf8Path) -> anyhow::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        debug!(from = from.as_str(), to = to.as_str(), "moved artifact");
        return Ok(());
    }
    // Rename fails across filesystems.
    fs::copy(from, to).with_context(|| format!("copy {from} to {to}"))?;
    fs::remove_file(from).with_context(|| format!("remove {from}"))?;
    debug!(from = from.as_str(), to = to.as_str(), "copied artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        (temp, root)
    }

    struct FakeBuild {
        success: bool,
    }

    impl BuildPort for FakeBuild {
        fn build(
            &self,
            repo_root: &Utf8Path,
            _on_line: &mut dyn FnMut(ProcessLine),
        ) -> anyhow::Result<CommandOutcome> {
            let dir = repo_root.join("src/Npgsql/bin/Release/net8.0");
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join("Npgsql.dll"), "dll")?;
            Ok(if self.success {
                CommandOutcome::ok()
            } else {
                CommandOutcome::failed(Some(1))
            })
        }
    }

    #[test]
    fn relocates_only_prefixed_files() {
        let (_temp, root) = temp_root();
        let src = root.join("bin");
        let out = root.join("out");
        std::fs::create_dir_all(&src).expect("mkdir");
        for name in ["Npgsql.pdb", "Npgsql.dll", "Microsoft.Extensions.Logging.dll"] {
            std::fs::write(src.join(name), name).expect("write");
        }
        std::fs::create_dir_all(&out).expect("mkdir");
        std::fs::write(out.join("Npgsql.dll"), "stale").expect("write");

        let moved = relocate_artifacts(&src, "Npgsql.", &out).expect("relocate");

        assert_eq!(moved, vec!["Npgsql.dll".to_string(), "Npgsql.pdb".to_string()]);
        assert_eq!(std::fs::read_to_string(out.join("Npgsql.dll")).expect("read"), "Npgsql.dll");
        assert!(!src.join("Npgsql.dll").exists());
        assert!(src.join("Microsoft.Extensions.Logging.dll").exists());
    }

    #[test]
    fn missing_artifacts_dir_is_an_error() {
        let (_temp, root) = temp_root();
        let err = relocate_artifacts(&root.join("nope"), "Npgsql.", &root.join("out")).unwrap_err();
        assert!(err.to_string().contains("read artifacts dir"));
    }

    #[test]
    fn failed_build_leaves_artifacts_in_place() {
        let (_temp, root) = temp_root();
        let out = root.join("out");
        let outcome = build_and_collect(
            &root,
            &out,
            &BuildSettings::default(),
            &FakeBuild { success: false },
            &mut |_| {},
        );

        assert!(!outcome.success());
        assert!(outcome.artifacts.is_empty());
        assert!(!out.join("Npgsql.dll").exists());
    }

    #[test]
    fn successful_build_collects_artifacts() {
        let (_temp, root) = temp_root();
        let out = root.join("out");
        let outcome = build_and_collect(
            &root,
            &out,
            &BuildSettings::default(),
            &FakeBuild { success: true },
            &mut |_| {},
        );

        assert!(outcome.success());
        assert_eq!(outcome.artifacts, vec!["Npgsql.dll".to_string()]);
        assert!(out.join("Npgsql.dll").exists());
    }

    #[test]
    fn relocation_failure_keeps_the_exit_code() {
        let (_temp, root) = temp_root();
        let settings = BuildSettings {
            artifacts_dir: "src/Npgsql/bin/Release/net9.0".into(),
            ..BuildSettings::default()
        };
        let outcome = build_and_collect(
            &root,
            &root.join("out"),
            &settings,
            &FakeBuild { success: true },
            &mut |_| {},
        );

        assert!(!outcome.success());
        assert_eq!(outcome.command.exit_code, Some(0));
        assert!(outcome.artifacts.is_empty());
        let err = outcome.relocation_error.expect("relocation error");
        assert!(err.contains("read artifacts dir"), "{err}");
    }
}
