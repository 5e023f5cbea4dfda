//! Restores the target tree to its baseline revision.

use crate::catalog::GENERATED_PATHS;
use crate::ports::{CommandOutcome, ProcessLine, VcsPort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOutcome {
    /// Generated files that existed and were deleted, relative to the tree root.
    pub removed: Vec<Utf8PathBuf>,
    pub vcs: CommandOutcome,
}

impl CleanOutcome {
    pub fn success(&self) -> bool {
        self.vcs.success
    }
}

/// Delete every generated file, then let version control discard edits and
/// check out `revision`.
///
/// A version control tool that cannot be started is reported as a failed
/// outcome, not an error; only file deletion errors propagate.
pub fn clean(
    root: &Utf8Path,
    revision: &str,
    vcs: &dyn VcsPort,
    on_line: &mut dyn FnMut(ProcessLine),
) -> anyhow::Result<CleanOutcome> {
    let removed = remove_generated(root)?;

    let vcs = match vcs.restore_baseline(root, revision, on_line) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(root = root.as_str(), error = %e, "version control restore did not run");
            on_line(ProcessLine {
                stream: crate::ports::OutputStream::Stderr,
                text: format!("{e:#}"),
            });
            CommandOutcome::failed(None)
        }
    };

    Ok(CleanOutcome { removed, vcs })
}

fn remove_generated(root: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut removed = Vec::new();
    for rel in GENERATED_PATHS {
        let abs = root.join(rel);
        // Anything other than a file here cannot be removed and is an error.
        if !abs.exists() {
            continue;
        }
        fs::remove_file(&abs).with_context(|| format!("remove generated file {abs}"))?;
        debug!(path = rel, "removed generated file");
        removed.push(Utf8PathBuf::from(rel));
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::OutputStream;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingVcs {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl VcsPort for RecordingVcs {
        fn restore_baseline(
            &self,
            _repo_root: &Utf8Path,
            revision: &str,
            on_line: &mut dyn FnMut(ProcessLine),
        ) -> anyhow::Result<CommandOutcome> {
            self.calls.borrow_mut().push(revision.to_string());
            on_line(ProcessLine {
                stream: OutputStream::Stdout,
                text: format!("HEAD is now at {revision}"),
            });
            if self.fail {
                Ok(CommandOutcome::failed(Some(128)))
            } else {
                Ok(CommandOutcome::ok())
            }
        }
    }

    struct BrokenVcs;

    impl VcsPort for BrokenVcs {
        fn restore_baseline(
            &self,
            _repo_root: &Utf8Path,
            _revision: &str,
            _on_line: &mut dyn FnMut(ProcessLine),
        ) -> anyhow::Result<CommandOutcome> {
            anyhow::bail!("spawn git: not found")
        }
    }

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        (temp, root)
    }

    #[test]
    fn removes_present_generated_files_only() {
        let (_temp, root) = temp_root();
        let sm3 = root.join(crate::catalog::SM3);
        std::fs::create_dir_all(sm3.parent().expect("parent")).expect("mkdir");
        std::fs::write(&sm3, "class Sm3 {}").expect("write");

        let vcs = RecordingVcs::default();
        let mut lines = Vec::new();
        let outcome = clean(&root, "v9.0.3", &vcs, &mut |l| lines.push(l)).expect("clean");

        assert_eq!(outcome.removed, vec![Utf8PathBuf::from(crate::catalog::SM3)]);
        assert!(!sm3.exists());
        assert!(outcome.success());
        assert_eq!(vcs.calls.borrow().as_slice(), ["v9.0.3".to_string()]);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn clean_tree_is_a_no_op() {
        let (_temp, root) = temp_root();
        let outcome = clean(&root, "v9.0.3", &RecordingVcs::default(), &mut |_| {}).expect("clean");
        assert!(outcome.removed.is_empty());
        assert!(outcome.success());
    }

    #[test]
    fn vcs_failure_is_reported_not_raised() {
        let (_temp, root) = temp_root();
        let vcs = RecordingVcs {
            fail: true,
            ..RecordingVcs::default()
        };
        let outcome = clean(&root, "v9.0.3", &vcs, &mut |_| {}).expect("clean");
        assert!(!outcome.success());
        assert_eq!(outcome.vcs.exit_code, Some(128));
    }

    #[test]
    fn unspawnable_vcs_becomes_failed_outcome() {
        let (_temp, root) = temp_root();
        let mut lines = Vec::new();
        let outcome = clean(&root, "v9.0.3", &BrokenVcs, &mut |l| lines.push(l)).expect("clean");
        assert!(!outcome.success());
        assert_eq!(outcome.vcs.exit_code, None);
        assert!(lines[0].text.contains("not found"));
    }

    #[test]
    fn directory_in_place_of_generated_file_is_an_error() {
        let (_temp, root) = temp_root();
        std::fs::create_dir_all(root.join(crate::catalog::SM3)).expect("mkdir");
        let vcs = RecordingVcs::default();

        let err = clean(&root, "v9.0.3", &vcs, &mut |_| {}).unwrap_err();

        assert!(err.to_string().contains("remove generated file"), "{err}");
        assert!(vcs.calls.borrow().is_empty());
    }
}
