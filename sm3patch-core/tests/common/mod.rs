//! Shared sandbox and fake ports for the core integration tests.
#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use sm3patch_core::ports::{BuildPort, CommandOutcome, OutputStream, ProcessLine, VcsPort};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use tempfile::TempDir;

pub fn fixture_root() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/npgsql")
}

/// Copy the baseline Npgsql fixture into a fresh temp dir.
pub fn sandbox() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().join("npgsql")).expect("utf8 path");
    copy_tree(&fixture_root(), &root);
    (temp, root)
}

pub fn copy_tree(from: &Utf8Path, to: &Utf8Path) {
    for (rel, bytes) in snapshot(from) {
        let dest = to.join(&rel);
        fs::create_dir_all(dest.parent().expect("parent")).expect("mkdir");
        fs::write(dest, bytes).expect("write");
    }
}

/// Every file under `root`, keyed by relative path.
pub fn snapshot(root: &Utf8Path) -> BTreeMap<Utf8PathBuf, Vec<u8>> {
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn walk(root: &Utf8Path, dir: &Utf8Path, out: &mut BTreeMap<Utf8PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let entry = entry.expect("dir entry");
        let path = Utf8PathBuf::from_path_buf(entry.path()).expect("utf8 path");
        if path.is_dir() {
            walk(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).expect("under root").to_path_buf();
            out.insert(rel, fs::read(&path).expect("read"));
        }
    }
}

pub fn read(root: &Utf8Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).expect("read file")
}

/// Behaves like `git checkout .`: tracked files go back to the snapshot taken
/// at construction, untracked files are left alone.
pub struct FakeVcs {
    tracked: BTreeMap<Utf8PathBuf, Vec<u8>>,
    pub calls: RefCell<Vec<String>>,
    pub fail: bool,
}

impl FakeVcs {
    pub fn tracking(root: &Utf8Path) -> Self {
        Self {
            tracked: snapshot(root),
            calls: RefCell::new(vec![]),
            fail: false,
        }
    }

    pub fn failing(root: &Utf8Path) -> Self {
        Self {
            fail: true,
            ..Self::tracking(root)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl VcsPort for FakeVcs {
    fn restore_baseline(
        &self,
        repo_root: &Utf8Path,
        revision: &str,
        on_line: &mut dyn FnMut(ProcessLine),
    ) -> anyhow::Result<CommandOutcome> {
        self.calls.borrow_mut().push(revision.to_string());
        if self.fail {
            on_line(ProcessLine {
                stream: OutputStream::Stderr,
                text: format!("error: pathspec '{revision}' did not match any file(s) known to git"),
            });
            return Ok(CommandOutcome::failed(Some(1)));
        }
        for (rel, bytes) in &self.tracked {
            std::fs::write(repo_root.join(rel), bytes)?;
        }
        on_line(ProcessLine {
            stream: OutputStream::Stdout,
            text: format!("HEAD is now at {revision}"),
        });
        Ok(CommandOutcome::ok())
    }
}

/// Drops `Npgsql.*` artifacts (plus one unrelated file) into the release dir.
pub struct FakeBuild {
    pub success: bool,
    pub calls: Cell<usize>,
    /// Whether the dispatch branch was in place when the build ran.
    pub saw_patched_tree: Cell<bool>,
}

impl FakeBuild {
    pub fn succeeding() -> Self {
        Self {
            success: true,
            calls: Cell::new(0),
            saw_patched_tree: Cell::new(false),
        }
    }

    pub fn failing() -> Self {
        Self {
            success: false,
            ..Self::succeeding()
        }
    }
}

impl BuildPort for FakeBuild {
    fn build(
        &self,
        repo_root: &Utf8Path,
        on_line: &mut dyn FnMut(ProcessLine),
    ) -> anyhow::Result<CommandOutcome> {
        self.calls.set(self.calls.get() + 1);
        let auth = std::fs::read_to_string(repo_root.join(sm3patch_core::catalog::CONNECTOR_AUTH))?;
        self.saw_patched_tree
            .set(auth.contains(sm3patch_core::catalog::AUTH_MARKER));

        on_line(ProcessLine {
            stream: OutputStream::Stdout,
            text: "  Npgsql -> src/Npgsql/bin/Release/net8.0/Npgsql.dll".to_string(),
        });
        if !self.success {
            on_line(ProcessLine {
                stream: OutputStream::Stderr,
                text: "error CS0246: The type or namespace name 'Sm3' could not be found".to_string(),
            });
            return Ok(CommandOutcome::failed(Some(1)));
        }

        let dir = repo_root.join("src/Npgsql/bin/Release/net8.0");
        std::fs::create_dir_all(&dir)?;
        for name in ["Npgsql.dll", "Npgsql.xml", "Microsoft.Extensions.Logging.Abstractions.dll"] {
            std::fs::write(dir.join(name), name)?;
        }
        Ok(CommandOutcome::ok())
    }
}
