//! Clap-free settings for the patch pipeline.

use camino::Utf8PathBuf;

/// Settings for one run against one target tree.
#[derive(Debug, Clone)]
pub struct PatchSettings {
    /// Npgsql source checkout.
    pub source: Utf8PathBuf,
    /// Where build artifacts and the run report go.
    pub output: Utf8PathBuf,
    /// Npgsql version tag requested by the user.
    pub version: String,
    /// Revision the tree is reset to before and after patching.
    pub baseline: String,

    pub dry_run: bool,

    pub build: BuildSettings,
    pub policy: PolicySettings,
}

impl PatchSettings {
    /// Settings with the baseline pinned to `version`.
    pub fn new(
        source: impl Into<Utf8PathBuf>,
        output: impl Into<Utf8PathBuf>,
        version: impl Into<String>,
    ) -> Self {
        let version = version.into();
        Self {
            source: source.into(),
            output: output.into(),
            baseline: version.clone(),
            version,
            dry_run: false,
            build: BuildSettings::default(),
            policy: PolicySettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Program and arguments, run from the target tree root.
    pub command: Vec<String>,
    /// Where the build tool leaves its output, relative to the target tree.
    pub artifacts_dir: Utf8PathBuf,
    /// Only files whose name starts with this are moved to the output directory.
    pub artifact_prefix: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            // Build servers would outlive the build and keep its output pipes open.
            command: [
                "dotnet",
                "build",
                "src/Npgsql",
                "-c",
                "Release",
                "-nodeReuse:false",
                "-p:UseSharedCompilation=false",
            ]
                .into_iter()
                .map(String::from)
                .collect(),
            artifacts_dir: Utf8PathBuf::from("src/Npgsql/bin/Release/net8.0"),
            artifact_prefix: "Npgsql.".to_string(),
        }
    }
}

/// Per-stage failure policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicySettings {
    /// Abort the run when an anchor is missing instead of warning and continuing.
    pub strict_anchors: bool,
    /// Abort before patching when the initial clean fails.
    pub abort_on_clean_failure: bool,
}

/// What the orchestrator does after a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    Abort,
    Continue,
}

impl PolicySettings {
    pub fn on_anchor_miss(&self) -> OnFailure {
        if self.strict_anchors {
            OnFailure::Abort
        } else {
            OnFailure::Continue
        }
    }

    pub fn on_initial_clean_failure(&self) -> OnFailure {
        if self.abort_on_clean_failure {
            OnFailure::Abort
        } else {
            OnFailure::Continue
        }
    }

    /// A missing or empty target file always aborts: later steps depend on it.
    pub fn on_precondition_failure(&self) -> OnFailure {
        OnFailure::Abort
    }

    /// A failed build still runs the final clean.
    pub fn on_build_failure(&self) -> OnFailure {
        OnFailure::Continue
    }
}
