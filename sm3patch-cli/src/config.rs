//! Configuration file loading for sm3patch.
//!
//! Loads `sm3patch.toml` from `--config` or from the working directory and
//! merges it with the command line (command line wins).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use sm3patch_core::settings::{BuildSettings, PatchSettings, PolicySettings};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "sm3patch.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Sm3patchConfig {
    pub target: TargetConfig,
    pub build: BuildConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// Revision to reset the tree to. Defaults to the `--version` value.
    pub baseline: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Program and arguments of the build.
    pub command: Option<Vec<String>>,
    /// Build output directory, relative to the source tree.
    pub artifacts_dir: Option<Utf8PathBuf>,
    /// File name prefix of the artifacts to collect.
    pub artifact_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub strict_anchors: bool,
    pub abort_on_clean_failure: bool,
}

pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.is_file() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<Sm3patchConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<Sm3patchConfig> {
    let config: Sm3patchConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// An explicit path must exist; otherwise discovery in `dir` is best effort.
pub fn load_or_default(explicit: Option<&Utf8Path>, dir: &Utf8Path) -> anyhow::Result<Sm3patchConfig> {
    match explicit.map(Utf8Path::to_path_buf).or_else(|| discover_config(dir)) {
        Some(path) => load_config(&path),
        None => Ok(Sm3patchConfig::default()),
    }
}

/// Required values that only the command line supplies.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub version: String,
    pub source: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub dry_run: bool,
}

pub struct ConfigMerger {
    config: Sm3patchConfig,
}

impl ConfigMerger {
    pub fn new(config: Sm3patchConfig) -> Self {
        Self { config }
    }

    pub fn into_settings(self, args: RunArgs) -> anyhow::Result<PatchSettings> {
        let Sm3patchConfig {
            target,
            build,
            policy,
        } = self.config;

        let mut settings = PatchSettings::new(args.source, args.output, args.version);
        settings.dry_run = args.dry_run;
        if let Some(baseline) = target.baseline.filter(|b| !b.trim().is_empty()) {
            settings.baseline = baseline;
        }

        let defaults = BuildSettings::default();
        let command = build.command.unwrap_or(defaults.command);
        if command.is_empty() {
            anyhow::bail!("build.command in {CONFIG_FILE_NAME} must not be empty");
        }
        settings.build = BuildSettings {
            command,
            artifacts_dir: build.artifacts_dir.unwrap_or(defaults.artifacts_dir),
            artifact_prefix: build.artifact_prefix.unwrap_or(defaults.artifact_prefix),
        };
        settings.policy = PolicySettings {
            strict_anchors: policy.strict_anchors,
            abort_on_clean_failure: policy.abort_on_clean_failure,
        };

        debug!(
            "merged settings: baseline={}, build={:?}, policy={:?}",
            settings.baseline, settings.build.command, settings.policy
        );
        Ok(settings)
    }
}
