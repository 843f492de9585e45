// Runtime settings: defaults < config file < environment

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "dsc-runner";
const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "DSC_RUNNER";

pub const DEFAULT_ENGINE: &str = dsc_runner_core::application::constants::DEFAULT_ENGINE;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    GitHub,
    Directory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
    /// Folder for the directory source
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine: String,
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
    pub staging_dir: PathBuf,
    pub source: SourceSettings,
}

impl Settings {
    /// Load settings from the given file, or the per-user config file if it
    /// exists, then apply `DSC_RUNNER_*` overrides.
    ///
    /// Nested keys use `__` (`DSC_RUNNER_SOURCE__KIND=directory`).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::build(Some((path, true))),
            None => {
                let default_file = default_config_file();
                Self::build(default_file.as_deref().map(|p| (p, false)))
            }
        }
    }

    fn build(file: Option<(&Path, bool)>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("engine", DEFAULT_ENGINE)?
            .set_default("cache_dir", path_string(&default_cache_dir()))?
            .set_default("cache_ttl_secs", DEFAULT_CACHE_TTL_SECS)?
            .set_default("staging_dir", path_string(&default_staging_dir()))?
            .set_default("source.kind", "github")?
            .set_default("source.owner", dsc_runner_infra_source::github::DEFAULT_OWNER)?
            .set_default("source.repo", dsc_runner_infra_source::github::DEFAULT_REPO)?
            .set_default("source.git_ref", dsc_runner_infra_source::github::DEFAULT_GIT_REF)?;

        if let Some((path, required)) = file {
            builder = builder.add_source(File::from(path).required(required));
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// `<config dir>/dsc-runner/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn default_cache_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME).join("cache"))
        .join("profiles")
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join(APP_NAME).join("downloads")
}
