// Profile Service - fetch, stage and run named profiles

use crate::application::execution::ExecutionService;
use crate::domain::{
    resolve_file_name, sanitize_file_name, ExecutionMode, ExecutionResult, ProfileSummary,
};
use crate::error::{AppError, Result};
use crate::port::ProfileSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A profile written to disk for one engine run
#[derive(Debug)]
pub struct StagedProfile {
    dir: PathBuf,
    path: PathBuf,
}

impl StagedProfile {
    /// The file handed to the engine
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the per-run directory. Failures are logged, not returned.
    pub async fn remove(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "Failed to remove staged profile");
        }
    }
}

/// Resolves profile references, stages their content and runs the engine
pub struct ProfileService {
    source: Arc<dyn ProfileSource>,
    executor: Arc<ExecutionService>,
    staging_dir: PathBuf,
}

impl ProfileService {
    /// Create a new profile service
    ///
    /// # Arguments
    /// * `source` - Where profiles come from (usually the cache decorator)
    /// * `executor` - Engine runner
    /// * `staging_dir` - Root under which per-run directories are created
    pub fn new(
        source: Arc<dyn ProfileSource>,
        executor: Arc<ExecutionService>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            executor,
            staging_dir: staging_dir.into(),
        }
    }

    pub async fn list(&self) -> Result<Vec<ProfileSummary>> {
        Ok(self.source.list_profiles().await?)
    }

    /// Raw text of a profile; `profile` may be a bare name or a file name
    pub async fn content(&self, profile: &str) -> Result<String> {
        let file_name = resolve_file_name(profile);
        Ok(self.source.get_profile_content(&file_name).await?)
    }

    /// Write a profile to `<staging_dir>/<uuid>/<file name>`.
    ///
    /// Content is requested with `file_name` as given; only the on-disk name
    /// is reduced to its last segment.
    pub async fn stage(&self, file_name: &str) -> Result<StagedProfile> {
        let sanitized = sanitize_file_name(file_name).ok_or_else(|| {
            AppError::InvalidArgument(format!("profile file name is empty: {file_name:?}"))
        })?;

        let content = self.source.get_profile_content(file_name).await?;

        let dir = self.staging_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(sanitized);
        tokio::fs::write(&path, content).await?;

        debug!(file_name, path = %path.display(), "Staged profile");
        Ok(StagedProfile { dir, path })
    }

    pub async fn test(&self, profile: &str, cancel: &CancellationToken) -> Result<ExecutionResult> {
        self.run_profile(profile, ExecutionMode::Test, cancel).await
    }

    pub async fn apply(&self, profile: &str, cancel: &CancellationToken) -> Result<ExecutionResult> {
        self.run_profile(profile, ExecutionMode::Apply, cancel).await
    }

    /// Run a local file as is, without staging
    pub async fn run_file(
        &self,
        path: &Path,
        mode: ExecutionMode,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        if !tokio::fs::try_exists(path).await? {
            return Err(AppError::NotFound(path.display().to_string()));
        }
        self.executor.execute(path, mode, cancel).await
    }

    async fn run_profile(
        &self,
        profile: &str,
        mode: ExecutionMode,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let file_name = resolve_file_name(profile);
        info!(profile, file_name = %file_name, mode = %mode, "Running profile");

        let staged = self.stage(&file_name).await?;
        let outcome = self.executor.execute(staged.path(), mode, cancel).await;
        staged.remove().await;

        outcome
    }
}

/// Best-effort removal of leftovers from earlier runs
pub async fn cleanup_staging(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(dir = %dir.display(), "Removed staging directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to clean staging directory"),
    }
}
