// Local directory profile source

use async_trait::async_trait;
use dsc_runner_core::domain::{is_profile_file, sanitize_file_name, ProfileSummary};
use dsc_runner_core::port::{ProfileSource, SourceError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serves `*.dsc.yaml` files from one folder, sorted by file name.
///
/// Only the last segment of a requested name is used, so lookups never
/// leave the folder.
pub struct DirectoryProfileSource {
    root: PathBuf,
}

impl DirectoryProfileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ProfileSource for DirectoryProfileSource {
    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, SourceError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SourceError::NotFound(self.root.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_profile_file(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        debug!(root = %self.root.display(), count = names.len(), "Listed local profiles");
        Ok(names.into_iter().map(ProfileSummary::from_file_name).collect())
    }

    async fn get_profile_content(&self, file_name: &str) -> Result<String, SourceError> {
        let name = sanitize_file_name(file_name)
            .ok_or_else(|| SourceError::InvalidName(format!("{file_name:?}")))?;

        match tokio::fs::read_to_string(self.root.join(name)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SourceError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
