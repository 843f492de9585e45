// File-backed CacheStore
//
// Layout under the cache root:
//   profiles-index.json   serialized listing
//   <file name>           one blob per profile, named by its sanitized file name

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dsc_runner_core::domain::{sanitize_file_name, ProfileSummary};
use dsc_runner_core::error::Result;
use dsc_runner_core::port::{ProfileSource, SourceError, SystemTimeProvider, TimeProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Listing snapshot file name
pub const INDEX_FILE_NAME: &str = "profiles-index.json";

/// Default time-to-live (1 hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Caching decorator over an upstream `ProfileSource`.
///
/// One store-wide mutex serializes every operation, listing and content
/// alike. That also guarantees at most one in-flight upstream fetch per key.
pub struct FileCacheStore {
    upstream: Arc<dyn ProfileSource>,
    cache_dir: PathBuf,
    ttl: Duration,
    time_provider: Arc<dyn TimeProvider>,
    lock: Mutex<()>,
}

impl FileCacheStore {
    /// Create a store over `cache_dir`, creating the directory if needed
    ///
    /// # Arguments
    /// * `upstream` - Source consulted on a miss
    /// * `cache_dir` - Dedicated cache root (everything in it is disposable)
    /// * `ttl` - Maximum entry age; zero disables caching
    pub fn new(
        upstream: Arc<dyn ProfileSource>,
        cache_dir: impl Into<PathBuf>,
        ttl: Duration,
    ) -> Result<Self> {
        Self::with_time_provider(upstream, cache_dir, ttl, Arc::new(SystemTimeProvider))
    }

    /// Same as `new`, with an injected clock for freshness checks
    pub fn with_time_provider(
        upstream: Arc<dyn ProfileSource>,
        cache_dir: impl Into<PathBuf>,
        ttl: Duration,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;

        debug!(cache_dir = %cache_dir.display(), ttl_secs = ttl.as_secs(), "Opened profile cache");

        Ok(Self {
            upstream,
            cache_dir,
            ttl,
            time_provider,
            lock: Mutex::new(()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Profile listing, from the snapshot when fresh.
    ///
    /// An unreadable or empty snapshot is a miss, never an error.
    pub async fn get_listing(&self) -> std::result::Result<Vec<ProfileSummary>, SourceError> {
        let _guard = self.lock.lock().await;
        let index = self.cache_dir.join(INDEX_FILE_NAME);

        if self.is_fresh(&index).await {
            if let Some(listing) = read_listing(&index).await {
                debug!(cache_key = INDEX_FILE_NAME, count = listing.len(), "Cache hit");
                return Ok(listing);
            }
        }

        debug!(cache_key = INDEX_FILE_NAME, "Cache miss, fetching listing");
        let listing = self.upstream.list_profiles().await?;

        match serde_json::to_vec_pretty(&listing) {
            Ok(bytes) => self.persist(&index, &bytes).await,
            Err(e) => warn!(error = %e, "Failed to serialize profile listing"),
        }

        Ok(listing)
    }

    /// Profile content, cached under the last segment of `file_name`.
    ///
    /// On a miss the upstream is asked with `file_name` unchanged.
    ///
    /// # Errors
    /// - SourceError::InvalidName if nothing remains after sanitizing
    /// - upstream errors, unchanged, on a miss
    pub async fn get_content(&self, file_name: &str) -> std::result::Result<String, SourceError> {
        let sanitized = sanitize_file_name(file_name)
            .ok_or_else(|| SourceError::InvalidName(format!("{file_name:?}")))?;

        let _guard = self.lock.lock().await;
        let path = self.cache_dir.join(sanitized);

        if self.is_fresh(&path).await {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    debug!(cache_key = sanitized, "Cache hit");
                    return Ok(content);
                }
                Err(e) => debug!(cache_key = sanitized, error = %e, "Cached blob unreadable"),
            }
        }

        debug!(cache_key = sanitized, file_name, "Cache miss, fetching content");
        let content = self.upstream.get_profile_content(file_name).await?;
        self.persist(&path, content.as_bytes()).await;

        Ok(content)
    }

    /// Delete every file in the cache directory. Best-effort: per-file
    /// failures are logged and skipped.
    pub async fn invalidate(&self) {
        let _guard = self.lock.lock().await;

        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(cache_dir = %self.cache_dir.display(), error = %e, "Cannot read cache directory");
                return;
            }
        };

        let mut removed = 0usize;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to enumerate cache directory");
                    break;
                }
            };

            let path = entry.path();
            match entry.file_type().await {
                Ok(kind) if kind.is_file() => {}
                _ => continue,
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete cached file"),
            }
        }

        info!(cache_dir = %self.cache_dir.display(), removed, "Cache invalidated");
    }

    // now - last_write <= ttl
    async fn is_fresh(&self, path: &Path) -> bool {
        if self.ttl.is_zero() {
            return false;
        }

        let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => return false,
        };

        let age = self.time_provider.now() - modified;
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => age <= ttl,
            // TTL beyond chrono's range never expires
            Err(_) => true,
        }
    }

    async fn persist(&self, path: &Path, bytes: &[u8]) {
        if let Err(e) = tokio::fs::write(path, bytes).await {
            warn!(path = %path.display(), error = %e, "Failed to write cache entry");
        }
    }
}

async fn read_listing(path: &Path) -> Option<Vec<ProfileSummary>> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice::<Option<Vec<ProfileSummary>>>(&bytes) {
        Ok(Some(listing)) if !listing.is_empty() => Some(listing),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Listing snapshot is corrupt");
            None
        }
    }
}

#[async_trait]
impl ProfileSource for FileCacheStore {
    async fn list_profiles(&self) -> std::result::Result<Vec<ProfileSummary>, SourceError> {
        self.get_listing().await
    }

    async fn get_profile_content(
        &self,
        file_name: &str,
    ) -> std::result::Result<String, SourceError> {
        self.get_content(file_name).await
    }
}
