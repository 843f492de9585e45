// Profile Source Port
// Upstream fetcher for profile listings and content (GitHub, local folder, cache)

use crate::domain::ProfileSummary;
use async_trait::async_trait;
use thiserror::Error;

/// Upstream fetch errors. Callers on a cache miss see these unchanged.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid profile name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Profile source interface
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// List available profiles in upstream order
    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, SourceError>;

    /// Fetch the full text of one profile.
    ///
    /// `file_name` may carry path context the source needs.
    async fn get_profile_content(&self, file_name: &str) -> Result<String, SourceError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory source that counts upstream calls
    #[derive(Default)]
    pub struct InMemorySource {
        profiles: Mutex<Vec<ProfileSummary>>,
        contents: Mutex<HashMap<String, String>>,
        requested: Mutex<Vec<String>>,
        list_calls: AtomicUsize,
        content_calls: AtomicUsize,
        latency: Option<Duration>,
    }

    impl InMemorySource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Each call sleeps first, to widen race windows in concurrency tests
        pub fn with_latency(latency: Duration) -> Self {
            Self {
                latency: Some(latency),
                ..Self::default()
            }
        }

        /// Register a profile under the key the upstream is asked for
        pub fn add_profile(&self, file_name: &str, content: &str) {
            self.profiles
                .lock()
                .unwrap()
                .push(ProfileSummary::from_file_name(file_name));
            self.contents
                .lock()
                .unwrap()
                .insert(file_name.to_string(), content.to_string());
        }

        pub fn set_content(&self, file_name: &str, content: &str) {
            self.contents
                .lock()
                .unwrap()
                .insert(file_name.to_string(), content.to_string());
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        pub fn content_calls(&self) -> usize {
            self.content_calls.load(Ordering::SeqCst)
        }

        /// Names passed to `get_profile_content`, in call order
        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }

        async fn simulate_latency(&self) {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
        }
    }

    #[async_trait]
    impl ProfileSource for InMemorySource {
        async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, SourceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate_latency().await;
            Ok(self.profiles.lock().unwrap().clone())
        }

        async fn get_profile_content(&self, file_name: &str) -> Result<String, SourceError> {
            self.content_calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(file_name.to_string());
            self.simulate_latency().await;
            self.contents
                .lock()
                .unwrap()
                .get(file_name)
                .cloned()
                .ok_or_else(|| SourceError::NotFound(file_name.to_string()))
        }
    }
}
