// DSC Runner Infrastructure - Profile Cache
// Implements: ProfileSource (caching decorator over an upstream source)

pub mod file_cache;

pub use file_cache::{FileCacheStore, DEFAULT_TTL, INDEX_FILE_NAME};
