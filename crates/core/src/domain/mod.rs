// Domain Layer - Pure business logic and entities

pub mod execution;
pub mod profile;

// Re-exports
pub use execution::{ExecutionMode, ExecutionResult, ResourceResult, ResourceState};
pub use profile::{
    derive_name, is_profile_file, resolve_file_name, sanitize_file_name, ProfileSummary,
};
