// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod execution;
pub mod probe;
pub mod profile;

// Re-exports
pub use execution::{build_result, classify_output, ExecutionService};
pub use probe::{extract_version, probe_engine, EngineInfo};
pub use profile::{cleanup_staging, ProfileService, StagedProfile};
