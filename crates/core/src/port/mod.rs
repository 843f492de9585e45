// Port Layer - Interfaces for external dependencies

pub mod process_runner;
pub mod profile_source;
pub mod time_provider; // For deterministic cache expiry in tests

// Re-exports
pub use process_runner::{InvokeError, Invocation, ProcessOutput, ProcessRunner};
pub use profile_source::{ProfileSource, SourceError};
pub use time_provider::{SystemTimeProvider, TimeProvider};
