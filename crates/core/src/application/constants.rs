// Application constants (No magic values)
use std::time::Duration;

/// Default engine executable, resolved through PATH
pub const DEFAULT_ENGINE: &str = "dsc";

/// Hard deadline for one `config test|set` run (10 minutes)
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Message attached to the synthetic result when the deadline fires
pub const EXECUTION_TIMEOUT_MESSAGE: &str = "DSC operation timed out after 10 minutes";

/// Deadline for the `--version` probe (10 seconds)
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine trace level; anything chattier pollutes stderr
pub const ENGINE_TRACE_LEVEL: &str = "error";
