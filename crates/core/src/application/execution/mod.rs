// Execution Service - runs the configuration engine against one profile file

pub mod classify;

pub use classify::classify_output;

use crate::application::constants::{
    ENGINE_TRACE_LEVEL, EXECUTION_TIMEOUT, EXECUTION_TIMEOUT_MESSAGE,
};
use crate::domain::{derive_name, ExecutionMode, ExecutionResult, ResourceResult};
use crate::error::{AppError, Result};
use crate::port::{InvokeError, Invocation, ProcessOutput, ProcessRunner};
use crate::text::strip_ansi;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Composes a ProcessRunner and the output classifier into Test/Apply.
///
/// Every outcome except caller cancellation is returned as an
/// `ExecutionResult`, so batch callers always get something renderable.
pub struct ExecutionService {
    runner: Arc<dyn ProcessRunner>,
    engine: String,
}

impl ExecutionService {
    /// Create a new execution service
    ///
    /// # Arguments
    /// * `runner` - Process runner used to launch the engine
    /// * `engine` - Engine executable (e.g. `dsc`)
    pub fn new(runner: Arc<dyn ProcessRunner>, engine: impl Into<String>) -> Self {
        Self {
            runner,
            engine: engine.into(),
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Evaluate current vs. desired state (read-only)
    pub async fn test(
        &self,
        file_path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        self.execute(file_path.as_ref(), ExecutionMode::Test, cancel)
            .await
    }

    /// Bring the system to the desired state (mutating)
    pub async fn apply(
        &self,
        file_path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        self.execute(file_path.as_ref(), ExecutionMode::Apply, cancel)
            .await
    }

    /// Shared routine behind `test` and `apply`
    ///
    /// # Errors
    /// Only `AppError::Cancelled`, when `cancel` fires.
    pub async fn execute(
        &self,
        file_path: &Path,
        mode: ExecutionMode,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let path = file_path.to_string_lossy().into_owned();
        let profile_name = derive_name(&path);
        let invocation = self.invocation(&path, mode);

        info!(
            profile = %profile_name,
            mode = %mode,
            engine = %self.engine,
            "Starting engine run"
        );

        let started = Instant::now();
        let outcome = self.runner.run(&invocation, cancel).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(output) => {
                let result = build_result(output, profile_name, mode, elapsed);
                info!(
                    profile = %result.profile_name(),
                    success = result.success(),
                    resources = result.results().len(),
                    duration_ms = %elapsed.as_millis(),
                    "Engine run completed"
                );
                Ok(result)
            }
            // A deadline that races a caller cancel is still the caller's cancel
            Err(_) if cancel.is_cancelled() => {
                info!(profile = %profile_name, "Engine run cancelled by caller");
                Err(AppError::Cancelled)
            }
            Err(InvokeError::Cancelled) => Err(AppError::Cancelled),
            Err(InvokeError::TimedOut(timeout)) => {
                warn!(
                    profile = %profile_name,
                    timeout_secs = timeout.as_secs(),
                    "Engine run timed out"
                );
                Ok(failed_result(
                    profile_name,
                    mode,
                    elapsed,
                    EXECUTION_TIMEOUT_MESSAGE,
                ))
            }
            Err(InvokeError::SpawnFailed(message)) | Err(InvokeError::Io(message)) => {
                error!(
                    profile = %profile_name,
                    engine = %self.engine,
                    error = %message,
                    "Engine could not be run"
                );
                Ok(failed_result(profile_name, mode, elapsed, message))
            }
        }
    }

    fn invocation(&self, path: &str, mode: ExecutionMode) -> Invocation {
        Invocation::new(
            self.engine.as_str(),
            [
                "--trace-level",
                ENGINE_TRACE_LEVEL,
                "config",
                mode.sub_command(),
                "--file",
                path,
            ],
            EXECUTION_TIMEOUT,
        )
    }
}

/// Classify a finished run, surfacing stderr only when nothing else explains
/// the failure.
///
/// The fallback needs all three: non-zero exit, zero classified resources,
/// non-blank stderr. Any other combination returns the classified list as is.
pub fn build_result(
    output: ProcessOutput,
    profile_name: String,
    mode: ExecutionMode,
    elapsed: Duration,
) -> ExecutionResult {
    let success = output.success();
    let mut results = classify_output(&output.stdout, mode);

    if !success && results.is_empty() && !output.stderr.trim().is_empty() {
        let message = strip_ansi(&output.stderr).trim().to_string();
        results.push(ResourceResult::failed("dsc", "error", message));
    }

    ExecutionResult::new(profile_name, mode, success, results, elapsed)
}

fn failed_result(
    profile_name: String,
    mode: ExecutionMode,
    elapsed: Duration,
    message: impl Into<String>,
) -> ExecutionResult {
    ExecutionResult::new(
        profile_name,
        mode,
        false,
        vec![ResourceResult::failed("execution", "error", message)],
        elapsed,
    )
}
