// Process Runner Port
// Abstraction for launching the external configuration engine

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A single child-process launch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Hard deadline for the whole run, measured from launch
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }
}

/// Buffered output of a finished child process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Process runner errors
///
/// `Cancelled` and `TimedOut` are deliberately distinct: the first means the
/// caller asked to stop, the second that the runner's own deadline fired.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Process cancelled by caller")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(String),
}

/// Process Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns a real child process (infra-system)
/// - ScriptedRunner: replays canned outputs (tests)
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Launch the process once and wait for it to finish
    ///
    /// No stdin is attached; stdout and stderr are buffered in full.
    ///
    /// # Errors
    /// - InvokeError::SpawnFailed if the executable cannot be launched
    /// - InvokeError::Cancelled if `cancel` fires first
    /// - InvokeError::TimedOut if `invocation.timeout` elapses first
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, InvokeError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Canned behaviour for one `run` call
    #[derive(Debug, Clone)]
    pub enum Scripted {
        /// Process finished with this output
        Output(ProcessOutput),
        /// Executable could not be launched
        SpawnFailure(String),
        /// Runner deadline fired
        TimeOut,
        /// Block until the caller token fires, then report cancellation
        WaitForCancel,
    }

    /// Replays scripted outcomes in order and records every invocation
    pub struct ScriptedRunner {
        script: Mutex<VecDeque<Scripted>>,
        invocations: Arc<Mutex<Vec<Invocation>>>,
    }

    impl ScriptedRunner {
        pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                invocations: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Runner that finishes once with the given output
        pub fn with_output(exit_code: i32, stdout: &str, stderr: &str) -> Self {
            Self::new([Scripted::Output(ProcessOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            })])
        }

        pub fn invocations(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.invocations.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(
            &self,
            invocation: &Invocation,
            cancel: &CancellationToken,
        ) -> Result<ProcessOutput, InvokeError> {
            self.invocations.lock().unwrap().push(invocation.clone());

            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Output(output)) => Ok(output),
                Some(Scripted::SpawnFailure(msg)) => Err(InvokeError::SpawnFailed(msg)),
                Some(Scripted::TimeOut) => Err(InvokeError::TimedOut(invocation.timeout)),
                Some(Scripted::WaitForCancel) => {
                    cancel.cancelled().await;
                    Err(InvokeError::Cancelled)
                }
                None => Err(InvokeError::SpawnFailed(format!(
                    "no scripted response left for {}",
                    invocation.program
                ))),
            }
        }
    }
}
