// Subprocess runner implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dsc_runner_core::port::{InvokeError, Invocation, ProcessOutput, ProcessRunner};

/// Time a child gets to exit after SIGTERM before it is killed
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Exit code reported when the OS gives none (killed by a signal)
const NO_EXIT_CODE: i32 = -1;

type Drained = Result<std::io::Result<Vec<u8>>, JoinError>;

enum Outcome {
    Finished(std::io::Result<ExitStatus>, Drained, Drained),
    Cancelled,
    TimedOut,
}

/// Spawns one child process per call, with no stdin and fully buffered
/// stdout/stderr.
///
/// Both pipes are drained concurrently with the wait, so a chatty engine can
/// never block on a full pipe. The deadline and the cancel token cover the
/// drain too: a grandchild holding a pipe open cannot outlive them.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    grace_period: Duration,
}

impl SubprocessRunner {
    pub fn new() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Override the SIGTERM grace period (unix only; elsewhere kill is immediate)
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    fn spawn(invocation: &Invocation) -> Result<Child, InvokeError> {
        Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InvokeError::SpawnFailed(format!("{}: {}", invocation.program, e)))
    }

    /// SIGTERM first, then SIGKILL if the child outlives the grace period
    async fn terminate(&self, child: &mut Child) {
        // Already reaped; only inherited pipes were keeping the run alive
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                debug!(pid, "Sending SIGTERM");
                let exited = kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(self.grace_period, child.wait())
                        .await
                        .is_ok();
                if exited {
                    return;
                }
                warn!(pid, "Process did not exit after SIGTERM, killing");
            }
        }

        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill process");
        }
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn drain<R>(stream: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            stream.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

fn collect(drained: Drained) -> Result<String, InvokeError> {
    let bytes = drained
        .map_err(|e| InvokeError::Io(format!("output reader failed: {}", e)))?
        .map_err(|e| InvokeError::Io(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, InvokeError> {
        if cancel.is_cancelled() {
            return Err(InvokeError::Cancelled);
        }

        let started = Instant::now();
        let mut child = Self::spawn(invocation)?;

        info!(
            program = %invocation.program,
            args = ?invocation.args,
            pid = ?child.id(),
            timeout_secs = invocation.timeout.as_secs(),
            "Spawned process"
        );

        let mut stdout = drain(child.stdout.take());
        let mut stderr = drain(child.stderr.take());

        // Exit alone is not completion: the run ends once both pipes hit EOF
        let finished = async {
            let status = child.wait().await;
            let out = (&mut stdout).await;
            let err = (&mut stderr).await;
            Outcome::Finished(status, out, err)
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = tokio::time::sleep(invocation.timeout) => Outcome::TimedOut,
            finished = finished => finished,
        };

        let (status, out, err) = match outcome {
            Outcome::Finished(status, out, err) => (status, out, err),
            Outcome::Cancelled => {
                self.terminate(&mut child).await;
                stdout.abort();
                stderr.abort();
                info!(program = %invocation.program, "Process cancelled by caller");
                return Err(InvokeError::Cancelled);
            }
            Outcome::TimedOut => {
                self.terminate(&mut child).await;
                stdout.abort();
                stderr.abort();
                warn!(
                    program = %invocation.program,
                    timeout_secs = invocation.timeout.as_secs(),
                    "Process timed out"
                );
                return Err(InvokeError::TimedOut(invocation.timeout));
            }
        };

        let status = status.map_err(|e| InvokeError::Io(e.to_string()))?;

        let output = ProcessOutput {
            exit_code: status.code().unwrap_or(NO_EXIT_CODE),
            stdout: collect(out)?,
            stderr: collect(err)?,
        };

        info!(
            program = %invocation.program,
            exit_code = output.exit_code,
            duration_ms = %started.elapsed().as_millis(),
            "Process completed"
        );

        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> Invocation {
        Invocation::new("sh", ["-c", script], timeout)
    }

    fn runner() -> SubprocessRunner {
        SubprocessRunner::with_grace_period(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_captures_stdout_stderr_and_exit_code() {
        let inv = sh("echo hello; echo oops >&2; exit 3", Duration::from_secs(10));

        let output = runner().run(&inv, &CancellationToken::new()).await.unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_stdin_is_not_attached() {
        // `cat` would block forever on an inherited terminal
        let inv = Invocation::new("cat", Vec::<String>::new(), Duration::from_secs(5));

        let output = runner().run(&inv, &CancellationToken::new()).await.unwrap();

        assert!(output.success());
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_large_output_does_not_deadlock() {
        let inv = sh(
            "head -c 300000 /dev/zero | tr '\\0' a; head -c 300000 /dev/zero | tr '\\0' b >&2",
            Duration::from_secs(10),
        );

        let output = runner().run(&inv, &CancellationToken::new()).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.len(), 300_000);
        assert_eq!(output.stderr.len(), 300_000);
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_timed_out() {
        let inv = sh("sleep 10", Duration::from_millis(200));
        let started = Instant::now();

        let err = runner()
            .run(&inv, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::TimedOut(t) if t == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_caller_cancel_is_reported_as_cancelled() {
        let inv = sh("sleep 10", Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = runner().run(&inv, &cancel).await.unwrap_err();

        assert!(matches!(err, InvokeError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sigterm_ignoring_child_is_killed() {
        let inv = sh("trap '' TERM; sleep 10", Duration::from_millis(100));
        let started = Instant::now();

        let err = runner()
            .run(&inv, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    // The shell exits at once; the background sleep keeps both pipes open
    const LINGERING_GRANDCHILD: &str = "echo hi; sleep 5 &";

    #[tokio::test]
    async fn test_timeout_covers_grandchild_holding_pipes() {
        let inv = sh(LINGERING_GRANDCHILD, Duration::from_millis(300));
        let started = Instant::now();

        let err = runner()
            .run(&inv, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_cancel_covers_grandchild_holding_pipes() {
        let inv = sh(LINGERING_GRANDCHILD, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = runner().run(&inv, &cancel).await.unwrap_err();

        assert!(matches!(err, InvokeError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_skips_spawn() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner()
            .run(&sh("exit 0", Duration::from_secs(5)), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::Cancelled));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_failure() {
        let inv = Invocation::new(
            "definitely-not-a-real-engine-binary",
            ["--version"],
            Duration::from_secs(5),
        );

        let err = runner()
            .run(&inv, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            InvokeError::SpawnFailed(msg) => {
                assert!(msg.contains("definitely-not-a-real-engine-binary"))
            }
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let inv = sh("printf 'ok\\377'", Duration::from_secs(5));

        let output = runner().run(&inv, &CancellationToken::new()).await.unwrap();

        assert!(output.stdout.starts_with("ok"));
        assert!(output.stdout.contains('\u{FFFD}'));
    }
}
