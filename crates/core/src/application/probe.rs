// Engine Probe - is the configuration engine installed, and which version?

use crate::application::constants::PROBE_TIMEOUT;
use crate::error::{AppError, Result};
use crate::port::{InvokeError, Invocation, ProcessRunner};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Engine availability as seen by `<engine> --version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
    pub engine: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Run `<engine> --version` once.
///
/// Launch failure, timeout and non-zero exit all report `available: false`.
///
/// # Errors
/// `AppError::Cancelled` if `cancel` fires first.
pub async fn probe_engine(
    runner: &dyn ProcessRunner,
    engine: &str,
    cancel: &CancellationToken,
) -> Result<EngineInfo> {
    let invocation = Invocation::new(engine, ["--version"], PROBE_TIMEOUT);

    let unavailable = || EngineInfo {
        engine: engine.to_string(),
        available: false,
        version: None,
    };

    match runner.run(&invocation, cancel).await {
        Ok(output) if output.success() => {
            let version = extract_version(&output.stdout);
            debug!(engine, version = ?version, "Engine probe succeeded");
            Ok(EngineInfo {
                engine: engine.to_string(),
                available: true,
                version,
            })
        }
        Ok(output) => {
            warn!(engine, exit_code = output.exit_code, "Engine probe exited non-zero");
            Ok(unavailable())
        }
        Err(_) if cancel.is_cancelled() => Err(AppError::Cancelled),
        Err(InvokeError::Cancelled) => Err(AppError::Cancelled),
        Err(e) => {
            warn!(engine, error = %e, "Engine probe failed");
            Ok(unavailable())
        }
    }
}

/// Version text from `--version` output: `"dsc 3.0.0"` -> `"3.0.0"`.
///
/// Only the first line counts. Without a space the whole trimmed line is
/// the version; blank output has none.
pub fn extract_version(stdout: &str) -> Option<String> {
    let line = stdout.trim().lines().next()?.trim();
    if line.is_empty() {
        return None;
    }

    let version = match line.split_once(' ') {
        Some((_, rest)) => rest.trim(),
        None => line,
    };
    Some(version.to_string())
}
