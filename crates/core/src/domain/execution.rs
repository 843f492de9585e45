// Execution Domain Model

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Execution Mode
///
/// `Test` is read-only; `Apply` may mutate system state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionMode {
    Test,
    Apply,
}

impl ExecutionMode {
    /// Engine sub-command for this mode (`dsc config <sub-command>`)
    pub fn sub_command(&self) -> &'static str {
        match self {
            ExecutionMode::Test => "test",
            ExecutionMode::Apply => "set",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Test => write!(f, "test"),
            ExecutionMode::Apply => write!(f, "apply"),
        }
    }
}

/// Resource State (exactly one per resource result)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    Compliant,
    NonCompliant,
    Changed,
    Executed,
    Failed,
    Skipped,
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceState::Compliant => write!(f, "COMPLIANT"),
            ResourceState::NonCompliant => write!(f, "NON_COMPLIANT"),
            ResourceState::Changed => write!(f, "CHANGED"),
            ResourceState::Executed => write!(f, "EXECUTED"),
            ResourceState::Failed => write!(f, "FAILED"),
            ResourceState::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Outcome for a single resource within a profile run.
///
/// Built once by the classifier or a synthetic-failure path. Fields are only
/// readable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResult {
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    state: ResourceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, with = "millis::option", skip_serializing_if = "Option::is_none")]
    duration: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_text: Option<String>,
}

impl ResourceResult {
    pub fn new(
        name: impl Into<String>,
        resource_type: impl Into<String>,
        state: ResourceState,
    ) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            state,
            error_message: None,
            duration: None,
            status_text: None,
        }
    }

    /// Failed resource carrying an error message
    pub fn failed(
        name: impl Into<String>,
        resource_type: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            error_message: Some(error_message.into()),
            ..Self::new(name, resource_type, ResourceState::Failed)
        }
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = Some(status_text.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }
}

/// Aggregate outcome of one engine run against one profile.
///
/// `success` comes from the engine exit code only. It is NOT derived from
/// the resource states: a batch may succeed with Failed resources in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    profile_name: String,
    mode: ExecutionMode,
    success: bool,
    results: Vec<ResourceResult>,
    #[serde(with = "millis")]
    duration: Duration,
}

impl ExecutionResult {
    pub fn new(
        profile_name: impl Into<String>,
        mode: ExecutionMode,
        success: bool,
        results: Vec<ResourceResult>,
        duration: Duration,
    ) -> Self {
        Self {
            profile_name: profile_name.into(),
            mode,
            success,
            results,
            duration,
        }
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn results(&self) -> &[ResourceResult] {
        &self.results
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Number of resources in the given state
    pub fn count(&self, state: ResourceState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }
}

/// Durations as whole milliseconds on the wire
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match duration {
                Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
        }
    }
}
