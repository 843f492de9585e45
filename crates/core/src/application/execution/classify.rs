// Engine output classification
//
// Pure mapping from `dsc config test|set` stdout to per-resource results.

use crate::domain::{ExecutionMode, ResourceResult, ResourceState};
use crate::text::parse_iso_duration;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse output as JSON";
pub const NO_RESULT_MESSAGE: &str = "No result in output";

const UNKNOWN: &str = "unknown";
const SET_ONLY_MARKER: &str = "runcommandonset";
const SCRIPT_MARKER: &str = "script";

/// Turn raw engine stdout into one result per declared resource.
///
/// Never fails: unparseable output becomes a single `parse-error` resource.
pub fn classify_output(stdout: &str, mode: ExecutionMode) -> Vec<ResourceResult> {
    if stdout.trim().is_empty() {
        return Vec::new();
    }

    let document: Value = match serde_json::from_str(stdout) {
        Ok(document) => document,
        Err(e) => {
            debug!(error = %e, "Engine output is not valid JSON");
            return vec![ResourceResult::failed(
                "output",
                "parse-error",
                PARSE_ERROR_MESSAGE,
            )];
        }
    };

    let Some(items) = document.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| classify_resource(item, mode))
        .collect()
}

fn classify_resource(item: &Value, mode: ExecutionMode) -> ResourceResult {
    let name = string_or_unknown(item.get("name"));
    let resource_type = string_or_unknown(item.get("type"));
    let duration = resource_duration(item);

    let Some(result) = item.get("result").filter(|r| r.is_object()) else {
        return ResourceResult::failed(name, resource_type, NO_RESULT_MESSAGE)
            .with_duration(duration);
    };

    let (state, status_text) = match mode {
        ExecutionMode::Test => test_state(result, &resource_type),
        ExecutionMode::Apply => apply_state(result, &resource_type),
    };

    ResourceResult::new(name, resource_type, state)
        .with_duration(duration)
        .with_status_text(status_text)
}

fn test_state(result: &Value, resource_type: &str) -> (ResourceState, &'static str) {
    // Set-only resources have no test capability, whatever the payload says
    if type_contains(resource_type, SET_ONLY_MARKER) {
        return (ResourceState::Skipped, "set only");
    }

    let in_desired_state = result
        .get("inDesiredState")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if in_desired_state {
        (ResourceState::Compliant, "in desired state")
    } else {
        (ResourceState::NonCompliant, "not in desired state")
    }
}

fn apply_state(result: &Value, resource_type: &str) -> (ResourceState, &'static str) {
    let has_changes = result
        .get("changedProperties")
        .and_then(Value::as_array)
        .is_some_and(|props| !props.is_empty());

    if has_changes {
        return (ResourceState::Changed, "changed");
    }

    // Script-like resources report no idempotence signal
    if type_contains(resource_type, SET_ONLY_MARKER) || type_contains(resource_type, SCRIPT_MARKER)
    {
        (ResourceState::Executed, "executed")
    } else {
        (ResourceState::Compliant, "no changes")
    }
}

fn resource_duration(item: &Value) -> Option<Duration> {
    item.get("metadata")?
        .get("Microsoft.DSC")?
        .get("duration")?
        .as_str()
        .and_then(parse_iso_duration)
}

fn string_or_unknown(value: Option<&Value>) -> String {
    match value.and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

// `marker` must already be lowercase
fn type_contains(resource_type: &str, marker: &str) -> bool {
    resource_type.to_lowercase().contains(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(stdout: &str, mode: ExecutionMode) -> ResourceResult {
        let mut results = classify_output(stdout, mode);
        assert_eq!(results.len(), 1, "expected exactly one result");
        results.remove(0)
    }

    fn doc(item: Value) -> String {
        json!({ "results": [item] }).to_string()
    }

    #[test]
    fn test_blank_output_is_empty() {
        assert!(classify_output("", ExecutionMode::Test).is_empty());
        assert!(classify_output("  \n\t ", ExecutionMode::Apply).is_empty());
    }

    #[test]
    fn test_invalid_json_is_single_parse_error() {
        for stdout in ["not json", "{\"results\": [", "<xml/>"] {
            let result = single(stdout, ExecutionMode::Test);
            assert_eq!(result.name(), "output");
            assert_eq!(result.resource_type(), "parse-error");
            assert_eq!(result.state(), ResourceState::Failed);
            assert_eq!(result.error_message(), Some(PARSE_ERROR_MESSAGE));
        }
    }

    #[test]
    fn test_document_without_results_is_empty() {
        assert!(classify_output("{}", ExecutionMode::Test).is_empty());
        assert!(classify_output(r#"{"results": {}}"#, ExecutionMode::Test).is_empty());
        assert!(classify_output("[1, 2]", ExecutionMode::Apply).is_empty());
    }

    #[test]
    fn test_end_to_end_not_in_desired_state() {
        let stdout = r#"{"results":[{"name":"Install Git","type":"Microsoft.WinGet/Package","result":{"inDesiredState":false}}]}"#;

        let result = single(stdout, ExecutionMode::Test);

        assert_eq!(result.name(), "Install Git");
        assert_eq!(result.resource_type(), "Microsoft.WinGet/Package");
        assert_eq!(result.state(), ResourceState::NonCompliant);
        assert_eq!(result.status_text(), Some("not in desired state"));
        assert!(result.error_message().is_none());
    }

    #[test]
    fn test_in_desired_state_is_compliant() {
        let stdout = doc(json!({
            "name": "Git",
            "type": "Microsoft.WinGet/Package",
            "result": { "inDesiredState": true }
        }));

        let result = single(&stdout, ExecutionMode::Test);
        assert_eq!(result.state(), ResourceState::Compliant);
        assert_eq!(result.status_text(), Some("in desired state"));
    }

    #[test]
    fn test_missing_in_desired_state_counts_as_false() {
        let stdout = doc(json!({ "name": "x", "type": "y", "result": {} }));
        assert_eq!(
            single(&stdout, ExecutionMode::Test).state(),
            ResourceState::NonCompliant
        );
    }

    #[test]
    fn test_set_only_resources_are_skipped_in_test_mode() {
        for resource_type in [
            "Microsoft.DSC.Transitional/RunCommandOnSet",
            "microsoft.dsc.transitional/runcommandonset",
            "X/RUNCOMMANDONSET",
        ] {
            let stdout = doc(json!({
                "name": "script",
                "type": resource_type,
                "result": { "inDesiredState": true }
            }));

            let result = single(&stdout, ExecutionMode::Test);
            assert_eq!(result.state(), ResourceState::Skipped);
            assert_eq!(result.status_text(), Some("set only"));
        }
    }

    #[test]
    fn test_missing_result_is_failed_with_duration() {
        let stdout = doc(json!({
            "name": "Broken",
            "type": "Some/Type",
            "metadata": { "Microsoft.DSC": { "duration": "PT2S" } }
        }));

        let result = single(&stdout, ExecutionMode::Apply);
        assert_eq!(result.state(), ResourceState::Failed);
        assert_eq!(result.error_message(), Some(NO_RESULT_MESSAGE));
        assert_eq!(result.duration(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_missing_result_wins_over_set_only() {
        let stdout = doc(json!({ "name": "s", "type": "X/RunCommandOnSet" }));
        assert_eq!(
            single(&stdout, ExecutionMode::Test).state(),
            ResourceState::Failed
        );
    }

    #[test]
    fn test_name_and_type_default_to_unknown() {
        let stdout = doc(json!({ "name": "", "result": { "inDesiredState": true } }));

        let result = single(&stdout, ExecutionMode::Test);
        assert_eq!(result.name(), "unknown");
        assert_eq!(result.resource_type(), "unknown");
    }

    #[test]
    fn test_invalid_duration_is_silently_dropped() {
        let stdout = doc(json!({
            "name": "x",
            "type": "y",
            "metadata": { "Microsoft.DSC": { "duration": "soon" } },
            "result": { "inDesiredState": true }
        }));

        let result = single(&stdout, ExecutionMode::Test);
        assert!(result.duration().is_none());
        assert_eq!(result.state(), ResourceState::Compliant);
    }

    #[test]
    fn test_apply_changed_properties() {
        let stdout = doc(json!({
            "name": "Dark mode",
            "type": "Microsoft.Windows/Registry",
            "metadata": { "Microsoft.DSC": { "duration": "PT0.5S" } },
            "result": { "changedProperties": ["valueData"] }
        }));

        let result = single(&stdout, ExecutionMode::Apply);
        assert_eq!(result.state(), ResourceState::Changed);
        assert_eq!(result.status_text(), Some("changed"));
        assert_eq!(result.duration(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_apply_script_resources_are_executed() {
        for resource_type in [
            "Microsoft.DSC.Transitional/RunCommandOnSet",
            "Microsoft.DSC.Transitional/PowerShellScript",
            "custom/SCRIPT",
        ] {
            let stdout = doc(json!({
                "name": "run",
                "type": resource_type,
                "result": { "changedProperties": [] }
            }));

            let result = single(&stdout, ExecutionMode::Apply);
            assert_eq!(result.state(), ResourceState::Executed, "{resource_type}");
            assert_eq!(result.status_text(), Some("executed"));
        }
    }

    #[test]
    fn test_apply_without_changes_is_compliant() {
        let stdout = doc(json!({
            "name": "Git",
            "type": "Microsoft.WinGet/Package",
            "result": { "afterState": {} }
        }));

        let result = single(&stdout, ExecutionMode::Apply);
        assert_eq!(result.state(), ResourceState::Compliant);
        assert_eq!(result.status_text(), Some("no changes"));
    }

    #[test]
    fn test_changes_win_over_script_type() {
        let stdout = doc(json!({
            "name": "run",
            "type": "X/Script",
            "result": { "changedProperties": ["a"] }
        }));
        assert_eq!(
            single(&stdout, ExecutionMode::Apply).state(),
            ResourceState::Changed
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let stdout = json!({
            "results": [
                { "name": "first", "type": "t", "result": { "inDesiredState": true } },
                { "name": "second", "type": "t" },
                { "name": "third", "type": "t", "result": { "inDesiredState": false } }
            ]
        })
        .to_string();

        let results = classify_output(&stdout, ExecutionMode::Test);
        let names: Vec<_> = results.iter().map(|r| r.name()).collect();
        let states: Vec<_> = results.iter().map(|r| r.state()).collect();

        assert_eq!(names, ["first", "second", "third"]);
        assert_eq!(
            states,
            [
                ResourceState::Compliant,
                ResourceState::Failed,
                ResourceState::NonCompliant
            ]
        );
    }
}
