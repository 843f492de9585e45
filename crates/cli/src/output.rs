// Terminal rendering for command results

use colored::{ColoredString, Colorize};
use dsc_runner_core::application::EngineInfo;
use dsc_runner_core::domain::{ExecutionResult, ProfileSummary, ResourceResult, ResourceState};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "File")]
    file: String,
}

pub fn profiles_table(profiles: &[ProfileSummary]) -> String {
    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|p| ProfileRow {
            name: p.name.clone(),
            file: p.file_name.clone(),
        })
        .collect();

    Table::new(rows).to_string()
}

fn state_icon(state: ResourceState) -> ColoredString {
    match state {
        ResourceState::Compliant => "✓".green(),
        ResourceState::NonCompliant => "!".yellow(),
        ResourceState::Changed => "~".cyan(),
        ResourceState::Executed => ">".cyan(),
        ResourceState::Failed => "✗".red(),
        ResourceState::Skipped => "-".dimmed(),
    }
}

fn resource_lines(resource: &ResourceResult, verbose: bool) -> Vec<String> {
    let mut line = format!(
        "    {} {} {}",
        state_icon(resource.state()),
        resource.name(),
        resource.resource_type().dimmed()
    );
    if verbose {
        if let Some(status) = resource.status_text() {
            line.push_str(&format!(" {}", format!("[{}]", status).dimmed()));
        }
        if let Some(duration) = resource.duration() {
            line.push_str(&format!(" {}", format!("({}ms)", duration.as_millis()).dimmed()));
        }
    }

    let mut lines = vec![line];
    if let Some(message) = resource.error_message() {
        lines.push(format!("      {}", message.red()));
    }
    lines
}

/// One profile: PASS/FAIL header, then resources.
///
/// Passing profiles list their resources only in verbose mode.
pub fn format_result(result: &ExecutionResult, verbose: bool) -> String {
    let status = if result.success() {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };

    let mut lines = vec![format!(
        "  {} {} {}",
        status,
        result.profile_name(),
        format!("({:.1}s)", result.duration().as_secs_f64()).dimmed()
    )];

    if verbose || !result.success() {
        for resource in result.results() {
            lines.extend(resource_lines(resource, verbose));
        }
    }

    lines.join("\n")
}

pub fn format_summary(results: &[ExecutionResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.success()).count();
    format!(
        "  {} {} passed, {} failed, {} total",
        "Results:".bold(),
        passed,
        total - passed,
        total
    )
}

pub fn format_engine(info: &EngineInfo) -> String {
    if info.available {
        format!(
            "  {} {} {}",
            "✓".green(),
            info.engine,
            info.version.as_deref().unwrap_or("(unknown version)")
        )
    } else {
        format!("  {} {} not found", "✗".red(), info.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsc_runner_core::domain::ExecutionMode;
    use std::time::Duration;

    fn plain() {
        colored::control::set_override(false);
    }

    fn sample(success: bool) -> ExecutionResult {
        ExecutionResult::new(
            "git configuration",
            ExecutionMode::Test,
            success,
            vec![
                ResourceResult::new("Git", "Microsoft.WinGet/Package", ResourceState::Compliant)
                    .with_status_text("in desired state")
                    .with_duration(Some(Duration::from_millis(120))),
                ResourceResult::failed("dsc", "error", "boom"),
            ],
            Duration::from_millis(1500),
        )
    }

    #[test]
    fn test_profiles_table_lists_name_and_file() {
        plain();
        let table = profiles_table(&[ProfileSummary::from_file_name("git-configuration.dsc.yaml")]);

        assert!(table.contains("Name"));
        assert!(table.contains("git configuration"));
        assert!(table.contains("git-configuration.dsc.yaml"));
    }

    #[test]
    fn test_passing_result_hides_resources_unless_verbose() {
        plain();
        let result = sample(true);

        let brief = format_result(&result, false);
        assert_eq!(brief, "  PASS git configuration (1.5s)");

        let verbose = format_result(&result, true);
        assert!(verbose.contains("✓ Git Microsoft.WinGet/Package [in desired state] (120ms)"));
    }

    #[test]
    fn test_failing_result_shows_errors() {
        plain();
        let text = format_result(&sample(false), false);

        assert!(text.starts_with("  FAIL git configuration"));
        assert!(text.contains("✗ dsc error"));
        assert!(text.contains("      boom"));
    }

    #[test]
    fn test_summary_counts() {
        plain();
        let summary = format_summary(&[sample(true), sample(false), sample(true)]);
        assert_eq!(summary, "  Results: 2 passed, 1 failed, 3 total");
    }
}
