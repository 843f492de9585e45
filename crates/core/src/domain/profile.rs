// Profile Domain Model

use serde::{Deserialize, Serialize};

/// File suffix shared by all configuration profiles
pub const PROFILE_SUFFIX: &str = ".dsc.yaml";

/// Suffix appended to bare profile names (`dotnet` -> `dotnet-configuration.dsc.yaml`)
pub const DEFAULT_PROFILE_FILE_SUFFIX: &str = "-configuration.dsc.yaml";

/// Listing entry for a profile, available without downloading its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub file_name: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProfileSummary {
    /// Summary whose display name is derived from the file name
    pub fn from_file_name(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let name = derive_name(&file_name);
        Self {
            file_name,
            name,
            description: None,
        }
    }
}

/// True if `file_name` carries the profile suffix (case-insensitive)
pub fn is_profile_file(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(PROFILE_SUFFIX)
}

/// Map a user-supplied profile reference to its file name
pub fn resolve_file_name(profile: &str) -> String {
    if is_profile_file(profile) {
        profile.to_string()
    } else {
        format!("{}{}", profile, DEFAULT_PROFILE_FILE_SUFFIX)
    }
}

/// Human-readable name for a profile file
///
/// `dotnet-configuration.dsc.yaml` -> `dotnet configuration`
pub fn derive_name(file_name: &str) -> String {
    let base = last_segment(file_name);
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };

    remove_ignore_ascii_case(stem, ".dsc")
        .replace('-', " ")
        .replace('_', " ")
}

/// Reduce a possibly path-like name to its final segment.
///
/// Returns `None` when nothing usable remains (`""`, `"dir/"`, `".."`).
pub fn sanitize_file_name(name: &str) -> Option<&str> {
    match last_segment(name) {
        "" | "." | ".." => None,
        segment => Some(segment),
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

// ASCII lowercasing keeps byte offsets, so indices map back onto `haystack`
fn remove_ignore_ascii_case(haystack: &str, needle: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(needle) {
        let start = cursor + found;
        out.push_str(&haystack[cursor..start]);
        cursor = start + needle.len();
    }
    out.push_str(&haystack[cursor..]);
    out
}
