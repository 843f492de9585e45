// ANSI SGR stripping

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

// The regex crate matches in linear time, so hostile process output cannot
// trigger catastrophic backtracking.
const SGR_PATTERN: &str = r"\x1B\[[0-9]{1,3}(?:;[0-9]{1,3})*m";

fn sgr_regex() -> &'static Regex {
    static SGR: OnceLock<Regex> = OnceLock::new();
    SGR.get_or_init(|| Regex::new(SGR_PATTERN).expect("SGR pattern is a valid regex"))
}

/// Remove colour/style escape sequences (`ESC [ n ; n m`) from `text`.
///
/// Borrows when there is nothing to strip.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    sgr_regex().replace_all(text, "")
}
