//! URL slug derivation

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static pattern"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("static pattern"));
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("static pattern"));

/// Derive a URL slug from a display name
///
/// Lowercases, turns whitespace runs into `-`, drops anything outside
/// `[a-z0-9_-]`, collapses repeated hyphens and trims them from both ends.
///
/// ```
/// assert_eq!(forge_entity::slugify("  Nexus UI Kit v2! "), "nexus-ui-kit-v2");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let hyphenated = WHITESPACE.replace_all(lower.trim(), "-");
    let stripped = NON_WORD.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}
