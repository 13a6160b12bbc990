//! Classification of automated actors.

use regex::Regex;
use std::sync::LazyLock;

/// Titles of pull requests opened on behalf of dependency-upgrade services,
/// even when the author account itself is a human's.
static DEPENDENCY_BOT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*\[?snyk\b").expect("dependency bot title pattern is valid"));

/// Returns `true` if the login or display name belongs to an automated account.
///
/// Missing identifiers are never classified as bots, so callers holding an
/// `Option<&str>` should use `name.is_some_and(is_bot)`.
#[must_use]
pub fn is_bot(name: &str) -> bool {
    name.ends_with("bot") || name.ends_with("[bot]")
}

/// Returns `true` if a pull request title matches a known dependency-bot pattern.
#[must_use]
pub fn is_dependency_bot_title(title: &str) -> bool {
    DEPENDENCY_BOT_TITLE.is_match(title)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_is_bot() {
        assert!(is_bot("release-bot"));
        assert!(is_bot("dependabot[bot]"));
        assert!(is_bot("renovatebot"));
        assert!(!is_bot("alice"));
        assert!(!is_bot("bot-herder"));
        assert!(!is_bot(""));
    }

    #[test]
    fn test_missing_identifier_is_not_bot() {
        let name: Option<&str> = None;
        assert!(!name.is_some_and(is_bot));
    }

    #[test]
    fn test_dependency_bot_titles() {
        assert!(is_dependency_bot_title("Snyk: upgrade lodash"));
        assert!(is_dependency_bot_title("[Snyk] Security upgrade axios from 0.21.1 to 0.21.2"));
        assert!(is_dependency_bot_title("  snyk: fix vulnerabilities"));
        assert!(!is_dependency_bot_title("Fix snyk integration"));
        assert!(!is_dependency_bot_title("Snykish refactor"));
        assert!(!is_dependency_bot_title("Add retry to uploader"));
    }
}
