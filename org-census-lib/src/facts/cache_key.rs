use core::fmt::{Display, Formatter};
use strum::IntoStaticStr;

/// The memoizable operations, each owning a distinct leading key segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Contributors,
    FindFiles,
    FileContent,
    LastCommitExcludingBots,
    LastPullRequestExcludingBots,
    LastIssueExcludingBots,
    IssuesInPastYear,
    PrsInPastYear,
    RepositoriesForOrg,
}

impl Operation {
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Identifies one memoizable computation: `{operation}/{param}/{param}...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: Operation,
    key: String,
}

impl CacheKey {
    pub fn new<I, S>(operation: Operation, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut key = String::from(operation.name());
        for param in params {
            key.push('/');
            key.push_str(param.as_ref());
        }

        Self { operation, key }
    }

    /// Key for an operation scoped to one repository.
    #[must_use]
    pub fn repo(operation: Operation, owner: &str, repo: &str) -> Self {
        Self::new(operation, [owner, repo])
    }

    /// Key for an operation scoped to one repository and a sub-resource such as a path.
    #[must_use]
    pub fn repo_resource(operation: Operation, owner: &str, repo: &str, resource: &str) -> Self {
        Self::new(operation, [owner, repo, resource])
    }

    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Everything after the operation name, without the leading delimiter.
    #[must_use]
    pub fn params(&self) -> &str {
        self.key
            .strip_prefix(self.operation.name())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or_default()
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_repo_keys() {
        assert_eq!(
            CacheKey::repo(Operation::Contributors, "Soluto", "kamus").as_str(),
            "contributors/Soluto/kamus"
        );
        assert_eq!(
            CacheKey::repo(Operation::LastPullRequestExcludingBots, "o", "r").as_str(),
            "last_pull_request_excluding_bots/o/r"
        );
        assert_eq!(CacheKey::repo(Operation::PrsInPastYear, "o", "r").as_str(), "prs_in_past_year/o/r");
        assert_eq!(CacheKey::repo(Operation::IssuesInPastYear, "o", "r").as_str(), "issues_in_past_year/o/r");
    }

    #[test]
    fn test_resource_keys() {
        assert_eq!(
            CacheKey::repo_resource(Operation::FindFiles, "o", "r", "package.json").as_str(),
            "find_files/o/r/package.json"
        );
        assert_eq!(
            CacheKey::repo_resource(Operation::FileContent, "o", "r", "web/package.json").as_str(),
            "file_content/o/r/web/package.json"
        );
    }

    #[test]
    fn test_org_key() {
        let key = CacheKey::new(Operation::RepositoriesForOrg, ["Soluto"]);
        assert_eq!(key.to_string(), "repositories_for_org/Soluto");
        assert_eq!(key.params(), "Soluto");
        assert_eq!(key.operation(), Operation::RepositoriesForOrg);
    }

    #[test]
    fn test_identical_inputs_share_a_key() {
        assert_eq!(
            CacheKey::repo(Operation::Contributors, "o", "r"),
            CacheKey::repo(Operation::Contributors, "o", "r")
        );
    }

    #[test]
    fn test_distinct_operations_never_collide() {
        let ops = [
            Operation::Contributors,
            Operation::LastCommitExcludingBots,
            Operation::LastPullRequestExcludingBots,
            Operation::LastIssueExcludingBots,
            Operation::IssuesInPastYear,
            Operation::PrsInPastYear,
        ];

        let keys: std::collections::HashSet<_> = ops.iter().map(|op| CacheKey::repo(*op, "o", "r").to_string()).collect();
        assert_eq!(keys.len(), ops.len());
    }
}
