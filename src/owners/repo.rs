//! An [`OwnersTree`] held in memory, loaded from a TOML description of the
//! repository's OWNERS files.
//!
//! ```toml
//! filename = "OWNERS"
//!
//! [owners.""]
//! approvers = ["alice", "bob"]
//!
//! [owners."src/net"]
//! approvers = ["carol"]
//! no-parent-owners = true
//! auto-approve-unowned-subfolders = true
//! ```

use super::{OwnersTree, parent_dir};
use crate::config::ConfigurationError;
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_OWNERS_FILENAME: &str = "OWNERS";

fn default_owners_filename() -> String {
    DEFAULT_OWNERS_FILENAME.to_string()
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
struct OwnersDescription {
    #[serde(default = "default_owners_filename")]
    filename: String,
    #[serde(default)]
    owners: BTreeMap<String, OwnersEntry>,
}

/// The contents of one OWNERS file.
#[derive(PartialEq, Eq, Debug, Default, Clone, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OwnersEntry {
    #[serde(default)]
    pub approvers: BTreeSet<String>,
    #[serde(default)]
    pub no_parent_owners: bool,
    #[serde(default)]
    pub auto_approve_unowned_subfolders: bool,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct RepoOwners {
    filename: String,
    /// Normalized directory -> entry. Approver logins are lowercase.
    entries: BTreeMap<String, OwnersEntry>,
}

/// Strips `./` and surrounding slashes so that `./src/` and `src` name the
/// same directory.
fn normalize_dir(dir: &str) -> String {
    let dir = dir.trim();
    let dir = dir.strip_prefix("./").unwrap_or(dir);
    let dir = dir.trim_matches('/');
    if dir == "." {
        String::new()
    } else {
        dir.to_string()
    }
}

impl RepoOwners {
    pub fn new(filename: impl Into<String>) -> RepoOwners {
        RepoOwners {
            filename: filename.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Parses the TOML description shown in the module documentation.
    pub fn from_toml(contents: &str) -> Result<RepoOwners, ConfigurationError> {
        let description: OwnersDescription =
            toml::from_str(contents).map_err(ConfigurationError::Toml)?;
        let mut repo = RepoOwners::new(description.filename);
        for (dir, entry) in description.owners {
            let normalized = normalize_dir(&dir);
            if repo.entries.contains_key(&normalized) {
                return Err(ConfigurationError::Invalid(format!(
                    "directory `{dir}` is declared more than once"
                )));
            }
            repo.insert(&normalized, entry);
        }
        tracing::debug!("loaded {} OWNERS entries", repo.entries.len());
        Ok(repo)
    }

    /// Declares (or replaces) the OWNERS file of `dir`.
    pub fn insert(&mut self, dir: &str, mut entry: OwnersEntry) {
        entry.approvers = entry
            .approvers
            .iter()
            .map(|login| login.to_lowercase())
            .collect();
        self.entries.insert(normalize_dir(dir), entry);
    }
}

impl OwnersTree for RepoOwners {
    fn approvers(&self, path: &str) -> BTreeSet<String> {
        let mut approvers = BTreeSet::new();
        let mut path = path;
        loop {
            if let Some(entry) = self.entries.get(path) {
                approvers.extend(entry.approvers.iter().cloned());
                if entry.no_parent_owners {
                    break;
                }
            }
            if path.is_empty() {
                break;
            }
            path = parent_dir(path);
        }
        approvers
    }

    fn leaf_approvers(&self, path: &str) -> BTreeSet<String> {
        self.entries
            .get(path)
            .map(|entry| entry.approvers.clone())
            .unwrap_or_default()
    }

    fn find_approver_owners_for_file(&self, file: &str) -> String {
        let mut dir = parent_dir(file);
        while !dir.is_empty() {
            if self
                .entries
                .get(dir)
                .is_some_and(|entry| !entry.approvers.is_empty())
            {
                return dir.to_string();
            }
            dir = parent_dir(dir);
        }
        String::new()
    }

    fn is_no_parent_owners(&self, path: &str) -> bool {
        self.entries
            .get(path)
            .is_some_and(|entry| entry.no_parent_owners)
    }

    fn is_auto_approve_unowned_subfolders(&self, dir: &str) -> bool {
        self.entries
            .get(dir)
            .is_some_and(|entry| entry.auto_approve_unowned_subfolders)
    }

    fn owners_filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RepoOwners {
        RepoOwners::from_toml(
            r#"
            [owners.""]
            approvers = ["Alice", "bob"]

            [owners."a"]
            approvers = ["carl"]

            [owners."./a/b/"]
            approvers = ["dan"]
            no-parent-owners = true

            [owners."a/b/c"]
            approvers = ["erin"]

            [owners."docs"]
            auto-approve-unowned-subfolders = true
            "#,
        )
        .unwrap()
    }

    fn set(logins: &[&str]) -> BTreeSet<String> {
        logins.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn inherited_approvers() {
        let repo = sample();
        assert_eq!(repo.approvers(""), set(&["alice", "bob"]));
        assert_eq!(repo.approvers("a"), set(&["alice", "bob", "carl"]));
        assert_eq!(repo.approvers("a/x/y"), set(&["alice", "bob", "carl"]));
    }

    #[test]
    fn no_parent_stops_inheritance() {
        let repo = sample();
        assert_eq!(repo.approvers("a/b"), set(&["dan"]));
        assert_eq!(repo.approvers("a/b/c"), set(&["dan", "erin"]));
        assert!(repo.is_no_parent_owners("a/b"));
        assert!(!repo.is_no_parent_owners("a/b/c"));
    }

    #[test]
    fn leaf_approvers_only_own_entry() {
        let repo = sample();
        assert_eq!(repo.leaf_approvers("a/b/c"), set(&["erin"]));
        assert!(repo.leaf_approvers("a/x").is_empty());
    }

    #[test]
    fn nearest_owners_with_approvers() {
        let repo = sample();
        assert_eq!(repo.find_approver_owners_for_file("a/b/c/lib.rs"), "a/b/c");
        assert_eq!(repo.find_approver_owners_for_file("a/x/lib.rs"), "a");
        assert_eq!(repo.find_approver_owners_for_file("README.md"), "");
        // `docs` declares no approvers, so the root owns its files.
        assert_eq!(repo.find_approver_owners_for_file("docs/guide.md"), "");
        assert!(repo.is_auto_approve_unowned_subfolders("docs"));
    }

    #[test]
    fn duplicate_directories_are_rejected() {
        let err = RepoOwners::from_toml(
            r#"
            [owners."src"]
            approvers = ["a"]
            [owners."src/"]
            approvers = ["b"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid(_)));
    }

    #[test]
    fn malformed_toml() {
        let err = RepoOwners::from_toml("[owners.\"\"]\napprovers = \"alice\"").unwrap_err();
        assert!(matches!(err, ConfigurationError::Toml(_)));
    }

    #[test]
    fn default_filename() {
        let repo = RepoOwners::from_toml("").unwrap();
        assert_eq!(repo.owners_filename(), "OWNERS");
        let repo = RepoOwners::from_toml("filename = \"MAINTAINERS\"").unwrap();
        assert_eq!(repo.owners_filename(), "MAINTAINERS");
    }
}
