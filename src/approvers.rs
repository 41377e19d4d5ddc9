//! Approval state of a pull request.
//!
//! [`Approvers`] is rebuilt from scratch for every event by replaying the
//! `/approve`, `/approve cancel` and `/lgtm` history of the pull request.
//! A directory of the owners set is approved once any current approver is
//! allowed to approve it.

use crate::owners::Owners;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How an approval was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalKind {
    Approved,
    Lgtm,
    AuthorSelfApproved,
}

impl fmt::Display for ApprovalKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ApprovalKind::Approved => "Approved",
            ApprovalKind::Lgtm => "LGTM",
            ApprovalKind::AuthorSelfApproved => "Author self-approved",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// The login as written by GitHub for the actor.
    pub login: String,
    pub how: ApprovalKind,
    /// Link to the comment or review that approved.
    pub reference: String,
    /// Whether this approval waives the associated issue requirement.
    pub no_issue: bool,
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            r#"*<a href="{}" title="{}">{}</a>*"#,
            self.reference, self.how, self.login
        )
    }
}

/// Approval status of one directory of the owners set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum File {
    /// `approvers` are the current approvers allowed to approve `path`.
    Approved {
        path: String,
        approvers: BTreeSet<String>,
    },
    Unapproved {
        path: String,
    },
}

impl File {
    pub fn path(&self) -> &str {
        match self {
            File::Approved { path, .. } | File::Unapproved { path } => path,
        }
    }

    /// Renders the checklist line linking the OWNERS file at `branch`.
    pub fn render(&self, base_url: &str, branch: &str, owners_filename: &str) -> String {
        let owners_path = if self.path().is_empty() {
            owners_filename.to_string()
        } else {
            format!("{}/{owners_filename}", self.path())
        };
        let link = format!("{base_url}/blob/{branch}/{owners_path}");
        match self {
            File::Approved { approvers, .. } => {
                format!("- ~~[{owners_path}]({link})~~ [{}]\n", approvers.iter().join(","))
            }
            File::Unapproved { .. } => format!("- **[{owners_path}]({link})**\n"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Approvers<'a> {
    owners: Owners<'a>,
    /// Lowercase login -> approval.
    approvers: BTreeMap<String, Approval>,
    /// Lowercase logins.
    assignees: BTreeSet<String>,
    /// Zero when the pull request references no issue.
    associated_issue: u64,
    require_issue: bool,
    manually_approved: bool,
}

impl<'a> Approvers<'a> {
    pub fn new(owners: Owners<'a>) -> Approvers<'a> {
        Approvers {
            owners,
            approvers: BTreeMap::new(),
            assignees: BTreeSet::new(),
            associated_issue: 0,
            require_issue: false,
            manually_approved: false,
        }
    }

    pub fn owners(&self) -> &Owners<'a> {
        &self.owners
    }

    /// Records an approval unless it would drop an existing no-issue waiver.
    fn upsert(&mut self, login: &str, how: ApprovalKind, reference: &str, no_issue: bool) {
        let key = login.to_lowercase();
        if self
            .approvers
            .get(&key)
            .is_some_and(|existing| existing.no_issue && !no_issue)
        {
            tracing::trace!("keeping no-issue approval of {login}");
            return;
        }
        self.approvers.insert(
            key,
            Approval {
                login: login.to_string(),
                how,
                reference: reference.to_string(),
                no_issue,
            },
        );
    }

    pub fn add_approver(&mut self, login: &str, reference: &str, no_issue: bool) {
        self.upsert(login, ApprovalKind::Approved, reference, no_issue);
    }

    pub fn add_lgtmer(&mut self, login: &str, reference: &str, no_issue: bool) {
        self.upsert(login, ApprovalKind::Lgtm, reference, no_issue);
    }

    pub fn add_author_self_approver(&mut self, login: &str, reference: &str, no_issue: bool) {
        self.upsert(login, ApprovalKind::AuthorSelfApproved, reference, no_issue);
    }

    pub fn remove_approver(&mut self, login: &str) {
        self.approvers.remove(&login.to_lowercase());
    }

    pub fn add_assignees<I, S>(&mut self, logins: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.assignees
            .extend(logins.into_iter().map(|login| login.as_ref().to_lowercase()));
    }

    pub fn assignees(&self) -> &BTreeSet<String> {
        &self.assignees
    }

    pub fn set_associated_issue(&mut self, issue: u64) {
        self.associated_issue = issue;
    }

    pub fn associated_issue(&self) -> u64 {
        self.associated_issue
    }

    pub fn set_require_issue(&mut self, require_issue: bool) {
        self.require_issue = require_issue;
    }

    pub fn require_issue(&self) -> bool {
        self.require_issue
    }

    /// Marks the pull request as approved by hand, bypassing every
    /// computed requirement.
    pub fn set_manually_approved(&mut self, manually_approved: bool) {
        self.manually_approved = manually_approved;
    }

    pub fn manually_approved(&self) -> bool {
        self.manually_approved
    }

    pub fn approval(&self, login: &str) -> Option<&Approval> {
        self.approvers.get(&login.to_lowercase())
    }

    /// Lowercase logins of the current approvers.
    pub fn current_approvers(&self) -> BTreeSet<String> {
        self.approvers.keys().cloned().collect()
    }

    /// Logins of the current approvers as written when they approved.
    pub fn current_approvers_cased(&self) -> BTreeSet<String> {
        self.approvers.values().map(|a| a.login.clone()).collect()
    }

    /// Lowercase logins of the approvers waiving the issue requirement.
    pub fn no_issue_approvers(&self) -> BTreeSet<String> {
        self.approvers
            .iter()
            .filter(|(_, approval)| approval.no_issue)
            .map(|(login, _)| login.clone())
            .collect()
    }

    /// Approvals ordered by lowercase login.
    pub fn list_approvals(&self) -> Vec<&Approval> {
        self.approvers.values().collect()
    }

    pub fn list_no_issue_approvals(&self) -> Vec<&Approval> {
        self.approvers.values().filter(|a| a.no_issue).collect()
    }

    /// For every directory of the owners set, the current approvers allowed
    /// to approve it. Logins are matched ignoring case.
    pub fn files_approvers(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.owners
            .approvers()
            .into_iter()
            .map(|(dir, allowed)| {
                let approvers = self
                    .approvers
                    .iter()
                    .filter(|(key, _)| allowed.contains(key.as_str()))
                    .map(|(_, approval)| approval.login.clone())
                    .collect();
                (dir, approvers)
            })
            .collect()
    }

    /// Directories of the owners set that no current approver covers.
    pub fn unapproved_files(&self) -> BTreeSet<String> {
        self.files_approvers()
            .into_iter()
            .filter(|(_, approvers)| approvers.is_empty())
            .map(|(dir, _)| dir)
            .collect()
    }

    /// Per-directory status in directory order.
    pub fn files(&self) -> Vec<File> {
        self.files_approvers()
            .into_iter()
            .map(|(path, approvers)| {
                if approvers.is_empty() {
                    File::Unapproved { path }
                } else {
                    File::Approved { path, approvers }
                }
            })
            .collect()
    }

    /// A pull request without changed files is never approved.
    pub fn are_files_approved(&self) -> bool {
        !self.owners.is_empty_change() && self.unapproved_files().is_empty()
    }

    pub fn requirements_met(&self) -> bool {
        self.are_files_approved()
            && (!self.require_issue
                || self.associated_issue != 0
                || self.approvers.values().any(|a| a.no_issue))
    }

    pub fn is_approved(&self) -> bool {
        self.requirements_met() || self.manually_approved
    }

    /// Approvers to ask so that every directory gets approved, as sorted
    /// lowercase logins.
    ///
    /// The most specific OWNERS files are consulted first, then assignees
    /// able to approve through inheritance are kept.
    pub fn get_ccs(&self) -> Vec<String> {
        let randomized = self.owners.shuffled_approvers();
        let current = self.current_approvers();
        let approvers_and_assignees: BTreeSet<String> =
            current.union(&self.assignees).cloned().collect();
        let leaf_reverse_map = Owners::reverse_map(&self.owners.leaf_approvers());
        let suggested = self.owners.keep_covering_approvers(
            &leaf_reverse_map,
            &approvers_and_assignees,
            &randomized,
        );

        let approvers_and_suggested: BTreeSet<String> =
            current.union(&suggested).cloned().collect();
        let everyone: Vec<String> = approvers_and_suggested
            .union(&self.assignees)
            .cloned()
            .collect();
        let full_reverse_map = Owners::reverse_map(&self.owners.approvers());
        let keep_assignees = self.owners.keep_covering_approvers(
            &full_reverse_map,
            &approvers_and_suggested,
            &everyone,
        );

        suggested.union(&keep_assignees).cloned().collect()
    }

    /// Suggested approvers who are already assigned.
    pub fn assigned_ccs(&self) -> Vec<String> {
        self.get_ccs()
            .into_iter()
            .filter(|cc| self.assignees.contains(cc))
            .collect()
    }

    /// Suggested approvers who still need to be assigned.
    pub fn suggested_ccs(&self) -> Vec<String> {
        self.get_ccs()
            .into_iter()
            .filter(|cc| !self.assignees.contains(cc))
            .collect()
    }
}
