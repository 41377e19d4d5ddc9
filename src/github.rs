//! GitHub data consumed when replaying a pull request's history.
//!
//! These mirror the REST API (and webhook) JSON shapes, limited to the
//! fields the approval plugin reads.

use chrono::{DateTime, Utc};

pub type UserId = u64;
pub type PullRequestNumber = u64;

#[derive(PartialEq, Eq, Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub id: UserId,
}

impl User {
    /// Compares logins the way GitHub does, ignoring case.
    pub fn is(&self, login: &str) -> bool {
        self.login.eq_ignore_ascii_case(login)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Ord, PartialOrd, serde::Deserialize)]
pub struct Label {
    pub name: String,
}

/// An issue comment or a submitted pull request review.
///
/// Reviews deserialize into the same type. Their `submitted_at` is read as
/// `created_at` and their `state` is kept in `pr_review_state`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(deserialize_with = "opt_string")]
    pub body: String,
    pub html_url: String,
    pub user: User,
    #[serde(default, alias = "submitted_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "state")]
    pub pr_review_state: Option<PullRequestReviewState>,
}

#[derive(Debug, Clone, Copy, serde::Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestReviewState {
    #[serde(alias = "APPROVED")]
    Approved,
    #[serde(alias = "CHANGES_REQUESTED")]
    ChangesRequested,
    #[serde(alias = "COMMENTED")]
    Commented,
    #[serde(alias = "DISMISSED")]
    Dismissed,
    #[serde(alias = "PENDING")]
    Pending,
}

/// An entry of the issue events timeline.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct IssueEvent {
    pub event: IssueEventKind,
    /// `None` for events of deleted accounts.
    #[serde(default)]
    pub actor: Option<User>,
    #[serde(default)]
    pub label: Option<Label>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueEventKind {
    Labeled,
    Unlabeled,
    #[serde(other)]
    Other,
}

pub(crate) fn opt_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    use serde::de::Deserialize;
    match <Option<String>>::deserialize(deserializer) {
        Ok(v) => Ok(v.unwrap_or_default()),
        Err(e) => Err(e),
    }
}
