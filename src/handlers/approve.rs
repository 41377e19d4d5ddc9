//! Handles approval of pull requests based on OWNERS files.
//!
//! Approvals are given with the following commands:
//!
//! * `/approve`: approves the files the commenter owns.
//! * `/approve no-issue`: same, and waives the associated issue requirement.
//! * `/approve cancel`: withdraws the commenter's approval.
//! * `/lgtm` and `/lgtm cancel`: same as `/approve` when
//!   `lgtm-acts-as-approve` is set.
//!
//! Nothing is stored between events. On every event the whole comment,
//! review and label history of the pull request is replayed, the status
//! comment is rendered again, and the `approved` label is toggled.
//!
//! Configuration is done with the `[approve]` table.

use crate::{
    approvers::Approvers,
    config::ApproveConfig,
    github::{
        Comment, IssueEvent, IssueEventKind, Label, PullRequestNumber, PullRequestReviewState,
        User,
    },
    handlers::Context,
    owners::{Owners, OwnersTree},
};
use chrono::{DateTime, Utc};
use parser::command::approve::ApproveCommand;
use parser::command::lgtm::LgtmCommand;
use parser::command::{Command, Input};
use regex::Regex;
use std::sync::LazyLock;

pub mod messages;


pub const APPROVED_LABEL: &str = "approved";

static ASSOCIATED_ISSUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+/issues/|#)(?P<issue_num>[0-9]+)").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    ApproveCancel,
    ApproveNoIssue,
    Lgtm,
    LgtmCancel,
    AuthorSelfApprove,
}

/// One approval-relevant action taken on the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEvent {
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub action: ApprovalAction,
    /// Link to the comment or review that carried the action.
    pub reference: String,
}

/// Everything known about a pull request when an event is handled.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PullRequest {
    pub number: PullRequestNumber,
    pub org: String,
    pub repo: String,
    /// Example: `https://github.com/octocat/Hello-World/pull/1347`
    pub html_url: String,
    /// Example: `https://github.com/octocat/Hello-World`
    pub repo_html_url: String,
    pub base_branch: String,
    pub author: User,
    #[serde(default, deserialize_with = "crate::github::opt_string")]
    pub body: String,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Paths of the changed files, relative to the repository root.
    #[serde(default)]
    pub files: Vec<String>,
    /// Issue comments and submitted reviews, in any order.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// The issue events timeline.
    #[serde(default)]
    pub events: Vec<IssueEvent>,
}

impl PullRequest {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    /// The latest status comment is up to date.
    Keep,
    /// A new status comment with this body must be posted.
    Post(String),
}

/// What the GitHub client has to do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveOutcome {
    /// Whether the `approved` label should be present.
    pub approved: bool,
    pub label: Option<LabelAction>,
    pub notification: NotificationAction,
    /// Ids of status comments to delete.
    pub stale_notifications: Vec<u64>,
}

/// Extracts approval actions from comments and reviews.
///
/// Comments of the bot are skipped. Malformed commands are ignored.
pub fn events_from_comments(
    comments: &[Comment],
    bot: &str,
    config: &ApproveConfig,
) -> Vec<ApprovalEvent> {
    let mut events = Vec::new();
    for comment in comments {
        if comment.user.is(bot) {
            continue;
        }
        // Comments fetched without a timestamp sort before everything else.
        let timestamp = comment.created_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut push = |action| {
            events.push(ApprovalEvent {
                actor: comment.user.login.clone(),
                timestamp,
                action,
                reference: comment.html_url.clone(),
            })
        };

        if !config.ignore_review_state {
            match comment.pr_review_state {
                Some(PullRequestReviewState::Approved) => push(ApprovalAction::Approve),
                Some(PullRequestReviewState::ChangesRequested) => {
                    push(ApprovalAction::ApproveCancel)
                }
                _ => {}
            }
        }

        for command in Input::new(&comment.body) {
            match command {
                Command::Approve(Ok(cmd)) => push(match cmd {
                    ApproveCommand::Approve => ApprovalAction::Approve,
                    ApproveCommand::NoIssue => ApprovalAction::ApproveNoIssue,
                    ApproveCommand::Cancel => ApprovalAction::ApproveCancel,
                }),
                Command::Lgtm(Ok(cmd)) if config.lgtm_acts_as_approve => push(match cmd {
                    LgtmCommand::Lgtm => ApprovalAction::Lgtm,
                    LgtmCommand::Cancel => ApprovalAction::LgtmCancel,
                }),
                Command::Lgtm(Ok(_)) => {}
                Command::Approve(Err(err)) | Command::Lgtm(Err(err)) => {
                    tracing::debug!(
                        "ignoring malformed command in {}: {err}",
                        comment.html_url
                    );
                }
            }
        }
    }
    events
}

/// Replays `events` in chronological order.
///
/// Events with the same timestamp keep their relative order.
pub fn apply_events(
    approvers: &mut Approvers<'_>,
    events: impl IntoIterator<Item = ApprovalEvent>,
) {
    let mut events: Vec<ApprovalEvent> = events.into_iter().collect();
    events.sort_by_key(|event| event.timestamp);
    for event in &events {
        match event.action {
            ApprovalAction::Approve => approvers.add_approver(&event.actor, &event.reference, false),
            ApprovalAction::ApproveNoIssue => {
                approvers.add_approver(&event.actor, &event.reference, true)
            }
            ApprovalAction::Lgtm => approvers.add_lgtmer(&event.actor, &event.reference, false),
            ApprovalAction::AuthorSelfApprove => {
                approvers.add_author_self_approver(&event.actor, &event.reference, false)
            }
            ApprovalAction::ApproveCancel | ApprovalAction::LgtmCancel => {
                approvers.remove_approver(&event.actor)
            }
        }
    }
}

/// Returns the first issue referenced by the pull request body, or zero.
pub fn find_associated_issue(body: &str) -> u64 {
    ASSOCIATED_ISSUE_RE
        .captures_iter(body)
        .filter_map(|caps| caps["issue_num"].parse().ok())
        .next()
        .unwrap_or(0)
}

/// True if the `approved` label is present and was last added by a human.
pub fn human_added_approved(pr: &PullRequest, bot: &str) -> bool {
    if !pr.has_label(APPROVED_LABEL) {
        return false;
    }
    let last_added = pr
        .events
        .iter()
        .filter(|event| {
            event.event == IssueEventKind::Labeled
                && event
                    .label
                    .as_ref()
                    .is_some_and(|label| label.name == APPROVED_LABEL)
        })
        .max_by_key(|event| event.created_at);
    match last_added.and_then(|event| event.actor.as_ref()) {
        Some(actor) => !actor.is(bot),
        None => false,
    }
}

/// Builds the approval state of `pr` from its full history.
pub fn approvers_for<'a>(
    ctx: &Context,
    config: &ApproveConfig,
    tree: &'a dyn OwnersTree,
    pr: &PullRequest,
) -> Approvers<'a> {
    let owners = Owners::new(pr.files.clone(), tree, pr.number);
    let mut approvers = Approvers::new(owners);
    approvers.add_assignees(pr.assignees.iter().map(|user| user.login.as_str()));
    approvers.set_require_issue(config.require_issue);
    approvers.set_associated_issue(find_associated_issue(&pr.body));
    approvers.set_manually_approved(human_added_approved(pr, &ctx.username));

    if !config.require_self_approval {
        approvers.add_author_self_approver(&pr.author.login, &format!("{}#", pr.html_url), false);
    }
    apply_events(
        &mut approvers,
        events_from_comments(&pr.comments, &ctx.username, config),
    );
    approvers
}

/// Recomputes the approval status of `pr`.
///
/// Fails without side effects if the status comment cannot be rendered.
pub fn handle(
    ctx: &Context,
    config: &ApproveConfig,
    tree: &dyn OwnersTree,
    pr: &PullRequest,
) -> anyhow::Result<ApproveOutcome> {
    let approvers = approvers_for(ctx, config, tree, pr);
    let links = messages::MessageLinks {
        org: &pr.org,
        repo: &pr.repo,
        base_url: &pr.repo_html_url,
        branch: &pr.base_branch,
        command_help_link: &config.command_help_link,
        pr_process_link: &config.pr_process_link,
    };
    let body = messages::status_message(&approvers, &links)?;

    let mut notifications: Vec<&Comment> = pr
        .comments
        .iter()
        .filter(|comment| {
            comment.user.is(&ctx.username) && messages::is_notification(&comment.body)
        })
        .collect();
    notifications.sort_by_key(|comment| (comment.created_at, comment.id));

    let (notification, stale_notifications) = match notifications.split_last() {
        Some((latest, older)) if latest.body == body => {
            tracing::debug!("approval status of {}#{} is unchanged", pr.repo, pr.number);
            (NotificationAction::Keep, older.iter().map(|c| c.id).collect())
        }
        _ => (
            NotificationAction::Post(body),
            notifications.iter().map(|c| c.id).collect(),
        ),
    };

    let approved = approvers.is_approved();
    let label = match (approved, pr.has_label(APPROVED_LABEL)) {
        (true, false) => Some(LabelAction::Add),
        (false, true) => Some(LabelAction::Remove),
        _ => None,
    };
    tracing::info!(
        "{}/{}#{} approved: {approved}, label: {label:?}",
        pr.org,
        pr.repo,
        pr.number
    );

    Ok(ApproveOutcome {
        approved,
        label,
        notification,
        stale_notifications,
    })
}
