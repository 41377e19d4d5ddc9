//! Tests for the conversion of comments and labels into approval state.

use super::super::*;
use crate::owners::tests::{files, set, test_repo};

pub(super) const BOT: &str = "k8s-ci-robot";

pub(super) fn comment(id: u64, login: &str, minute: u32, body: &str) -> Comment {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "body": body,
        "html_url": format!("https://github.com/org/repo/pull/1#issuecomment-{id}"),
        "user": {"login": login, "id": id},
        "created_at": format!("2024-01-01T10:{minute:02}:00Z"),
    }))
    .unwrap()
}

pub(super) fn review(id: u64, login: &str, minute: u32, state: &str) -> Comment {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "body": null,
        "html_url": format!("https://github.com/org/repo/pull/1#pullrequestreview-{id}"),
        "user": {"login": login, "id": id},
        "submitted_at": format!("2024-01-01T10:{minute:02}:00Z"),
        "state": state,
    }))
    .unwrap()
}

pub(super) fn label_event(kind: &str, login: &str, minute: u32) -> IssueEvent {
    serde_json::from_value(serde_json::json!({
        "event": kind,
        "actor": {"login": login, "id": 1},
        "label": {"name": APPROVED_LABEL},
        "created_at": format!("2024-01-01T10:{minute:02}:00Z"),
    }))
    .unwrap()
}

fn actions(events: &[ApprovalEvent]) -> Vec<(&str, ApprovalAction)> {
    events
        .iter()
        .map(|event| (event.actor.as_str(), event.action))
        .collect()
}

fn event(actor: &str, minute: u32, action: ApprovalAction) -> ApprovalEvent {
    ApprovalEvent {
        actor: actor.to_string(),
        timestamp: format!("2024-01-01T10:{minute:02}:00Z").parse().unwrap(),
        action,
        reference: format!("https://github.com/org/repo/pull/1#{minute}"),
    }
}

#[test]
fn approve_commands() {
    let comments = [
        comment(1, "Bill", 0, "/approve"),
        comment(2, "Ben", 1, "looks fine\n/approve no-issue"),
        comment(3, "Bill", 2, "/APPROVE cancel"),
    ];
    let events = events_from_comments(&comments, BOT, &ApproveConfig::default());
    assert_eq!(
        actions(&events),
        [
            ("Bill", ApprovalAction::Approve),
            ("Ben", ApprovalAction::ApproveNoIssue),
            ("Bill", ApprovalAction::ApproveCancel),
        ]
    );
    assert_eq!(
        events[0].reference,
        "https://github.com/org/repo/pull/1#issuecomment-1"
    );
}

#[test]
fn lgtm_only_when_configured() {
    let comments = [comment(1, "Bill", 0, "/lgtm\n/lgtm cancel")];
    let events = events_from_comments(&comments, BOT, &ApproveConfig::default());
    assert!(events.is_empty());

    let config = ApproveConfig {
        lgtm_acts_as_approve: true,
        ..ApproveConfig::default()
    };
    let events = events_from_comments(&comments, BOT, &config);
    assert_eq!(
        actions(&events),
        [
            ("Bill", ApprovalAction::Lgtm),
            ("Bill", ApprovalAction::LgtmCancel)
        ]
    );
}

#[test]
fn bot_comments_are_skipped() {
    let comments = [comment(1, "K8S-CI-Robot", 0, "/approve")];
    assert!(events_from_comments(&comments, BOT, &ApproveConfig::default()).is_empty());
}

#[test]
fn ignored_commands() {
    let comments = [
        comment(1, "Bill", 0, "```\n/approve\n```"),
        comment(2, "Bill", 1, "> /approve"),
        comment(3, "Bill", 2, "please /approve"),
        comment(4, "Bill", 3, "/approve everything"),
        comment(5, "Bill", 4, "`/approve`"),
    ];
    assert!(events_from_comments(&comments, BOT, &ApproveConfig::default()).is_empty());
}

#[test]
fn review_states() {
    let comments = [
        review(1, "Bill", 0, "APPROVED"),
        review(2, "Ben", 1, "CHANGES_REQUESTED"),
        review(3, "Barbara", 2, "COMMENTED"),
    ];
    assert!(events_from_comments(&comments, BOT, &ApproveConfig::default()).is_empty());

    let config = ApproveConfig {
        ignore_review_state: false,
        ..ApproveConfig::default()
    };
    let events = events_from_comments(&comments, BOT, &config);
    assert_eq!(
        actions(&events),
        [
            ("Bill", ApprovalAction::Approve),
            ("Ben", ApprovalAction::ApproveCancel)
        ]
    );
}

#[test]
fn missing_timestamp_sorts_first() {
    let mut early = comment(1, "Bill", 30, "/approve cancel");
    early.created_at = None;
    let late = comment(2, "Bill", 0, "/approve");
    let events = events_from_comments(&[late, early], BOT, &ApproveConfig::default());

    let repo = test_repo();
    let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
    apply_events(&mut ap, events);
    assert_eq!(ap.current_approvers(), set(&["bill"]));
}

#[test]
fn events_apply_in_chronological_order() {
    let repo = test_repo();

    let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
    apply_events(
        &mut ap,
        [
            event("Bill", 5, ApprovalAction::Approve),
            event("Bill", 1, ApprovalAction::ApproveCancel),
        ],
    );
    assert!(ap.is_approved());

    let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
    apply_events(
        &mut ap,
        [
            event("Bill", 1, ApprovalAction::Approve),
            event("Bill", 5, ApprovalAction::LgtmCancel),
        ],
    );
    assert!(!ap.is_approved());
}

#[test]
fn equal_timestamps_keep_order() {
    let repo = test_repo();
    let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
    apply_events(
        &mut ap,
        [
            event("Bill", 1, ApprovalAction::ApproveCancel),
            event("Bill", 1, ApprovalAction::Approve),
        ],
    );
    assert_eq!(ap.current_approvers(), set(&["bill"]));
}

#[test]
fn no_issue_approval_is_sticky() {
    let repo = test_repo();
    let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
    apply_events(
        &mut ap,
        [
            event("Bill", 1, ApprovalAction::ApproveNoIssue),
            event("Bill", 2, ApprovalAction::Approve),
        ],
    );
    assert_eq!(ap.no_issue_approvers(), set(&["bill"]));
}

#[test]
fn associated_issue() {
    assert_eq!(find_associated_issue("Fixes #123"), 123);
    assert_eq!(
        find_associated_issue("See https://github.com/kubernetes/test-infra/issues/42."),
        42
    );
    assert_eq!(find_associated_issue("Fixes #12, fixes #13"), 12);
    assert_eq!(find_associated_issue("No issue here"), 0);
    assert_eq!(find_associated_issue(""), 0);
}

fn pr_with_label(events: Vec<IssueEvent>, labeled: bool) -> PullRequest {
    let labels = if labeled {
        vec![Label {
            name: APPROVED_LABEL.to_string(),
        }]
    } else {
        Vec::new()
    };
    PullRequest {
        number: 1,
        org: "org".to_string(),
        repo: "repo".to_string(),
        html_url: "https://github.com/org/repo/pull/1".to_string(),
        repo_html_url: "https://github.com/org/repo".to_string(),
        base_branch: "main".to_string(),
        author: User {
            login: "author".to_string(),
            id: 1,
        },
        body: String::new(),
        assignees: Vec::new(),
        labels,
        files: Vec::new(),
        comments: Vec::new(),
        events,
    }
}

#[test]
fn manual_approval() {
    let human = vec![label_event("labeled", "Barbara", 0)];
    assert!(human_added_approved(&pr_with_label(human.clone(), true), BOT));
    // The label was removed since.
    assert!(!human_added_approved(&pr_with_label(human, false), BOT));

    let by_bot = vec![
        label_event("labeled", "Barbara", 0),
        label_event("unlabeled", BOT, 1),
        label_event("labeled", BOT, 2),
    ];
    assert!(!human_added_approved(&pr_with_label(by_bot, true), BOT));

    let no_history = Vec::new();
    assert!(!human_added_approved(&pr_with_label(no_history, true), BOT));
}

#[test]
fn unknown_issue_events() {
    let event: IssueEvent = serde_json::from_value(serde_json::json!({
        "event": "review_requested",
        "actor": null,
        "created_at": "2024-01-01T10:00:00Z",
    }))
    .unwrap();
    assert_eq!(event.event, IssueEventKind::Other);
    assert!(!human_added_approved(&pr_with_label(vec![event], true), BOT));
}
