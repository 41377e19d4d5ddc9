//! Approval status messages.
//!
//! The status comment is rendered from `templates/approve_status.md`. Its
//! body only depends on the approval state, so comparing it with the last
//! posted status tells whether an update is needed.

use crate::approvers::Approvers;
use anyhow::Context as _;

/// First words of every status comment posted by the bot.
pub const NOTIFICATION_PREFIX: &str = "[APPROVALNOTIFIER]";

const STATUS_TEMPLATE: &str = include_str!("../../../templates/approve_status.md");

/// Repository coordinates used to build the links of the status comment.
#[derive(Debug, Clone, Copy)]
pub struct MessageLinks<'a> {
    pub org: &'a str,
    pub repo: &'a str,
    /// Web URL of the repository, such as `https://github.com/org/repo`.
    pub base_url: &'a str,
    /// Branch the OWNERS links point at.
    pub branch: &'a str,
    pub command_help_link: &'a str,
    pub pr_process_link: &'a str,
}

#[derive(serde::Serialize)]
struct StatusContext<'a> {
    approved: bool,
    bypassed: bool,
    approvals: Vec<String>,
    needs_approval: bool,
    has_assigned: bool,
    assigned_ccs: Vec<String>,
    has_suggested: bool,
    suggested_ccs: Vec<String>,
    require_issue: bool,
    has_associated_issue: bool,
    associated_issue: u64,
    has_no_issue_approvals: bool,
    no_issue_approvals: Vec<String>,
    manually_approved: bool,
    command_help_link: &'a str,
    pr_process_link: &'a str,
    org: &'a str,
    repo: &'a str,
    files: Vec<String>,
    meta: String,
}

pub fn is_notification(body: &str) -> bool {
    body.starts_with(NOTIFICATION_PREFIX)
}

/// Renders the status comment for the current approval state.
pub fn status_message(ap: &Approvers<'_>, links: &MessageLinks<'_>) -> anyhow::Result<String> {
    render(STATUS_TEMPLATE, ap, links)
}

fn render(template: &str, ap: &Approvers<'_>, links: &MessageLinks<'_>) -> anyhow::Result<String> {
    let (assigned_ccs, suggested_ccs): (Vec<String>, Vec<String>) = ap
        .get_ccs()
        .into_iter()
        .partition(|cc| ap.assignees().contains(cc));
    let owners_filename = ap.owners().repo().owners_filename();
    let meta = serde_json::json!({ "approvers": suggested_ccs }).to_string();

    let status = StatusContext {
        approved: ap.is_approved(),
        bypassed: !ap.requirements_met() && ap.manually_approved(),
        approvals: ap.list_approvals().iter().map(|a| a.to_string()).collect(),
        needs_approval: !ap.are_files_approved() && !ap.manually_approved(),
        has_assigned: !assigned_ccs.is_empty(),
        has_suggested: !suggested_ccs.is_empty(),
        assigned_ccs,
        suggested_ccs,
        require_issue: ap.require_issue(),
        has_associated_issue: ap.associated_issue() != 0,
        associated_issue: ap.associated_issue(),
        has_no_issue_approvals: !ap.no_issue_approvers().is_empty(),
        no_issue_approvals: ap
            .list_no_issue_approvals()
            .iter()
            .map(|a| a.to_string())
            .collect(),
        manually_approved: ap.manually_approved(),
        command_help_link: links.command_help_link,
        pr_process_link: links.pr_process_link,
        org: links.org,
        repo: links.repo,
        files: ap
            .files()
            .iter()
            .map(|file| file.render(links.base_url, links.branch, owners_filename))
            .collect(),
        meta,
    };
    let context = tera::Context::from_serialize(&status)
        .context("failed to build the approval status context")?;
    tera::Tera::one_off(template, &context, false).context("failed to render the approval status")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owners::Owners;
    use crate::owners::tests::{files, test_repo};

    const LINKS: MessageLinks<'static> = MessageLinks {
        org: "org",
        repo: "repo",
        base_url: "https://github.com/org/repo",
        branch: "main",
        command_help_link: "https://example.com/commands",
        pr_process_link: "https://example.com/process",
    };

    #[test]
    fn approved_message() {
        let repo = test_repo();
        let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
        ap.add_approver("Bill", "https://github.com/org/repo/pull/1#c1", false);
        let message = status_message(&ap, &LINKS).unwrap();
        assert_eq!(
            message,
            r#"[APPROVALNOTIFIER] This PR is **APPROVED**

This pull-request has been approved by: *<a href="https://github.com/org/repo/pull/1#c1" title="Approved">Bill</a>*

The full list of commands accepted by this bot can be found [here](https://example.com/commands?repo=org%2Frepo).

The pull request process is described [here](https://example.com/process)

<details >
Needs approval from an approver in each of these files:

- ~~[b/OWNERS](https://github.com/org/repo/blob/main/b/OWNERS)~~ [Bill]

Approvers can indicate their approval by writing `/approve` in a comment
Approvers can cancel approval by writing `/approve cancel` in a comment
</details>
<!-- META={"approvers":[]} -->
"#
        );
    }

    #[test]
    fn not_approved_message_suggests_approvers() {
        let repo = test_repo();
        let ap = Approvers::new(Owners::new(files(&["c/test.go"]), &repo, 0));
        let message = status_message(&ap, &LINKS).unwrap();
        let cc = &ap.get_ccs()[0];
        assert!(message.starts_with("[APPROVALNOTIFIER] This PR is **NOT APPROVED**\n"));
        assert!(message.contains(&format!("please assign **{cc}**.\n")));
        assert!(message.contains(&format!("writing `/assign @{cc}` in a comment")));
        assert!(message.contains("<details open>"));
        assert!(message.contains("- **[c/OWNERS](https://github.com/org/repo/blob/main/c/OWNERS)**\n"));
        assert!(message.ends_with(&format!("<!-- META={{\"approvers\":[\"{cc}\"]}} -->\n")));
    }

    #[test]
    fn assigned_approvers_are_asked() {
        let repo = test_repo();
        let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
        ap.add_assignees(["Alice"]);
        let message = status_message(&ap, &LINKS).unwrap();
        assert!(message.contains("please ask for approval from **alice**.\n"));
        assert!(!message.contains("/assign"));
        assert!(message.contains(r#"<!-- META={"approvers":[]} -->"#));
    }

    #[test]
    fn issue_requirement_states() {
        let repo = test_repo();
        let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
        ap.set_require_issue(true);
        ap.add_approver("Bill", "ref", false);
        let message = status_message(&ap, &LINKS).unwrap();
        assert!(message.contains("**NOT APPROVED**"));
        assert!(message.contains("*No associated issue*. Update pull-request body"));

        ap.add_approver("Ben", "ref2", true);
        let message = status_message(&ap, &LINKS).unwrap();
        assert!(message.contains("**APPROVED**"));
        assert!(message.contains(
            r#"Associated issue requirement bypassed by: *<a href="ref2" title="Approved">Ben</a>*"#
        ));

        ap.set_associated_issue(100);
        let message = status_message(&ap, &LINKS).unwrap();
        assert!(message.contains("Associated issue: *#100*\n"));
        assert!(!message.contains("bypassed by:"));
    }

    #[test]
    fn manual_approval_message() {
        let repo = test_repo();
        let mut ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
        ap.set_manually_approved(true);
        let message = status_message(&ap, &LINKS).unwrap();
        assert!(message.contains("**APPROVED**"));
        assert!(message.contains("Approval requirements bypassed by manually added approval.\n"));
        assert!(!message.contains("To complete the"));
        assert!(message.contains("<details >"));
    }

    #[test]
    fn rendering_is_stable() {
        let repo = test_repo();
        let mut ap = Approvers::new(Owners::new(
            files(&["a/combo/x", "b/y", "c/z", "e/f/w"]),
            &repo,
            9,
        ));
        ap.add_approver("Chris", "ref", false);
        ap.add_assignees(["eve"]);
        assert_eq!(
            status_message(&ap, &LINKS).unwrap(),
            status_message(&ap, &LINKS).unwrap()
        );
    }

    #[test]
    fn broken_template_is_an_error() {
        let repo = test_repo();
        let ap = Approvers::new(Owners::new(files(&["b/test.go"]), &repo, 0));
        assert!(render("{% if %}", &ap, &LINKS).is_err());
    }

    #[test]
    fn notification_detection() {
        assert!(is_notification("[APPROVALNOTIFIER] This PR is **APPROVED**"));
        assert!(!is_notification("/approve"));
    }
}
