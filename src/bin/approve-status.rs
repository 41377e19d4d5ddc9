use anyhow::Context as _;
use approvebot::handlers::Context;
use approvebot::handlers::approve::{self, NotificationAction, PullRequest};
use approvebot::owners::repo::RepoOwners;
use approvebot::{config, logger};

// Dry run of the approval handler:
// 1. Load the OWNERS tree and the pull request history from disk
// 2. Recompute the approval status
// 3. Print what the bot would do

fn main() -> anyhow::Result<()> {
    logger::init()?;

    let args: Vec<String> = std::env::args().collect();
    if !(3..=4).contains(&args.len()) {
        eprintln!("Usage: approve-status <owners.toml> <pull-request.json> [approvebot.toml]");
        std::process::exit(2);
    }

    let owners = std::fs::read_to_string(&args[1])
        .with_context(|| format!("failed to read {}", args[1]))?;
    let tree = RepoOwners::from_toml(&owners)
        .with_context(|| format!("failed to load OWNERS tree from {}", args[1]))?;

    let pr = std::fs::read_to_string(&args[2])
        .with_context(|| format!("failed to read {}", args[2]))?;
    let pr: PullRequest = serde_json::from_str(&pr)
        .with_context(|| format!("failed to deserialize {}", args[2]))?;

    let approve_config = match args.get(3) {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {path}"))?;
            config::parse(&contents)?.approve.unwrap_or_default()
        }
        None => Default::default(),
    };

    let ctx = Context {
        username: std::env::var("APPROVEBOT_USERNAME")
            .unwrap_or_else(|_| "k8s-ci-robot".to_string()),
    };
    let outcome = approve::handle(&ctx, &approve_config, &tree, &pr)?;

    println!("approved: {}", outcome.approved);
    if let Some(label) = outcome.label {
        println!("label `{}`: {label:?}", approve::APPROVED_LABEL);
    }
    for id in &outcome.stale_notifications {
        println!("delete comment {id}");
    }
    match outcome.notification {
        NotificationAction::Keep => println!("status comment is up to date"),
        NotificationAction::Post(body) => println!("post comment:\n{body}"),
    }
    Ok(())
}
