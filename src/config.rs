use std::fmt;

pub static CONFIG_FILE_NAME: &str = "approvebot.toml";

const DEFAULT_COMMAND_HELP_LINK: &str = "https://go.k8s.io/bot-commands";
const DEFAULT_PR_PROCESS_LINK: &str =
    "https://git.k8s.io/community/contributors/guide/owners.md#the-code-review-process";

#[derive(PartialEq, Eq, Debug, serde::Deserialize)]
pub struct Config {
    pub approve: Option<ApproveConfig>,
}

#[derive(PartialEq, Eq, Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApproveConfig {
    /// Pull requests must reference an issue, or be approved with
    /// `/approve no-issue`.
    #[serde(default)]
    pub require_issue: bool,
    /// `/lgtm` counts as an approval.
    #[serde(default)]
    pub lgtm_acts_as_approve: bool,
    /// The author is not implicitly approving their own pull request.
    #[serde(default)]
    pub require_self_approval: bool,
    /// Approving and change-requesting reviews do not act as commands.
    #[serde(default = "default_true")]
    pub ignore_review_state: bool,
    #[serde(default = "default_command_help_link")]
    pub command_help_link: String,
    #[serde(default = "default_pr_process_link")]
    pub pr_process_link: String,
}

fn default_true() -> bool {
    true
}

fn default_command_help_link() -> String {
    DEFAULT_COMMAND_HELP_LINK.to_string()
}

fn default_pr_process_link() -> String {
    DEFAULT_PR_PROCESS_LINK.to_string()
}

impl Default for ApproveConfig {
    fn default() -> Self {
        ApproveConfig {
            require_issue: false,
            lgtm_acts_as_approve: false,
            require_self_approval: false,
            ignore_review_state: true,
            command_help_link: default_command_help_link(),
            pr_process_link: default_pr_process_link(),
        }
    }
}

/// Parses the contents of the repository's configuration file.
pub fn parse(contents: &str) -> Result<Config, ConfigurationError> {
    let config = toml::from_str::<Config>(contents).map_err(ConfigurationError::Toml)?;
    tracing::debug!("parsed configuration: {:?}", config);
    Ok(config)
}

#[derive(Clone, Debug)]
pub enum ConfigurationError {
    Toml(toml::de::Error),
    Invalid(String),
}

impl std::error::Error for ConfigurationError {}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigurationError::Toml(e) => {
                write!(f, "Malformed `{CONFIG_FILE_NAME}`.\n{e}")
            }
            ConfigurationError::Invalid(msg) => {
                write!(f, "Invalid configuration: {msg}")
            }
        }
    }
}
