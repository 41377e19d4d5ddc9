pub mod approve;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Login of the bot account, whose own comments are never commands.
    pub username: String,
}
