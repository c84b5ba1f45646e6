/// One parsed command invocation from the interaction gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command_name: String,
    pub args: Vec<String>,
    pub invoker_id: String,
    pub is_admin: bool,
    pub channel_id: String,
}

impl CommandInvocation {
    /// Parse the raw interaction text, shell-style, so quoted arguments
    /// (multi-word rejection reasons) survive. Returns `None` for empty
    /// or unbalanced input.
    pub fn parse(text: &str, invoker_id: &str, is_admin: bool, channel_id: &str) -> Option<Self> {
        let mut tokens = shlex::split(text)?.into_iter();
        let command_name = tokens.next()?;
        Some(Self {
            command_name,
            args: tokens.collect(),
            invoker_id: invoker_id.to_string(),
            is_admin,
            channel_id: channel_id.to_string(),
        })
    }
}

/// The single reply every invocation resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Success(String),
    /// Bad arguments, unknown command, or a missing listing.
    Rejected(String),
    /// Invoker lacks the administrator capability.
    Forbidden(String),
}

impl CommandReply {
    pub fn text(&self) -> &str {
        match self {
            CommandReply::Success(text)
            | CommandReply::Rejected(text)
            | CommandReply::Forbidden(text) => text,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            CommandReply::Success(_) => "success",
            CommandReply::Rejected(_) => "rejected",
            CommandReply::Forbidden(_) => "forbidden",
        }
    }
}
