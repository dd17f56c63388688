//! Slash command parsing for the chat client.
//!
//! Lines starting with `/` control the session locally and are never sent
//! to the server.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Start over with a fresh session id and an empty transcript.
    NewChat,

    /// Open citation `n` (1-based) of the latest answer.
    Cite(usize),

    /// Close the open citation panel.
    Close,

    /// List the citations of the latest answer.
    Citations,

    /// Print the current session id.
    Session,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a question.
///
/// # Examples
///
/// ```
/// # use qualle::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/cite 2").is_some());
/// assert!(parse_command("What is open peer review?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" | "clear" => ChatCommand::NewChat,
        "cite" => match argument {
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) if n > 0 => ChatCommand::Cite(n),
                _ => ChatCommand::Invalid("/cite expects a citation number from 1".to_string()),
            },
            None => ChatCommand::Invalid("/cite requires a citation number".to_string()),
        },
        "close" => ChatCommand::Close,
        "citations" | "refs" => ChatCommand::Citations,
        "session" => ChatCommand::Session,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat (new session id)
  /citations             List citations in the latest answer
  /cite <n>              Show citation n of the latest answer
  /close                 Close the citation panel
  /session               Show the session id
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
