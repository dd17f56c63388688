use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing into the widget.
    User,
    /// The question-answering service.
    Bot,
}

impl Sender {
    /// CSS class name used in rendered markup.
    pub fn css_class(&self) -> &'static str {
        match self {
            Sender::User => "user-message",
            Sender::Bot => "bot-message",
        }
    }
}

/// One rendered turn in the message list.
///
/// User content is plain text. Bot content is markup and may embed citation
/// links. Messages are never changed once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Who produced the message.
    pub sender: Sender,
    /// Plain text (user) or markup (bot).
    pub content: String,
    /// Sources footer, bot messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            sources: None,
        }
    }

    /// Creates a bot message.
    pub fn bot(content: impl Into<String>, sources: Option<String>) -> Self {
        Self {
            sender: Sender::Bot,
            content: content.into(),
            sources,
        }
    }

    /// Returns true for bot messages.
    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}
