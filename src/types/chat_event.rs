use serde::{Deserialize, Serialize};

/// Status value the server uses for the final record of a turn.
pub const STATUS_COMPLETE: &str = "complete";

/// Status value the server uses to report a failure in-band.
pub const STATUS_ERROR: &str = "error";

/// One line of the `/chat` response body as it appears on the wire.
///
/// Any `status` other than [`STATUS_COMPLETE`] or [`STATUS_ERROR`] is interim
/// progress (the server currently sends `"generating"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamRecord {
    /// Record kind.
    pub status: String,

    /// Status text for progress records; answer markup for complete records.
    #[serde(default)]
    pub message: Option<String>,

    /// Extra data attached to complete records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

/// Metadata attached to a complete record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordMetadata {
    /// Human-readable list of sources backing the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
}

/// A typed event decoded from one record of the response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Interim status text, shown on the status line.
    Progress {
        /// The status text.
        text: String,
    },

    /// The final answer of a turn.
    Complete {
        /// Answer markup; may embed citation links.
        text: String,
        /// Sources footer text, if the server supplied one.
        sources: Option<String>,
    },

    /// The server gave up on the turn.
    Error {
        /// The server's explanation.
        text: String,
    },
}

impl ChatEvent {
    /// Creates a progress event.
    pub fn progress(text: impl Into<String>) -> Self {
        ChatEvent::Progress { text: text.into() }
    }

    /// Creates a complete event.
    pub fn complete(text: impl Into<String>, sources: Option<String>) -> Self {
        ChatEvent::Complete {
            text: text.into(),
            sources,
        }
    }

    /// Returns true if this event ends the turn.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatEvent::Progress { .. })
    }
}

impl From<StreamRecord> for ChatEvent {
    fn from(record: StreamRecord) -> Self {
        let text = record.message.unwrap_or_default();
        match record.status.as_str() {
            STATUS_COMPLETE => ChatEvent::Complete {
                text,
                sources: record.metadata.and_then(|metadata| metadata.sources),
            },
            STATUS_ERROR => ChatEvent::Error { text },
            _ => ChatEvent::Progress { text },
        }
    }
}
