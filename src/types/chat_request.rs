use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The user's question.
    pub message: String,
    /// The conversation this question belongs to.
    pub chat_id: SessionId,
}

impl ChatRequest {
    /// Creates a request for `message` within conversation `chat_id`.
    pub fn new(message: impl Into<String>, chat_id: SessionId) -> Self {
        Self {
            message: message.into(),
            chat_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_wire_shape() {
        let request = ChatRequest::new("Hi", SessionId::from(Uuid::nil()));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "Hi",
                "chat_id": "00000000-0000-0000-0000-000000000000"
            })
        );
    }
}
