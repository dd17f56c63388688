// Public modules
pub mod chat_event;
pub mod chat_request;
pub mod message;
pub mod reference;
pub mod session_id;

// Re-exports
pub use chat_event::{ChatEvent, RecordMetadata, STATUS_COMPLETE, STATUS_ERROR, StreamRecord};
pub use chat_request::ChatRequest;
pub use message::{Message, Sender};
pub use reference::Reference;
pub use session_id::SessionId;
