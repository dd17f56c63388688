// Public modules
pub mod chat;
pub mod citation;
pub mod client;
pub mod error;
pub mod ndjson;
pub mod observability;
pub mod status;
pub mod tooltip;
pub mod types;

// Re-exports
pub use client::{AnyTransport, ByteStream, ChatClient, ChatTransport, ReplayTransport};
pub use error::{Error, Result};
pub use ndjson::{ChatEventDecoder, process_ndjson};
pub use observability::register_biometrics;
pub use types::*;
