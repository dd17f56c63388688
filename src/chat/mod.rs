//! Interactive chat against a question-answering server.
//!
//! This module ties the stream reader to something a person can use:
//!
//! - Optimistic echo of each question and a live status line while the
//!   answer streams in
//! - Citation panels for the references embedded in answers
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`controller`]: the turn state machine, input gating and click routing
//! - [`render`]: the [`View`] surface and its terminal implementation
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod controller;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_BASE_URL, DEFAULT_QUESTION};
pub use controller::{ChatController, ClickTarget, Key, KeyPress, SessionStats, TurnState};
pub use render::{TerminalView, View, message_html};
