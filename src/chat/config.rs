//! Configuration types for the chat client.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration handed to the controller.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

/// Server the client talks to when none is given.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/";

/// Request timeout when none is given.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Period of the status-line dot animation.
const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Shortest animation period; a zero period cannot drive a timer.
pub(crate) const MIN_TICK: Duration = Duration::from_millis(1);

/// Shortest trimmed input the send control accepts.
const DEFAULT_MIN_INPUT_CHARS: usize = 3;

/// Question the input is pre-filled with on start and after a new chat.
pub const DEFAULT_QUESTION: &str =
    "How does open science reshape the future of interdisciplinary and collaborative research?";

/// Command-line arguments for the qualle-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat server.
    #[arrrg(optional, "Server base URL (default: http://localhost:5000/)", "URL")]
    pub url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Replay a recorded response file instead of contacting the server.
    #[arrrg(optional, "Replay a recorded NDJSON response file", "PATH")]
    pub replay: Option<String>,

    /// Message shown as the first bot message.
    #[arrrg(optional, "Welcome message shown at startup", "TEXT")]
    pub welcome: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Base URL questions are posted under.
    pub base_url: String,

    /// Timeout applied to each request.
    pub timeout: Duration,

    /// Period of the status-line animation.
    pub tick: Duration,

    /// Shortest trimmed input that enables the send control.
    pub min_input_chars: usize,

    /// Text the input holds at start and after a new chat.
    pub default_input: String,

    /// Bot message appended when the controller is created.
    pub welcome_message: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Recorded response to replay instead of issuing requests.
    pub replay: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Server: http://localhost:5000/
    /// - Timeout: 60 seconds
    /// - Tick: 1 second
    /// - Minimum input: 3 characters
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            tick: DEFAULT_TICK,
            min_input_chars: DEFAULT_MIN_INPUT_CHARS,
            default_input: DEFAULT_QUESTION.to_string(),
            welcome_message: None,
            use_color: true,
            replay: None,
        }
    }

    /// Sets the server base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the animation period, raised to one millisecond if shorter.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(MIN_TICK);
        self
    }

    /// Sets the shortest input that enables sending.
    pub fn with_min_input_chars(mut self, min_input_chars: usize) -> Self {
        self.min_input_chars = min_input_chars;
        self
    }

    /// Sets the pre-filled question.
    pub fn with_default_input(mut self, default_input: impl Into<String>) -> Self {
        self.default_input = default_input.into();
        self
    }

    /// Sets the welcome message.
    pub fn with_welcome_message(mut self, welcome_message: Option<String>) -> Self {
        self.welcome_message = welcome_message;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the response file to replay.
    pub fn with_replay(mut self, replay: Option<PathBuf>) -> Self {
        self.replay = replay;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            base_url: args.url.unwrap_or(defaults.base_url.clone()),
            timeout: args
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            welcome_message: args.welcome,
            use_color: !args.no_color,
            replay: args.replay.map(PathBuf::from),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.base_url, "http://localhost:5000/");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.min_input_chars, 3);
        assert_eq!(config.default_input, DEFAULT_QUESTION);
        assert!(config.welcome_message.is_none());
        assert!(config.use_color);
        assert!(config.replay.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            url: Some("https://qa.example.org/".to_string()),
            timeout: Some(5),
            replay: Some("capture.ndjson".to_string()),
            welcome: Some("Ask me about papers.".to_string()),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.base_url, "https://qa.example.org/");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.replay, Some(PathBuf::from("capture.ndjson")));
        assert_eq!(
            config.welcome_message.as_deref(),
            Some("Ask me about papers.")
        );
        assert!(!config.use_color);
        assert_eq!(config.min_input_chars, 3);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_base_url("http://127.0.0.1:8080/")
            .with_timeout(Duration::from_secs(2))
            .with_tick(Duration::from_millis(250))
            .with_min_input_chars(1)
            .with_default_input("What is FAIR data?")
            .with_welcome_message(Some("Hello".to_string()))
            .without_color()
            .with_replay(Some(PathBuf::from("turn.ndjson")));

        assert_eq!(config.base_url, "http://127.0.0.1:8080/");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.tick, Duration::from_millis(250));
        assert_eq!(config.min_input_chars, 1);
        assert_eq!(config.default_input, "What is FAIR data?");
        assert_eq!(config.welcome_message.as_deref(), Some("Hello"));
        assert!(!config.use_color);
        assert_eq!(config.replay, Some(PathBuf::from("turn.ndjson")));
    }

    #[test]
    fn zero_tick_is_raised_to_minimum() {
        let config = ChatConfig::new().with_tick(Duration::ZERO);
        assert_eq!(config.tick, MIN_TICK);
        let config = ChatConfig::new().with_tick(Duration::from_micros(10));
        assert_eq!(config.tick, Duration::from_millis(1));
    }
}
