//! The chat view controller.
//!
//! One controller owns one conversation: the session id, the transcript,
//! the input control state and the citation panel. A turn is driven by
//! [`ChatController::submit`] (or [`ChatController::send`]) and runs to
//! completion or failure inside that call; the status-line ticker lives
//! inside the turn future, so it stops on every way out of the turn,
//! including the future being dropped.

use std::time::Instant;

use futures::StreamExt;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::chat::config::{ChatConfig, MIN_TICK};
use crate::chat::render::View;
use crate::citation::{CitationLink, extract_citations};
use crate::client::ChatTransport;
use crate::error::{Error, Result};
use crate::ndjson::process_ndjson;
use crate::observability::{
    CHAT_CITATIONS_OPENED, CHAT_TURN_DURATION, CHAT_TURN_FAILURES, CHAT_TURNS,
};
use crate::status::{DotCycle, STATUS_FAILED};
use crate::tooltip::{Point, Rect, Tooltip, TooltipLayer, place_tooltip};
use crate::types::{ChatEvent, ChatRequest, Message, SessionId};

/// Where a turn stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// No turn has run yet.
    #[default]
    Idle,
    /// The request is out; waiting for response headers.
    Sending,
    /// Reading the response body.
    Streaming,
    /// The last turn produced an answer.
    Done,
    /// The last turn failed.
    Failed,
}

impl TurnState {
    /// Returns true when a new turn may start.
    pub fn accepts_input(&self) -> bool {
        matches!(self, TurnState::Idle | TurnState::Done | TurnState::Failed)
    }
}

/// A key the input control reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Return.
    Enter,
    /// Delete the last character.
    Backspace,
    /// A printable character.
    Char(char),
}

/// A key press with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    /// The key.
    pub key: Key,
    /// Whether Shift was held.
    pub shift: bool,
}

impl KeyPress {
    /// A press without modifiers.
    pub fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    /// A press with Shift held.
    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

/// What a click landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickTarget {
    /// A citation link inside a bot message.
    Citation {
        /// Index of the message in the transcript.
        message: usize,
        /// Index of the link within the message.
        citation: usize,
        /// Bounds of the link element.
        anchor: Rect,
        /// Where the click landed.
        point: Point,
    },
    /// Anywhere else.
    Other {
        /// Where the click landed.
        point: Point,
    },
}

/// Summary numbers for the running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The id sent with every request.
    pub session_id: SessionId,
    /// Number of messages in the transcript.
    pub message_count: usize,
    /// Turns started since the controller was created.
    pub turns: u64,
    /// Turns that failed.
    pub failed_turns: u64,
    /// State of the most recent turn.
    pub state: TurnState,
}

/// Controller binding a transport and a view into a chat.
pub struct ChatController<T: ChatTransport, V: View> {
    transport: T,
    view: V,
    config: ChatConfig,
    session_id: SessionId,
    messages: Vec<Message>,
    input: String,
    state: TurnState,
    tooltips: TooltipLayer,
    turns: u64,
    failed_turns: u64,
}

impl<T: ChatTransport, V: View> ChatController<T, V> {
    /// Creates a controller with a fresh session id.
    ///
    /// The input is pre-filled with the configured default question and the
    /// welcome message, if any, is shown as the first bot message.
    pub fn new(transport: T, view: V, config: ChatConfig) -> Self {
        let mut controller = Self {
            transport,
            view,
            config,
            session_id: SessionId::new(),
            messages: Vec::new(),
            input: String::new(),
            state: TurnState::Idle,
            tooltips: TooltipLayer::new(),
            turns: 0,
            failed_turns: 0,
        };
        if let Some(welcome) = controller.config.welcome_message.clone() {
            controller.push_message(Message::bot(welcome, None));
        }
        let default_input = controller.config.default_input.clone();
        controller.view.set_input_enabled(true);
        controller.set_input(default_input);
        controller
    }

    /// The id sent with every request of this conversation.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The transcript, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// State of the most recent turn.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Current contents of the input control.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The open citation panel, if any.
    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltips.current()
    }

    /// The view, for hosts that need to read back what was drawn.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The view, mutably.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Summary numbers for the running session.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.session_id,
            message_count: self.messages.len(),
            turns: self.turns,
            failed_turns: self.failed_turns,
            state: self.state,
        }
    }

    /// Replaces the input and updates the send control.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.view.set_input_text(&self.input);
        self.view.set_send_enabled(self.can_send());
    }

    /// Returns true if the send control should be enabled.
    pub fn can_send(&self) -> bool {
        self.state.accepts_input()
            && self.input.trim().chars().count() >= self.config.min_input_chars
    }

    /// Applies a key press to the input.
    ///
    /// Enter without Shift submits when sending is allowed and returns the
    /// outcome of the turn; Shift+Enter inserts a newline. Every other key
    /// edits the input and returns `None`.
    pub async fn handle_key(&mut self, press: KeyPress) -> Option<Result<Message>> {
        if !self.state.accepts_input() {
            return None;
        }
        match press.key {
            Key::Enter if !press.shift => {
                if self.can_send() {
                    return Some(self.submit().await);
                }
            }
            Key::Enter => {
                let mut input = std::mem::take(&mut self.input);
                input.push('\n');
                self.set_input(input);
            }
            Key::Backspace => {
                let mut input = std::mem::take(&mut self.input);
                input.pop();
                self.set_input(input);
            }
            Key::Char(c) => {
                let mut input = std::mem::take(&mut self.input);
                input.push(c);
                self.set_input(input);
            }
        }
        None
    }

    /// Sends the current input as a question.
    ///
    /// Fails with a validation error, without touching the transcript, if
    /// the send control is disabled.
    pub async fn submit(&mut self) -> Result<Message> {
        if !self.can_send() {
            return Err(Error::validation(
                format!(
                    "a question needs at least {} characters",
                    self.config.min_input_chars
                ),
                Some("message".to_string()),
            ));
        }
        let question = self.input.trim().to_string();
        self.send(question).await
    }

    /// Sends `question` and waits for the answer.
    ///
    /// The question is appended to the transcript immediately and stays
    /// there whatever the outcome. On success the answer is appended and
    /// returned. On failure the status line shows the error, the input is
    /// re-enabled and the error is returned.
    pub async fn send(&mut self, question: impl Into<String>) -> Result<Message> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(Error::validation(
                "cannot send an empty question",
                Some("message".to_string()),
            ));
        }
        if !self.state.accepts_input() {
            return Err(Error::validation("a turn is already in progress", None));
        }

        self.set_input("");
        self.push_message(Message::user(question.clone()));
        self.view.set_input_enabled(false);
        self.view.set_send_enabled(false);

        CHAT_TURNS.click();
        self.turns += 1;
        let started = Instant::now();
        let request = ChatRequest::new(question, self.session_id);
        let outcome = self.run_turn(&request).await;
        CHAT_TURN_DURATION.add(started.elapsed().as_secs_f64());

        let result = match outcome {
            Ok(answer) => {
                debug!(chat_id = %self.session_id, "turn complete");
                self.view.set_status("");
                self.push_message(answer.clone());
                self.state = TurnState::Done;
                Ok(answer)
            }
            Err(err) => {
                CHAT_TURN_FAILURES.click();
                self.failed_turns += 1;
                warn!(chat_id = %self.session_id, error = %err, "turn failed");
                self.view.set_status(STATUS_FAILED);
                self.state = TurnState::Failed;
                Err(err)
            }
        };
        self.view.set_input_enabled(true);
        self.view.set_send_enabled(self.can_send());
        result
    }

    /// Recovers after a turn future was dropped before it finished.
    ///
    /// The turn counts as failed. Its ticker already stopped with the
    /// future; this clears the status line and re-enables the input.
    pub fn abandon_turn(&mut self) {
        if self.state.accepts_input() {
            return;
        }
        CHAT_TURN_FAILURES.click();
        self.failed_turns += 1;
        debug!(chat_id = %self.session_id, state = ?self.state, "turn abandoned");
        self.state = TurnState::Failed;
        self.view.set_status("");
        self.view.set_input_enabled(true);
        self.view.set_send_enabled(self.can_send());
    }

    async fn run_turn(&mut self, request: &ChatRequest) -> Result<Message> {
        let Self {
            transport,
            view,
            config,
            state,
            ..
        } = self;

        let mut status = DotCycle::default();
        view.set_status(&status.text());
        let tick = config.tick.max(MIN_TICK);
        let mut ticker = interval_at(tokio::time::Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        *state = TurnState::Sending;
        let open = transport.open(request);
        tokio::pin!(open);
        let body = loop {
            tokio::select! {
                biased;
                body = &mut open => break body?,
                _ = ticker.tick() => view.set_status(&status.advance()),
            }
        };

        *state = TurnState::Streaming;
        let events = process_ndjson(body);
        tokio::pin!(events);
        loop {
            tokio::select! {
                biased;
                event = events.next() => match event {
                    Some(Ok(ChatEvent::Progress { text })) => {
                        status.set_base(text);
                        view.set_status(&status.text());
                    }
                    Some(Ok(ChatEvent::Complete { text, sources })) => {
                        return Ok(Message::bot(text, sources));
                    }
                    Some(Ok(ChatEvent::Error { text })) => {
                        return Err(Error::streaming(text, None));
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        return Err(Error::streaming(
                            "response ended before the answer was complete",
                            None,
                        ));
                    }
                },
                _ = ticker.tick() => view.set_status(&status.advance()),
            }
        }
    }

    /// Starts a new conversation.
    ///
    /// Clears the transcript and any open panel, draws a new session id and
    /// resets the input to the default question.
    pub fn new_chat(&mut self) {
        if self.tooltips.close().is_some() {
            self.view.remove_tooltip();
        }
        self.messages.clear();
        self.view.clear_messages();
        self.view.set_status("");
        self.session_id = SessionId::new();
        self.state = TurnState::Idle;
        self.view.set_input_enabled(true);
        let default_input = self.config.default_input.clone();
        self.set_input(default_input);
        debug!(chat_id = %self.session_id, "started new chat");
    }

    /// Citation links of message `message`, empty for user messages.
    pub fn citations(&self, message: usize) -> Vec<CitationLink> {
        match self.messages.get(message) {
            Some(m) if m.is_bot() => extract_citations(&m.content),
            _ => Vec::new(),
        }
    }

    /// Index of the most recent bot message.
    pub fn latest_answer(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_bot)
    }

    /// Routes a click anywhere in the chat.
    ///
    /// A click on a citation replaces any open panel with one for that
    /// citation; a malformed citation leaves no panel open. Any other click
    /// closes the open panel if it lands outside it. Returns the panel open
    /// after the click.
    pub fn dispatch_click(&mut self, target: ClickTarget) -> Option<&Tooltip> {
        let click = self.tooltips.begin_click();
        match target {
            ClickTarget::Citation {
                message,
                citation,
                anchor,
                point,
            } => {
                if self.tooltips.close().is_some() {
                    self.view.remove_tooltip();
                }
                let reference = self
                    .citations(message)
                    .get(citation)
                    .and_then(CitationLink::reference)?;
                let size = self.view.measure_tooltip(&reference);
                let bounds = place_tooltip(anchor, point, size, self.view.viewport());
                let tooltip = Tooltip {
                    message,
                    citation,
                    reference,
                    bounds,
                };
                self.view.show_tooltip(&tooltip);
                self.tooltips.open(tooltip, click);
                CHAT_CITATIONS_OPENED.click();
            }
            ClickTarget::Other { point } => {
                if self.tooltips.dismiss_if_outside(point, click).is_some() {
                    self.view.remove_tooltip();
                }
            }
        }
        self.tooltips.current()
    }

    /// Closes the open panel, if any.
    pub fn close_tooltip(&mut self) {
        if self.tooltips.close().is_some() {
            self.view.remove_tooltip();
        }
    }

    fn push_message(&mut self, message: Message) {
        self.view.append_message(&message);
        self.messages.push(message);
    }
}
