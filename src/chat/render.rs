//! Output rendering for the chat client.
//!
//! The controller drives a [`View`]; it never touches output directly. The
//! terminal implementation writes ANSI-styled text to stdout, and
//! [`message_html`] gives the markup form of a message for hosts that
//! render HTML.

use std::io::{self, Stdout, Write};

use crate::citation::{escape, strip_markup};
use crate::tooltip::{Size, Tooltip};
use crate::types::{Message, Reference, Sender};

/// ANSI escape code for dim text (used for the status line and sources).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for citation titles).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for citation panels).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Return to column zero and erase the line.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Widest citation panel the terminal draws, in columns.
const PANEL_WIDTH: usize = 60;

/// Surface the chat controller draws on.
///
/// Coordinates and sizes are in whatever unit the implementation uses
/// (pixels for a browser host, character cells for a terminal); the
/// controller only compares them with each other.
pub trait View: Send {
    /// Adds a message to the end of the message list.
    fn append_message(&mut self, message: &Message);

    /// Empties the message list.
    fn clear_messages(&mut self);

    /// Replaces the status line. An empty string clears it.
    fn set_status(&mut self, status: &str);

    /// Replaces the contents of the input control.
    fn set_input_text(&mut self, text: &str);

    /// Enables or disables the input control.
    fn set_input_enabled(&mut self, enabled: bool);

    /// Enables or disables the send control.
    fn set_send_enabled(&mut self, enabled: bool);

    /// Size of the visible area.
    fn viewport(&self) -> Size;

    /// Size the citation panel for `reference` will take.
    fn measure_tooltip(&self, reference: &Reference) -> Size;

    /// Draws a citation panel.
    fn show_tooltip(&mut self, tooltip: &Tooltip);

    /// Removes the citation panel.
    fn remove_tooltip(&mut self);
}

/// Renders `message` as the markup a browser host inserts into the list.
///
/// Bot content is trusted markup from the server and is inserted as is.
/// User content and sources are escaped.
pub fn message_html(message: &Message) -> String {
    let body = match message.sender {
        Sender::Bot => message.content.clone(),
        Sender::User => format!("<p>{}</p>", escape(&message.content)),
    };
    let sources = match &message.sources {
        Some(sources) => format!(r#"<div class="sources">{}</div>"#, escape(sources)),
        None => String::new(),
    };
    format!(
        r#"<div class="message {}">{}{}</div>"#,
        message.sender.css_class(),
        body,
        sources
    )
}

/// Terminal view with optional ANSI styling.
///
/// The input control is the line editor owned by the binary; this view only
/// remembers what the controller wants it to hold.
pub struct TerminalView {
    stdout: Stdout,
    use_color: bool,
    viewport: Size,
    status_shown: bool,
    input: String,
    send_enabled: bool,
}

impl TerminalView {
    /// Creates a new TerminalView with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new TerminalView with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            viewport: Size::new(80.0, 24.0),
            status_shown: false,
            input: String::new(),
            send_enabled: false,
        }
    }

    /// Sets the terminal size in character cells.
    pub fn with_viewport(mut self, columns: u16, rows: u16) -> Self {
        self.viewport = Size::new(f64::from(columns), f64::from(rows));
        self
    }

    /// Text the input control should be pre-filled with.
    pub fn input_text(&self) -> &str {
        &self.input
    }

    /// Whether the send control is currently enabled.
    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    /// Print an error message.
    pub fn print_error(&mut self, error: &str) {
        self.erase_status();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    /// Print an informational message.
    pub fn print_info(&mut self, info: &str) {
        self.erase_status();
        println!("{info}");
    }

    /// Flushes stdout to ensure immediate display of the status line.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn erase_status(&mut self) {
        if self.status_shown {
            if self.use_color {
                print!("{CLEAR_LINE}");
            } else {
                println!();
            }
            self.status_shown = false;
            self.flush();
        }
    }

    fn panel_width(&self) -> usize {
        let columns = self.viewport.width.max(0.0) as usize;
        columns.saturating_sub(4).clamp(20, PANEL_WIDTH)
    }

    fn panel_lines(&self, reference: &Reference) -> Vec<String> {
        let width = self.panel_width();
        let mut lines = wrap(&reference.title, width);
        lines.extend(wrap(&reference.byline(), width));
        lines.extend(wrap(&reference.text, width));
        if let Some(url) = &reference.url {
            lines.push(format!("View source: {url}"));
        }
        lines
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl View for TerminalView {
    fn append_message(&mut self, message: &Message) {
        // The line editor already shows what the user typed.
        if message.sender == Sender::User {
            return;
        }
        self.erase_status();
        let text = strip_markup(&message.content);
        println!("{}", text.trim_end());
        if let Some(sources) = &message.sources {
            if self.use_color {
                println!("{ANSI_DIM}Sources: {sources}{ANSI_RESET}");
            } else {
                println!("Sources: {sources}");
            }
        }
        println!();
        self.flush();
    }

    fn clear_messages(&mut self) {
        self.erase_status();
        if self.use_color {
            print!("\x1b[2J\x1b[H");
            self.flush();
        }
    }

    fn set_status(&mut self, status: &str) {
        if status.is_empty() {
            self.erase_status();
            return;
        }
        if self.use_color {
            print!("{CLEAR_LINE}{ANSI_DIM}{status}{ANSI_RESET}");
        } else {
            print!("\r{status:<width$}", width = PANEL_WIDTH);
        }
        self.status_shown = true;
        self.flush();
    }

    fn set_input_text(&mut self, text: &str) {
        self.input = text.to_string();
    }

    fn set_input_enabled(&mut self, _: bool) {
        // The line editor only prompts between turns.
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    fn viewport(&self) -> Size {
        self.viewport
    }

    fn measure_tooltip(&self, reference: &Reference) -> Size {
        let lines = self.panel_lines(reference);
        let width = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        // Border adds a column on each side and a row above and below.
        Size::new((width + 4) as f64, (lines.len() + 2) as f64)
    }

    fn show_tooltip(&mut self, tooltip: &Tooltip) {
        self.erase_status();
        let indent = " ".repeat(tooltip.bounds.x.max(0.0) as usize);
        let inner = (tooltip.bounds.width as usize).saturating_sub(4);
        let rule = "-".repeat(inner + 2);
        let (open, close) = if self.use_color {
            (ANSI_CYAN, ANSI_RESET)
        } else {
            ("", "")
        };
        println!("{indent}{open}+{rule}+{close}");
        for (index, line) in self.panel_lines(&tooltip.reference).iter().enumerate() {
            let padded = format!("{line:<inner$}");
            if index == 0 && self.use_color {
                println!("{indent}{open}|{close} {ANSI_BOLD}{padded}{ANSI_RESET} {open}|{close}");
            } else {
                println!("{indent}{open}|{close} {padded} {open}|{close}");
            }
        }
        println!("{indent}{open}+{rule}+{close}");
        self.flush();
    }

    fn remove_tooltip(&mut self) {
        // Terminal output cannot be taken back; the next panel replaces it.
    }
}

/// Greedy word wrap at `width` columns.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let needed = if line.is_empty() { 0 } else { 1 } + word.chars().count();
        if !line.is_empty() && line.chars().count() + needed > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_default_has_color() {
        let view = TerminalView::new();
        assert!(view.use_color);
    }

    #[test]
    fn view_without_color() {
        let view = TerminalView::with_color(false);
        assert!(!view.use_color);
    }

    #[test]
    fn bot_message_markup_carries_sources() {
        let message = Message::bot("<p>Answer</p>", Some("Ref A; Ref B".to_string()));
        assert_eq!(
            message_html(&message),
            r#"<div class="message bot-message"><p>Answer</p><div class="sources">Ref A; Ref B</div></div>"#
        );
    }

    #[test]
    fn user_message_markup_is_escaped() {
        let message = Message::user("a <b> & c");
        assert_eq!(
            message_html(&message),
            r#"<div class="message user-message"><p>a &lt;b&gt; &amp; c</p></div>"#
        );
    }

    #[test]
    fn measured_panel_fits_text() {
        let view = TerminalView::with_color(false).with_viewport(100, 30);
        let reference = Reference {
            title: "Open Science".to_string(),
            authors: "Doe, J.".to_string(),
            year: "2021".to_string(),
            text: "word ".repeat(40),
            url: None,
        };
        let size = view.measure_tooltip(&reference);
        assert!(size.width <= (PANEL_WIDTH + 4) as f64);
        assert!(size.height >= 5.0);
    }

    #[test]
    fn input_state_follows_controller_calls() {
        let mut view = TerminalView::with_color(false);
        assert_eq!(view.input_text(), "");
        assert!(!view.send_enabled());

        view.set_input_text("What is FAIR data?");
        view.set_send_enabled(true);
        assert_eq!(view.input_text(), "What is FAIR data?");
        assert!(view.send_enabled());

        view.set_input_text("");
        view.set_send_enabled(false);
        assert_eq!(view.input_text(), "");
        assert!(!view.send_enabled());
    }

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(
            wrap("one two three four", 9),
            vec!["one two".to_string(), "three".to_string(), "four".to_string()]
        );
        assert!(wrap("", 10).is_empty());
    }
}
