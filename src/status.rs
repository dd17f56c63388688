//! The status line shown while a turn is in flight.

/// Status text shown as soon as a question is submitted.
pub const STATUS_PROCESSING: &str = "Processing your request";

/// Status text shown when a turn fails.
pub const STATUS_FAILED: &str = "Error: Failed to get response";

/// Number of animation frames: zero through three trailing dots.
pub const DOT_FRAMES: usize = 4;

/// A status text with a cycling trailing-dot suffix.
///
/// The suffix is a purely local liveness signal; it advances on the
/// controller's ticker, independent of anything the server sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotCycle {
    base: String,
    dots: usize,
}

impl DotCycle {
    /// Starts a cycle at `base` with no dots.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            dots: 0,
        }
    }

    /// Replaces the text, keeping the current suffix.
    pub fn set_base(&mut self, base: impl Into<String>) {
        self.base = base.into();
    }

    /// Moves to the next frame and returns its text.
    pub fn advance(&mut self) -> String {
        self.dots = (self.dots + 1) % DOT_FRAMES;
        self.text()
    }

    /// Number of dots currently shown.
    pub fn dots(&self) -> usize {
        self.dots
    }

    /// Text of the current frame.
    pub fn text(&self) -> String {
        format!("{}{}", self.base, ".".repeat(self.dots))
    }
}

impl Default for DotCycle {
    fn default() -> Self {
        Self::new(STATUS_PROCESSING)
    }
}
