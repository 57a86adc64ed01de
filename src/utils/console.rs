//! Timestamped run log.

use chrono::Utc;
use log::info;

/// Time format of [`Console`] lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Buffer of timestamped messages collected during a run.
///
/// Every line is also sent to [`log`], so the buffer is what ends up embedded in error
/// messages while the logger remains the live view.
#[derive(Clone, Debug, Default)]
pub struct Console {
    lines: Vec<String>,
}

impl Console {
    pub fn new() -> Self {
        Console::default()
    }

    /// Appends a message, prefixed with the current UTC time.
    ///
    /// ```rust
    /// use kb_fasttree::utils::console::Console;
    /// let mut console = Console::new();
    /// console.log("RUNNING FASTTREE");
    /// assert!(console.lines()[0].ends_with("] RUNNING FASTTREE"));
    /// assert!(console.lines()[0].starts_with('['));
    /// ```
    pub fn log(&mut self, message: impl AsRef<str>) {
        let line = format!("[{}] {}", Utc::now().format(TIMESTAMP_FORMAT), message.as_ref());
        info!("{}", message.as_ref());
        self.lines.push(line);
    }

    /// Appends a message without logging it, for lines the logger has already seen.
    pub fn record(&mut self, message: impl AsRef<str>) {
        let line = format!("[{}] {}", Utc::now().format(TIMESTAMP_FORMAT), message.as_ref());
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl std::fmt::Display for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}
