//! Diagnostic reports.
//!
//! The session is observable only through the events it reports here.
//! Text format:
//! ```text
//! stdout: 128 bytes received
//! stderr: connect: 10.0.0.1:443: Connection refused (os error 111)
//! ```

use std::io::Write;

use serde::Serialize;

use crate::config::ReportFormat;
use crate::session::state::SessionState;

/// Something the session wants the outside world to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A lifecycle stage was entered.
    StageEntered { stage: SessionState },
    /// One message was read from the stream.
    BytesReceived { bytes: usize },
    /// A stage failed; the session is now `Failed`.
    StageFailed { label: &'static str, message: String },
    /// The close sequence finished with `buffered` bytes retained.
    Closed { buffered: usize },
}

/// Sink for session events.
pub trait Reporter {
    fn report(&self, event: &SessionEvent);
}

/// Writes byte counts to stdout and failures to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    format: ReportFormat,
}

impl ConsoleReporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    fn render(&self, event: &SessionEvent) -> Option<(Channel, String)> {
        if self.format == ReportFormat::Json {
            let channel = match event {
                SessionEvent::StageFailed { .. } => Channel::Stderr,
                _ => Channel::Stdout,
            };
            return serde_json::to_string(event).ok().map(|line| (channel, line));
        }

        match event {
            SessionEvent::StageEntered { .. } => None,
            SessionEvent::BytesReceived { bytes } => Some((Channel::Stdout, format!("{} bytes received", bytes))),
            SessionEvent::StageFailed { label, message } => Some((Channel::Stderr, format!("{}: {}", label, message))),
            SessionEvent::Closed { buffered } => Some((Channel::Stdout, format!("closed with {} bytes buffered", buffered))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Stdout,
    Stderr,
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &SessionEvent) {
        let Some((channel, line)) = self.render(event) else {
            return;
        };

        // Write errors are ignored; a closed stdout does not end the session.
        let _ = match channel {
            Channel::Stdout => writeln!(std::io::stdout().lock(), "{}", line),
            Channel::Stderr => writeln!(std::io::stderr().lock(), "{}", line),
        };
    }
}
