//! User-facing terminal output.

use std::io::{self, Write};

use crossterm::style::{Color, Stylize};

use crate::docker::CommandLine;

// ── Colour constants ──────────────────────────────────────────────────
pub const COLOR_INFO: Color = Color::Green;
pub const COLOR_COMMAND: Color = Color::DarkGrey;
pub const COLOR_ERROR: Color = Color::Red;

/// Where the session reports progress and container output.
///
/// Implementations must tolerate calls from the stream reader threads and
/// the interrupt thread at the same time.
pub trait Console: Send + Sync {
    /// A status line from this tool.
    fn info(&self, message: &str);

    /// Echo a command line before it runs.
    fn command(&self, command: &CommandLine);

    /// Container stdout, written as-is.
    fn stdout(&self, data: &[u8]);

    /// Container stderr, error-styled.
    fn stderr(&self, data: &[u8]);
}

/// Styled output on the process's stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    fn write(&self, bytes: &[u8]) {
        let mut out = io::stdout().lock();
        // A closed stdout must not take the session down with it.
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }
}

impl Console for TerminalConsole {
    fn info(&self, message: &str) {
        self.write(format!("{}\n", message.with(COLOR_INFO)).as_bytes());
    }

    fn command(&self, command: &CommandLine) {
        self.write(format!("{}\n", command.to_string().with(COLOR_COMMAND)).as_bytes());
    }

    fn stdout(&self, data: &[u8]) {
        self.write(data);
    }

    fn stderr(&self, data: &[u8]) {
        let text = String::from_utf8_lossy(data).into_owned();
        self.write(format!("{}", text.with(COLOR_ERROR)).as_bytes());
    }
}
