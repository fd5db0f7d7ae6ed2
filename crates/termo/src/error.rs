// SPDX-License-Identifier: MIT
//
// Error type shared by the terminal lifecycle and the input path.
//
// Drawing never fails: out-of-range coordinates are clipped silently. The
// only failures are "stdin is not a terminal", a failed raw-mode switch, and
// plain I/O errors from reads, writes and size queries.

use std::io;

use thiserror::Error;

/// Errors surfaced by terminal control and input reading.
#[derive(Debug, Error)]
pub enum Error {
    /// Standard input is not attached to a terminal.
    ///
    /// Returned by [`Terminal::init`](crate::terminal::Terminal::init) so the
    /// caller can fall back to non-interactive behavior.
    #[error("not running in a terminal")]
    NotATerminal,

    /// Switching standard input to raw mode failed.
    ///
    /// No [`Terminal`](crate::terminal::Terminal) is produced; the terminal
    /// is left in whatever mode it had before.
    #[error("failed to enter raw mode: {0}")]
    RawMode(#[source] io::Error),

    /// Pass-through I/O failure (read, write, or size query).
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this error means the caller should fall back to
    /// non-interactive output instead of aborting.
    #[must_use]
    pub const fn is_not_a_terminal(&self) -> bool {
        matches!(self, Self::NotATerminal)
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_terminal_message() {
        assert_eq!(Error::NotATerminal.to_string(), "not running in a terminal");
        assert!(Error::NotATerminal.is_not_a_terminal());
    }

    #[test]
    fn raw_mode_keeps_source() {
        let err = Error::RawMode(io::Error::other("tcsetattr"));
        assert!(err.to_string().contains("tcsetattr"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_not_a_terminal());
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
        assert_eq!(err.to_string(), "eof");
    }
}
