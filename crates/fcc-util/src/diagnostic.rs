//! Diagnostic sink shared by the lexer, parser, and code generator.
//!
//! A [`Handler`] owns the current unit name and source position and either
//! streams messages to standard error or collects them for inspection in
//! tests. All mutation goes through interior mutability so one handler can
//! be shared by reference between the lexer and the parser that drives it.

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::ErrorReported;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that aborts the current compilation.
    Error,
    /// A condition worth reporting that does not abort compilation.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A rendered diagnostic message with its source coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub unit: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(unit) = &self.unit {
            write!(f, "{}:", unit)?;
            if self.line != 0 {
                write!(f, "{}:{}:", self.line, self.column)?;
            }
            write!(f, " ")?;
        }
        write!(f, "{}: {}", self.level, self.message)
    }
}

/// Where emitted diagnostics go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    /// Write each diagnostic to standard error as it is reported.
    Stderr,
    /// Keep diagnostics in memory; used by unit tests.
    Collect,
}

/// The diagnostic sink.
///
/// Position state is sticky: `set_pos` is called by whoever is closest to
/// the source (the lexer for lexical errors, the parser for everything
/// else), and the next `error`/`warning` call stamps the stored position
/// onto the message.
pub struct Handler {
    emit: Emit,
    unit: RefCell<Option<String>>,
    line: Cell<u32>,
    column: Cell<u32>,
    error_count: Cell<usize>,
    collected: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Creates a handler that streams to standard error.
    pub fn new() -> Self {
        Self::with_emit(Emit::Stderr)
    }

    /// Creates a handler that collects diagnostics in memory.
    pub fn collecting() -> Self {
        Self::with_emit(Emit::Collect)
    }

    fn with_emit(emit: Emit) -> Self {
        Self {
            emit,
            unit: RefCell::new(None),
            line: Cell::new(0),
            column: Cell::new(0),
            error_count: Cell::new(0),
            collected: RefCell::new(Vec::new()),
        }
    }

    /// Sets the translation-unit name prefixed to every diagnostic.
    pub fn set_unit(&self, name: &str) {
        *self.unit.borrow_mut() = Some(name.to_string());
    }

    /// Sets the position stamped onto the next diagnostic.
    pub fn set_pos(&self, line: u32, column: u32) {
        self.line.set(line);
        self.column.set(column);
    }

    /// Reports an error and returns the sentinel the caller propagates.
    pub fn error(&self, message: impl Into<String>) -> ErrorReported {
        self.emit_diagnostic(Level::Error, message.into());
        self.error_count.set(self.error_count.get() + 1);
        ErrorReported
    }

    /// Reports a warning.
    pub fn warning(&self, message: impl Into<String>) {
        self.emit_diagnostic(Level::Warning, message.into());
    }

    /// Number of errors reported so far.
    pub fn error_count(&self) -> usize {
        self.error_count.get()
    }

    /// True if at least one error has been reported.
    pub fn has_errors(&self) -> bool {
        self.error_count.get() > 0
    }

    /// Drains the diagnostics accumulated by a collecting handler.
    pub fn take_collected(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.collected.borrow_mut())
    }

    fn emit_diagnostic(&self, level: Level, message: String) {
        let diag = Diagnostic {
            level,
            message,
            unit: self.unit.borrow().clone(),
            line: self.line.get(),
            column: self.column.get(),
        };
        match self.emit {
            Emit::Stderr => eprintln!("{}", diag),
            Emit::Collect => self.collected.borrow_mut().push(diag),
        }
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_records_position_and_unit() {
        let handler = Handler::collecting();
        handler.set_unit("demo.c");
        handler.set_pos(3, 14);
        let _ = handler.error("bad integer constant");

        let diags = handler.take_collected();
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].to_string(),
            "demo.c:3:14: error: bad integer constant"
        );
        assert!(handler.has_errors());
    }

    #[test]
    fn test_warning_does_not_count_as_error() {
        let handler = Handler::collecting();
        handler.warning("something dubious");
        assert_eq!(handler.error_count(), 0);
        let diags = handler.take_collected();
        assert_eq!(diags[0].level, Level::Warning);
    }

    #[test]
    fn test_display_without_unit() {
        let handler = Handler::collecting();
        let _ = handler.error("unexpected character");
        let diags = handler.take_collected();
        assert_eq!(diags[0].to_string(), "error: unexpected character");
    }
}
