//! Diagnostic accumulation.
//!
//! Every phase owns a [`Handler`] and pushes [`Diagnostic`]s into it while
//! it runs. Phases never abort on the first error: the lexer keeps lexing
//! past an ILLEGAL token, the parser recovers to the next sentinel, the
//! analyzer keeps walking the tree. The driver inspects the handler after a
//! phase completes and refuses to run the next phase while the log is
//! non-empty.
//!
//! A rendered entry has the shape the UI expects:
//!
//! ```text
//! line:col  kind-code  lexeme  message
//! ```

use std::cell::RefCell;
use std::fmt;

use crate::Pos;

/// A single error entry.
///
/// `code` is the numeric kind-code of the offending token (or 0 when the
/// error is not anchored to a token), `lexeme` its text.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Position of the offending token.
    pub pos: Pos,
    /// Kind-code of the offending token, 0 if none.
    pub code: i32,
    /// Lexeme of the offending token, empty if none.
    pub lexeme: String,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic anchored to a token.
    pub fn new(pos: Pos, code: i32, lexeme: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pos,
            code,
            lexeme: lexeme.into(),
            message: message.into(),
        }
    }

    /// Creates a diagnostic that is not anchored to a token.
    pub fn bare(pos: Pos, message: impl Into<String>) -> Self {
        Self::new(pos, 0, "", message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {}  {}  {}",
            self.pos, self.code, self.lexeme, self.message
        )
    }
}

/// Collector for the diagnostics of one phase.
///
/// Interior mutability lets shared-borrowed components (the parser's
/// productions, the analyzer's traversal) report errors without threading
/// `&mut` everywhere.
///
/// # Examples
///
/// ```
/// use cmmc_util::{Handler, Pos};
///
/// let handler = Handler::new();
/// handler.report(Pos::new(1, 4), 700, "x", "variable not defined");
/// assert!(handler.has_errors());
/// assert_eq!(handler.error_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Creates an empty handler.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Reports an error anchored to a token.
    pub fn report(&self, pos: Pos, code: i32, lexeme: impl Into<String>, message: impl Into<String>) {
        self.emit(Diagnostic::new(pos, code, lexeme, message));
    }

    /// Reports an error with no token anchor.
    pub fn report_bare(&self, pos: Pos, message: impl Into<String>) {
        self.emit(Diagnostic::bare(pos, message));
    }

    /// Appends an already-built diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// True if at least one error has been reported.
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.borrow().is_empty()
    }

    /// Number of reported errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    /// Drains the collected diagnostics, leaving the handler empty.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Renders all entries, one per line.
    pub fn render(&self) -> String {
        let diags = self.diagnostics.borrow();
        let mut out = String::new();
        for d in diags.iter() {
            out.push_str(&d.to_string());
            out.push('\n');
        }
        out
    }
}
