use std::error;
use std::fmt;

/// Location of a character in the source text. Stored zero-based,
/// rendered one-based in messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} col {}", self.line + 1, self.col + 1)
    }
}

/// Represents a fatal error that aborts the whole parse. No partial
/// bibliography is ever returned alongside one of these.
///
/// Schema gaps, duplicate keys and undefined macros are *not* errors;
/// they are collected as [`Diagnostic`](crate::Diagnostic) values on a
/// successful result.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// A `{...}` literal whose brace depth never returned to zero.
    /// The position points at the opening brace.
    UnterminatedBrace(Position),
    /// A `"..."` literal without a closing quote. The position points
    /// at the opening quote.
    UnterminatedQuote(Position),
    /// The grammar expected one construct but found another token.
    Unexpected {
        position: Position,
        expected: &'static str,
        found: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedBrace(position) => {
                write!(f, "unterminated '{{' literal opened at {position}")
            }
            Self::UnterminatedQuote(position) => {
                write!(f, "unterminated '\"' literal opened at {position}")
            }
            Self::Unexpected {
                position,
                expected,
                found,
            } => {
                write!(f, "expected {expected} but found {found} at {position}")
            }
        }
    }
}

impl error::Error for ParseError {}
