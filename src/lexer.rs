use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::errors::{ParseError, Position};

/// A token is one lexical unit read from the bib source. A bib entry
/// looks as follows:
///
/// ```tex
/// @Book{works:4,
///   author = {Shakespeare, William},
///   title  = "Sonnets" # suffix,
/// }
/// ```
///
/// In this case, the lexer emits `At`, `Identifier("Book")`, `LBrace`,
/// `Identifier("works:4")`, `Comma`, `Identifier("author")`, `Equals`,
/// `BracedLiteral("Shakespeare, William")`, `Comma`,
/// `Identifier("title")`, `Equals`, `QuotedLiteral("Sonnets")`, `Hash`,
/// `Identifier("suffix")`, `RBrace` and finally `Eof`. Entry-type
/// keywords such as `string` or `comment` are plain identifiers here;
/// the parser interprets them. Token is just the data contract between
/// lexer and parser and not meant to be externally visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    At,
    Identifier,
    LBrace,
    RBrace,
    Comma,
    Equals,
    Hash,
    QuotedLiteral,
    BracedLiteral,
    Number,
    Eof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    /// For literals, the inner text without the delimiters.
    pub(crate) text: String,
    /// Where the token (or its opening delimiter) starts.
    pub(crate) position: Position,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::QuotedLiteral => write!(f, "\"{}\"", self.text),
            TokenKind::BracedLiteral => write!(f, "{{{}}}", self.text),
            TokenKind::Eof => write!(f, "end of file"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

/// Characters that terminate an identifier run. A `"` also terminates,
/// since it always opens a quoted literal.
fn is_structural(chr: char) -> bool {
    matches!(chr, '@' | '{' | '}' | ',' | '=' | '#' | '"')
}

pub(crate) struct Lexer<'s> {
    src: &'s str,
}

impl<'s> Lexer<'s> {
    pub(crate) fn new(src: &'s str) -> Lexer<'s> {
        Lexer { src }
    }

    /// Mint a fresh iterator over the source. Can be called repeatedly;
    /// every iterator restarts from the beginning.
    pub(crate) fn iter(&self) -> LexingIterator<'s> {
        LexingIterator {
            chars: self.src.chars().peekable(),
            line: 0,
            col: 0,
            in_entry: false,
            depth: 0,
            value_pos: false,
            eof_emitted: false,
            failed: false,
        }
    }
}

pub(crate) struct LexingIterator<'s> {
    chars: Peekable<Chars<'s>>,
    line: usize,
    col: usize,
    /// inside an `@...{...}` construct? free text outside is commentary
    in_entry: bool,
    /// structural brace depth of the current construct
    depth: usize,
    /// a field value may start here (an `=` or `#` was just read), so a
    /// `{` opens a braced literal and a digit run is a number
    value_pos: bool,
    eof_emitted: bool,
    failed: bool,
}

impl<'s> LexingIterator<'s> {
    fn bump(&mut self) -> Option<char> {
        let chr = self.chars.next()?;
        if chr == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(chr)
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
        }
    }

    fn punct(&self, kind: TokenKind, chr: char, position: Position) -> Token {
        Token {
            kind,
            text: chr.to_string(),
            position,
        }
    }

    /// Reads a `{...}` literal after its opening brace was consumed.
    /// Inner brace pairs are literal text; depth must return to zero.
    fn braced_literal(&mut self, open: Position) -> Result<Token, ParseError> {
        self.value_pos = false;
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Some('{') => {
                    depth += 1;
                    text.push('{');
                }
                Some('}') if depth == 0 => {
                    return Ok(Token {
                        kind: TokenKind::BracedLiteral,
                        text,
                        position: open,
                    })
                }
                Some('}') => {
                    depth -= 1;
                    text.push('}');
                }
                Some(chr) => text.push(chr),
                None => {
                    self.failed = true;
                    return Err(ParseError::UnterminatedBrace(open));
                }
            }
        }
    }

    /// Reads a `"..."` literal after its opening quote was consumed.
    /// Braces are depth-tracked inside; a quote at depth zero closes
    /// the literal, a quote at positive depth is literal text.
    fn quoted_literal(&mut self, open: Position) -> Result<Token, ParseError> {
        self.value_pos = false;
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Some('"') if depth == 0 => {
                    return Ok(Token {
                        kind: TokenKind::QuotedLiteral,
                        text,
                        position: open,
                    })
                }
                Some('{') => {
                    depth += 1;
                    text.push('{');
                }
                Some('}') => {
                    depth = depth.saturating_sub(1);
                    text.push('}');
                }
                Some(chr) => text.push(chr),
                None => {
                    self.failed = true;
                    return Err(ParseError::UnterminatedQuote(open));
                }
            }
        }
    }

    /// Reads a maximal run of non-structural, non-whitespace characters.
    /// An all-digit run where a value is expected is a number; anywhere
    /// else such a run is an identifier.
    fn word(&mut self, first: char, position: Position) -> Token {
        let mut text = String::new();
        text.push(first);
        while let Some(&chr) = self.chars.peek() {
            if chr.is_whitespace() || is_structural(chr) {
                break;
            }
            text.push(chr);
            self.bump();
        }
        let kind = if self.value_pos && text.bytes().all(|b| b.is_ascii_digit()) {
            TokenKind::Number
        } else {
            TokenKind::Identifier
        };
        self.value_pos = false;
        Token {
            kind,
            text,
            position,
        }
    }
}

impl<'s> Iterator for LexingIterator<'s> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.eof_emitted {
            return None;
        }

        if self.in_entry {
            while matches!(self.chars.peek(), Some(chr) if chr.is_whitespace()) {
                self.bump();
            }
        } else {
            // free text between entries is commentary
            while matches!(self.chars.peek(), Some(chr) if *chr != '@') {
                self.bump();
            }
        }

        let position = LexingIterator::position(self);
        let chr = match self.bump() {
            Some(chr) => chr,
            None => {
                self.eof_emitted = true;
                return Some(Ok(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    position,
                }));
            }
        };

        let token = match chr {
            '@' => {
                self.in_entry = true;
                self.depth = 0;
                self.value_pos = false;
                self.punct(TokenKind::At, '@', position)
            }
            '{' if self.value_pos => return Some(self.braced_literal(position)),
            '{' => {
                self.depth += 1;
                self.punct(TokenKind::LBrace, '{', position)
            }
            '}' => {
                self.value_pos = false;
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    self.in_entry = false;
                }
                self.punct(TokenKind::RBrace, '}', position)
            }
            ',' => {
                self.value_pos = false;
                self.punct(TokenKind::Comma, ',', position)
            }
            '=' => {
                self.value_pos = true;
                self.punct(TokenKind::Equals, '=', position)
            }
            '#' => {
                self.value_pos = true;
                self.punct(TokenKind::Hash, '#', position)
            }
            '"' => return Some(self.quoted_literal(position)),
            _ => self.word(chr, position),
        };
        Some(Ok(token))
    }
}
