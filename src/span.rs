//! Source positions and spans.
//!
//! Every AST node and diagnostic carries a span so errors can point back
//! into the text they came from, including across module imports.

use serde::Serialize;

/// A position inside a source text. `offset` is a byte offset; `line` and
/// `column` are 1-based and count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pos {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn start() -> Self {
        Pos {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Advance past one character, tracking line breaks.
    pub fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl Default for Pos {
    fn default() -> Self {
        Pos::start()
    }
}

/// A contiguous region of one source text, identified by the source name
/// it was read from. Imported modules keep their own source names, which
/// is what lets re-emitted errors cite the foreign file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub source: String,
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(source: impl Into<String>, start: Pos, end: Pos) -> Self {
        Span {
            source: source.into(),
            start,
            end,
        }
    }

    /// A zero-width span for diagnostics that have no textual site, such
    /// as a snapshot request for an unknown language.
    pub fn synthetic(source: impl Into<String>) -> Self {
        Span::new(source, Pos::start(), Pos::start())
    }

    /// The smallest span covering both `self` and `other`. Both sides are
    /// expected to come from the same source text.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Span::new(self.source.clone(), start, end)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.start.line, self.start.column)
    }
}

/// A value paired with the span it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_advance() {
        let mut pos = Pos::start();
        pos.advance('a');
        assert_eq!(pos.offset, 1);
        assert_eq!(pos.column, 2);

        pos.advance('\n');
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 1);

        pos.advance('ʃ');
        assert_eq!(pos.offset, 2 + 'ʃ'.len_utf8());
        assert_eq!(pos.column, 2);
    }

    #[test]
    fn test_span_merge() {
        let mut mid = Pos::start();
        for ch in "abc".chars() {
            mid.advance(ch);
        }
        let mut end = mid;
        for ch in "def".chars() {
            end.advance(ch);
        }

        let a = Span::new("test", Pos::start(), mid);
        let b = Span::new("test", mid, end);
        let merged = a.merge(&b);
        assert_eq!(merged.start, Pos::start());
        assert_eq!(merged.end, end);
    }
}
