//! Tokenization.
//!
//! The scanner is deliberately permissive about what a "word" is: anything
//! that is not whitespace, not punctuation the grammar reserves, and not a
//! quote. IPA glyph runs and plain identifiers come out as the same token
//! kind; the parser and compiler decide which reading applies.

use crate::span::Pos;
use crate::syntax::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An identifier or glyph run.
    Word(String),
    /// A quoted string, escapes resolved.
    Str(String),
    Punct(char),
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Pos,
    pub end: Pos,
}

fn is_reserved(ch: char) -> bool {
    matches!(
        ch,
        '{' | '}'
            | '('
            | ')'
            | '['
            | ']'
            | '<'
            | '>'
            | ','
            | ':'
            | '|'
            | '*'
            | '='
            | '@'
            | '$'
            | '/'
            | '_'
            | '#'
            | '.'
            | '+'
            | '-'
            | '"'
    )
}

pub fn scan(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut pos = Pos::start();

    while let Some(&ch) = chars.peek() {
        let start = pos;

        if ch == '\n' {
            chars.next();
            pos.advance(ch);
            tokens.push(Token {
                kind: TokenKind::Newline,
                start,
                end: pos,
            });
            continue;
        }
        if ch.is_whitespace() {
            chars.next();
            pos.advance(ch);
            continue;
        }
        // line comment
        if ch == '/' && chars.clone().nth(1) == Some('/') {
            while let Some(&c) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
                pos.advance(c);
            }
            continue;
        }
        if ch == '"' {
            chars.next();
            pos.advance(ch);
            let mut text = String::new();
            let mut closed = false;
            while let Some(&c) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
                pos.advance(c);
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => {
                        if let Some(&escaped) = chars.peek() {
                            chars.next();
                            pos.advance(escaped);
                            text.push(escaped);
                        }
                    }
                    _ => text.push(c),
                }
            }
            if !closed {
                return Err(ParseError::new("unterminated string", start, pos));
            }
            tokens.push(Token {
                kind: TokenKind::Str(text),
                start,
                end: pos,
            });
            continue;
        }
        if is_reserved(ch) {
            chars.next();
            pos.advance(ch);
            tokens.push(Token {
                kind: TokenKind::Punct(ch),
                start,
                end: pos,
            });
            continue;
        }

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || is_reserved(c) {
                break;
            }
            chars.next();
            pos.advance(c);
            word.push(c);
        }
        tokens.push(Token {
            kind: TokenKind::Word(word),
            start,
            end: pos,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_words_and_punct() {
        assert_eq!(
            kinds("$ k > ʃ"),
            vec![
                TokenKind::Punct('$'),
                TokenKind::Word("k".into()),
                TokenKind::Punct('>'),
                TokenKind::Word("ʃ".into()),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("lang ON // Old Norse\n"),
            vec![
                TokenKind::Word("lang".into()),
                TokenKind::Word("ON".into()),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""first person \"singular\"""#),
            vec![TokenKind::Str("first person \"singular\"".into())]
        );
        assert!(scan("\"open").is_err());
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = scan("a\nb").unwrap();
        assert_eq!(tokens[0].start.line, 1);
        assert_eq!(tokens[2].start.line, 2);
        assert_eq!(tokens[2].start.column, 1);
    }

    #[test]
    fn test_glyph_runs_keep_combining_marks() {
        let tokens = scan("otʃõ").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Word("otʃõ".into()));
    }
}
