//! Statement parsing.
//!
//! Word, milestone, and change statements end at the newline; brace,
//! paren, and bracket bodies may span lines. Transcriptions and module
//! paths are recovered as raw source slices between their delimiters so
//! arbitrary IPA text survives tokenization untouched.

use crate::span::{Pos, Span, Spanned};
use crate::syntax::ast::*;
use crate::syntax::scanner::{scan, Token, TokenKind};
use crate::syntax::ParseError;

pub fn parse(source: &str, source_name: &str) -> Result<Vec<Statement>, ParseError> {
    let tokens = scan(source)?;
    Parser {
        source,
        source_name,
        tokens,
        cursor: 0,
    }
    .program()
}

struct Parser<'a> {
    source: &'a str,
    source_name: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser<'_> {
    fn program(mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek().is_none() {
                break;
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    // ---- token plumbing ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + ahead)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Newline)) {
            self.cursor += 1;
        }
    }

    fn previous_end(&self) -> Pos {
        if self.cursor == 0 {
            Pos::start()
        } else {
            self.tokens[self.cursor - 1].end
        }
    }

    fn span(&self, start: Pos, end: Pos) -> Span {
        Span::new(self.source_name, start, end)
    }

    fn token_span(&self, token: &Token) -> Span {
        self.span(token.start, token.end)
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::new(message, token.start, token.end),
            None => {
                let end = self.previous_end();
                ParseError::new(message, end, end)
            }
        }
    }

    fn eat_punct(&mut self, ch: char) -> bool {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Punct(c)) if *c == ch) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, ch: char, context: &str) -> Result<Token, ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Punct(ch) => Ok(self.advance().expect("peeked")),
            _ => Err(self.error_here(format!("expected '{}' {}", ch, context))),
        }
    }

    fn expect_word(&mut self, what: &str) -> Result<Spanned<String>, ParseError> {
        match self.peek() {
            Some(token) => match &token.kind {
                TokenKind::Word(text) => {
                    let spanned = Spanned::new(text.clone(), self.token_span(token));
                    self.cursor += 1;
                    Ok(spanned)
                }
                _ => Err(self.error_here(format!("expected {}", what))),
            },
            None => Err(self.error_here(format!("expected {}", what))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        let word = self.expect_word(&format!("'{}'", keyword))?;
        if word.node == keyword {
            Ok(())
        } else {
            Err(ParseError::new(
                format!("expected '{}'", keyword),
                word.span.start,
                word.span.end,
            ))
        }
    }

    fn expect_line_end(&mut self) -> Result<(), ParseError> {
        match self.peek().map(|t| &t.kind) {
            None => Ok(()),
            Some(TokenKind::Newline) => {
                self.cursor += 1;
                Ok(())
            }
            Some(_) => Err(self.error_here("expected end of line")),
        }
    }

    /// The raw source text from here to the end of the line, trimmed.
    fn rest_of_line(&mut self) -> Spanned<String> {
        let mut first: Option<Pos> = None;
        let mut last = self.previous_end();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Newline {
                break;
            }
            first.get_or_insert(token.start);
            last = token.end;
            self.cursor += 1;
        }
        match first {
            Some(start) => Spanned::new(
                self.source[start.offset..last.offset].trim().to_string(),
                self.span(start, last),
            ),
            None => {
                let here = self.previous_end();
                Spanned::new(String::new(), self.span(here, here))
            }
        }
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.peek().expect("caller checked for EOF");
        match &token.kind {
            TokenKind::Word(word) => match word.as_str() {
                "import" => self.import_statement(),
                "lang" => self.language_statement(),
                "trait" => self.trait_statement(),
                "class" => self.class_statement(),
                "series" => self.series_statement(),
                _ => Err(self.error_here("expected a statement")),
            },
            TokenKind::Punct('@') => self.milestone_statement(),
            TokenKind::Punct('-') => self.word_statement(),
            TokenKind::Punct('$') => self.change_statement(),
            _ => Err(self.error_here("expected a statement")),
        }
    }

    fn import_statement(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance().expect("peeked");
        let start = keyword.start;
        self.expect_punct('{', "after 'import'")?;
        self.skip_newlines();

        let mut members = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Some(token) if token.kind == TokenKind::Punct('*') => {
                    let span = self.token_span(token);
                    self.cursor += 1;
                    members.push(ImportMember::Wildcard(span));
                }
                Some(token) if matches!(token.kind, TokenKind::Word(_)) => {
                    members.push(ImportMember::Named(self.expect_word("import member")?));
                }
                _ => return Err(self.error_here("expected an import member")),
            }
            self.skip_newlines();
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('}', "after import members")?;
        self.expect_keyword("from")?;

        let raw = self.rest_of_line();
        if raw.node.is_empty() {
            return Err(self.error_here("expected a module path"));
        }
        let path = if let Some(scoped) = raw.node.strip_prefix('@') {
            match scoped.split_once('/') {
                Some((scope, path)) => ImportPath::Scoped {
                    scope: scope.to_string(),
                    path: path.to_string(),
                },
                None => {
                    return Err(ParseError::new(
                        "scoped import path needs the form @scope/path",
                        raw.span.start,
                        raw.span.end,
                    ))
                }
            }
        } else {
            ImportPath::Local {
                absolute: raw.node.starts_with('/'),
                path: raw.node.clone(),
            }
        };
        let path = Spanned::new(path, raw.span);
        self.expect_line_end()?;

        Ok(Statement::Import(ImportStmt {
            members,
            path,
            span: self.span(start, self.previous_end()),
        }))
    }

    fn language_statement(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance().expect("peeked");
        let start = keyword.start;
        let id = self.expect_word("a language id")?;
        let parent = if self.eat_punct('<') {
            Some(self.expect_word("a parent language id")?)
        } else {
            None
        };
        let display_name = if self.eat_punct(':') {
            let raw = self.rest_of_line();
            if raw.node.is_empty() {
                return Err(self.error_here("expected a language name after ':'"));
            }
            Some(raw)
        } else {
            None
        };
        self.expect_line_end()?;

        Ok(Statement::Language(LanguageStmt {
            id,
            parent,
            display_name,
            span: self.span(start, self.previous_end()),
        }))
    }

    fn at_time(&self) -> bool {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Word(word)) => word.starts_with(|c: char| c.is_ascii_digit()),
            Some(TokenKind::Punct('-')) => matches!(
                self.peek_at(1).map(|t| &t.kind),
                Some(TokenKind::Word(word)) if word.starts_with(|c: char| c.is_ascii_digit())
            ),
            _ => false,
        }
    }

    fn time_value(&mut self) -> Result<Spanned<f64>, ParseError> {
        let negative = self.eat_punct('-');
        let sign_start = if negative {
            self.tokens[self.cursor - 1].start
        } else {
            match self.peek() {
                Some(token) => token.start,
                None => return Err(self.error_here("expected a time")),
            }
        };
        let word = self.expect_word("a time")?;
        if word.node.is_empty() || !word.node.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseError::new(
                format!("invalid time '{}'", word.node),
                word.span.start,
                word.span.end,
            ));
        }
        let mut value: f64 = word.node.parse().map_err(|_| {
            ParseError::new(
                format!("invalid time '{}'", word.node),
                word.span.start,
                word.span.end,
            )
        })?;
        if negative {
            value = -value;
        }
        Ok(Spanned::new(value, self.span(sign_start, word.span.end)))
    }

    fn milestone_statement(&mut self) -> Result<Statement, ParseError> {
        let sigil = self.advance().expect("peeked");
        let start = sigil.start;

        let time = if self.at_time() {
            let starts = self.time_value()?;
            if self.eat_punct('-') {
                let ends = self.time_value()?;
                Some(TimeSpec::Range { starts, ends })
            } else {
                Some(TimeSpec::Instant(starts))
            }
        } else {
            None
        };

        let language = if time.is_some() {
            if self.eat_punct(',') {
                Some(self.expect_word("a language id")?)
            } else {
                None
            }
        } else if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Word(_))) {
            Some(self.expect_word("a language id")?)
        } else {
            None
        };

        if time.is_none() && language.is_none() {
            return Err(self.error_here("expected a time or language after '@'"));
        }
        self.expect_line_end()?;

        Ok(Statement::Milestone(MilestoneStmt {
            time,
            language,
            span: self.span(start, self.previous_end()),
        }))
    }

    fn trait_statement(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance().expect("peeked");
        let start = keyword.start;
        let name = self.expect_word("a trait name")?;
        self.expect_punct('{', "to open the feature list")?;

        let mut features = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Punct('}'))) {
                break;
            }
            let feature_start = match self.peek() {
                Some(token) => token.start,
                None => return Err(self.error_here("expected '}'")),
            };
            let default = self.eat_punct('*');
            let mut labels = vec![self.expect_word("a feature label")?];
            while self.eat_punct('|') {
                labels.push(self.expect_word("a feature label")?);
            }
            features.push(FeatureDecl {
                labels,
                default,
                span: self.span(feature_start, self.previous_end()),
            });
            self.skip_newlines();
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('}', "to close the feature list")?;

        Ok(Statement::Trait(TraitStmt {
            name,
            features,
            span: self.span(start, self.previous_end()),
        }))
    }

    fn class_statement(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance().expect("peeked");
        let start = keyword.start;
        let name = self.expect_word("a class name")?;
        self.expect_keyword("encodes")?;

        self.expect_punct('(', "to open the encoded trait list")?;
        let mut encodes = vec![self.expect_word("a trait name")?];
        while self.eat_punct(',') {
            encodes.push(self.expect_word("a trait name")?);
        }
        self.expect_punct(')', "to close the encoded trait list")?;

        self.expect_punct('{', "to open the phoneme list")?;
        let mut phonemes = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Punct('}'))) {
                break;
            }
            let glyph = self.expect_word("a phoneme glyph")?;
            let decl_start = glyph.span.start;
            self.expect_punct('=', "after the phoneme glyph")?;
            self.expect_punct('(', "to open the feature tuple")?;
            let mut tuple = vec![self.expect_word("a feature label")?];
            while self.eat_punct(',') {
                tuple.push(self.expect_word("a feature label")?);
            }
            self.expect_punct(')', "to close the feature tuple")?;
            phonemes.push(PhonemeDecl {
                glyph,
                features: tuple,
                span: self.span(decl_start, self.previous_end()),
            });
            self.skip_newlines();
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('}', "to close the phoneme list")?;

        Ok(Statement::Class(ClassStmt {
            name,
            encodes,
            phonemes,
            span: self.span(start, self.previous_end()),
        }))
    }

    fn series_statement(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance().expect("peeked");
        let start = keyword.start;
        let name = self.expect_word("a series name")?;

        let body = if self.eat_punct('=') {
            SeriesBody::Category(self.category()?)
        } else {
            self.expect_punct('[', "to open the phoneme list")?;
            self.skip_newlines();
            let mut glyphs = vec![self.expect_word("a phoneme glyph")?];
            while self.eat_punct(',') {
                self.skip_newlines();
                glyphs.push(self.expect_word("a phoneme glyph")?);
            }
            self.skip_newlines();
            self.expect_punct(']', "to close the phoneme list")?;
            SeriesBody::List(glyphs)
        };

        Ok(Statement::Series(SeriesStmt {
            name,
            body,
            span: self.span(start, self.previous_end()),
        }))
    }

    /// `[Base +x -y]` — base and modifiers each optional.
    fn category(&mut self) -> Result<CategoryExpr, ParseError> {
        let open = self.expect_punct('[', "to open the category")?;
        let base = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Word(_)) => Some(self.expect_word("a class or series name")?),
            _ => None,
        };
        let mut modifiers = Vec::new();
        loop {
            let positive = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Punct('+')) => true,
                Some(TokenKind::Punct('-')) => false,
                Some(TokenKind::Punct(']')) => break,
                _ => return Err(self.error_here("expected '+', '-', or ']' in category")),
            };
            self.cursor += 1;
            modifiers.push(ModifierExpr {
                positive,
                label: self.expect_word("a feature label")?,
            });
        }
        let close = self.expect_punct(']', "to close the category")?;
        Ok(CategoryExpr {
            base,
            modifiers,
            span: self.span(open.start, close.end),
        })
    }

    fn word_statement(&mut self) -> Result<Statement, ParseError> {
        let dash = self.advance().expect("peeked");
        let start = dash.start;
        let gloss = self.expect_word("a gloss")?;

        let open = self.expect_punct('/', "to open the transcription")?;
        let close = loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Punct('/')) => break self.advance().expect("peeked"),
                Some(TokenKind::Newline) | None => {
                    return Err(self.error_here("unterminated transcription"))
                }
                Some(_) => {
                    self.cursor += 1;
                }
            }
        };
        let pronunciation = Spanned::new(
            self.source[open.end.offset..close.start.offset]
                .trim()
                .to_string(),
            self.span(open.end, close.start),
        );

        let mut definitions = Vec::new();
        if self.eat_punct(':') {
            loop {
                let part_of_speech = match (
                    self.peek().map(|t| &t.kind),
                    self.peek_at(1).map(|t| &t.kind),
                ) {
                    (Some(TokenKind::Word(_)), Some(TokenKind::Punct('.'))) => {
                        let word = self.expect_word("a part of speech")?;
                        self.cursor += 1; // the '.'
                        Some(word)
                    }
                    _ => None,
                };
                let text = match self.peek() {
                    Some(token) => match &token.kind {
                        TokenKind::Str(text) => {
                            let spanned = Spanned::new(text.clone(), self.token_span(token));
                            self.cursor += 1;
                            spanned
                        }
                        _ => return Err(self.error_here("expected a quoted definition")),
                    },
                    None => return Err(self.error_here("expected a quoted definition")),
                };
                definitions.push(DefinitionExpr {
                    part_of_speech,
                    text,
                });
                if !self.eat_punct(',') {
                    break;
                }
            }
        }
        self.expect_line_end()?;

        Ok(Statement::Word(WordStmt {
            gloss,
            pronunciation,
            definitions,
            span: self.span(start, self.previous_end()),
        }))
    }

    fn change_statement(&mut self) -> Result<Statement, ParseError> {
        let sigil = self.advance().expect("peeked");
        let start = sigil.start;

        let mut elements = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Punct('>')) => {
                    self.cursor += 1;
                    break;
                }
                Some(TokenKind::Punct('[')) => {
                    elements.push(SegmentExpr::Category(self.category()?));
                }
                Some(TokenKind::Word(_)) => {
                    elements.push(SegmentExpr::Literal(self.expect_word("a segment")?));
                }
                _ => return Err(self.error_here("expected a source segment or '>'")),
            }
        }
        if elements.is_empty() {
            return Err(self.error_here("expected a change source before '>'"));
        }
        let empty_marker = match elements.as_slice() {
            [SegmentExpr::Category(category)]
                if category.base.is_none() && category.modifiers.is_empty() =>
            {
                Some(category.span.clone())
            }
            _ => None,
        };
        let source = match empty_marker {
            Some(span) => SourceExpr::Empty(span),
            None => SourceExpr::Segments(elements),
        };

        let target = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Punct('[')) => {
                let category = self.category()?;
                if let Some(base) = &category.base {
                    return Err(ParseError::new(
                        "a change target carries only feature modifiers",
                        base.span.start,
                        base.span.end,
                    ));
                }
                if category.modifiers.is_empty() {
                    TargetExpr::Empty(category.span)
                } else {
                    TargetExpr::Modification(category.modifiers, category.span)
                }
            }
            Some(TokenKind::Word(_)) => {
                let mut glyphs = vec![self.expect_word("a target")?];
                while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Word(_))) {
                    glyphs.push(self.expect_word("a target")?);
                }
                TargetExpr::Literal(glyphs)
            }
            _ => return Err(self.error_here("expected a change target after '>'")),
        };

        let environment = if self.eat_punct('/') {
            Some(self.environment()?)
        } else {
            None
        };

        let description = match self.peek() {
            Some(token) => match &token.kind {
                TokenKind::Str(text) => {
                    let spanned = Spanned::new(text.clone(), self.token_span(token));
                    self.cursor += 1;
                    Some(spanned)
                }
                _ => None,
            },
            None => None,
        };
        self.expect_line_end()?;

        Ok(Statement::Change(ChangeStmt {
            source,
            target,
            environment,
            description,
            span: self.span(start, self.previous_end()),
        }))
    }

    fn environment(&mut self) -> Result<EnvironmentExpr, ParseError> {
        let env_start = self.previous_end();
        let anchor_start = self.eat_punct('#');
        let mut anchor_end = false;
        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut focus_seen = false;

        loop {
            let side: &mut Vec<EnvElementExpr> = if focus_seen { &mut after } else { &mut before };
            match self.peek().map(|t| &t.kind) {
                None | Some(TokenKind::Newline) | Some(TokenKind::Str(_)) => break,
                Some(TokenKind::Punct('_')) => {
                    if focus_seen {
                        return Err(self.error_here("an environment has exactly one '_'"));
                    }
                    focus_seen = true;
                    self.cursor += 1;
                }
                Some(TokenKind::Punct('.')) => {
                    let token = self.advance().expect("peeked");
                    side.push(EnvElementExpr::SyllableBreak(self.token_span(&token)));
                }
                Some(TokenKind::Punct('[')) => {
                    side.push(EnvElementExpr::Category(self.category()?));
                }
                Some(TokenKind::Word(_)) => {
                    side.push(EnvElementExpr::Literal(self.expect_word("an environment")?));
                }
                Some(TokenKind::Punct('#')) => {
                    self.cursor += 1;
                    anchor_end = true;
                    match self.peek().map(|t| &t.kind) {
                        None | Some(TokenKind::Newline) | Some(TokenKind::Str(_)) => break,
                        _ => return Err(self.error_here("'#' must close the environment")),
                    }
                }
                _ => return Err(self.error_here("unexpected token in environment")),
            }
        }

        if !focus_seen {
            return Err(self.error_here("an environment requires a '_' focus"));
        }
        Ok(EnvironmentExpr {
            before,
            after,
            anchor_start,
            anchor_end,
            span: self.span(env_start, self.previous_end()),
        })
    }
}
