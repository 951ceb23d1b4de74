//! Parsed statements.
//!
//! Names are carried as spanned strings; resolution against the module
//! happens in the compiler driver, never here.

use crate::span::{Span, Spanned};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Import(ImportStmt),
    Language(LanguageStmt),
    Milestone(MilestoneStmt),
    Trait(TraitStmt),
    Class(ClassStmt),
    Series(SeriesStmt),
    Word(WordStmt),
    Change(ChangeStmt),
}

impl Statement {
    pub fn span(&self) -> &Span {
        match self {
            Statement::Import(s) => &s.span,
            Statement::Language(s) => &s.span,
            Statement::Milestone(s) => &s.span,
            Statement::Trait(s) => &s.span,
            Statement::Class(s) => &s.span,
            Statement::Series(s) => &s.span,
            Statement::Word(s) => &s.span,
            Statement::Change(s) => &s.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportPath {
    Scoped { scope: String, path: String },
    Local { path: String, absolute: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportMember {
    Wildcard(Span),
    Named(Spanned<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportStmt {
    pub members: Vec<ImportMember>,
    pub path: Spanned<ImportPath>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageStmt {
    pub id: Spanned<String>,
    pub parent: Option<Spanned<String>>,
    pub display_name: Option<Spanned<String>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimeSpec {
    /// `@ 1350` — starts then, never ends.
    Instant(Spanned<f64>),
    /// `@ 1350-1500` — half-open window.
    Range {
        starts: Spanned<f64>,
        ends: Spanned<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneStmt {
    pub time: Option<TimeSpec>,
    pub language: Option<Spanned<String>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDecl {
    /// Synonymous labels, `|`-separated in source.
    pub labels: Vec<Spanned<String>>,
    /// Marked with a leading `*`.
    pub default: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitStmt {
    pub name: Spanned<String>,
    pub features: Vec<FeatureDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhonemeDecl {
    pub glyph: Spanned<String>,
    /// Feature labels, positional over the class's encodes list.
    pub features: Vec<Spanned<String>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassStmt {
    pub name: Spanned<String>,
    pub encodes: Vec<Spanned<String>>,
    pub phonemes: Vec<PhonemeDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifierExpr {
    pub positive: bool,
    pub label: Spanned<String>,
}

/// `[Base +x -y]`, or `[+x]` with no base.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryExpr {
    pub base: Option<Spanned<String>>,
    pub modifiers: Vec<ModifierExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesBody {
    List(Vec<Spanned<String>>),
    Category(CategoryExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStmt {
    pub name: Spanned<String>,
    pub body: SeriesBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionExpr {
    pub part_of_speech: Option<Spanned<String>>,
    pub text: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordStmt {
    pub gloss: Spanned<String>,
    /// Raw text between the transcription slashes.
    pub pronunciation: Spanned<String>,
    pub definitions: Vec<DefinitionExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentExpr {
    /// A glyph run; the compiler resolves it to a class, series, or
    /// phoneme sequence.
    Literal(Spanned<String>),
    Category(CategoryExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceExpr {
    /// `[]` — the change applies between phonemes.
    Empty(Span),
    Segments(Vec<SegmentExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetExpr {
    /// `[]` — delete the match.
    Empty(Span),
    /// Glyph runs to transcribe.
    Literal(Vec<Spanned<String>>),
    /// `[+x -y]` — feature modification.
    Modification(Vec<ModifierExpr>, Span),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvElementExpr {
    Literal(Spanned<String>),
    Category(CategoryExpr),
    /// `.` — accepted and ignored by the engine.
    SyllableBreak(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentExpr {
    pub before: Vec<EnvElementExpr>,
    pub after: Vec<EnvElementExpr>,
    pub anchor_start: bool,
    pub anchor_end: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeStmt {
    pub source: SourceExpr,
    pub target: TargetExpr,
    pub environment: Option<EnvironmentExpr>,
    pub description: Option<Spanned<String>>,
    pub span: Span,
}
