//! Compile diagnostics.
//!
//! The compiler records errors and warnings into the module it is building;
//! it never raises them. Each record carries a stable machine-readable code,
//! an optional human message, structured parameters, and the source span it
//! points at. Errors re-emitted from an imported module additionally carry
//! the span inside the imported source.

use std::borrow::Cow;
use std::collections::HashMap;

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single recorded problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Error code for programmatic handling
    pub code: Cow<'static, str>,
    /// Human-readable message
    pub message: String,
    /// Where the problem was noticed. For re-imported errors this is the
    /// import statement.
    pub span: Span,
    /// For re-imported errors, the span inside the imported source.
    pub source_span: Option<Span>,
    /// Structured parameters for error context
    pub params: HashMap<Cow<'static, str>, Value>,
}

impl Diagnostic {
    pub fn error(code: impl Into<Cow<'static, str>>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: code.into(),
            message: String::new(),
            span,
            source_span: None,
            params: HashMap::new(),
        }
    }

    pub fn warning(code: impl Into<Cow<'static, str>>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(code, span)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_source_span(mut self, span: Span) -> Self {
        self.source_span = Some(span);
        self
    }

    pub fn add_param(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}] {}", kind, self.code, self.span)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(origin) = &self.source_span {
            write!(f, " (from {})", origin)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Renders a batch of diagnostics as a colored report for terminals.
pub struct DiagnosticReport<'a>(pub &'a [Diagnostic]);

impl std::fmt::Display for DiagnosticReport<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        writeln!(
            f,
            "{}",
            "══════════════ Compile Diagnostics ══════════════".red().bold()
        )?;
        let mut iter = self.0.iter().peekable();
        while let Some(diagnostic) = iter.next() {
            let is_last = iter.peek().is_none();
            let branch = if is_last {
                "└─".cyan()
            } else {
                "├─".cyan()
            };
            let label = match diagnostic.severity {
                Severity::Error => diagnostic.code.red().bold(),
                Severity::Warning => diagnostic.code.yellow().bold(),
            };
            writeln!(
                f,
                "{} {} {} {}",
                branch,
                label,
                diagnostic.span.to_string().bright_black(),
                diagnostic.message
            )?;
        }
        writeln!(
            f,
            "{}",
            "══════════════════════════════════════════════════".red().bold()
        )
    }
}
