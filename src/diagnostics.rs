use std::fmt::{self, Write as _};

use serde::Serialize;
use thiserror::Error;

use crate::error_code::ErrorCode;

/// Byte range plus 1-based line/column bounds within a source file.
///
/// `end_column` is exclusive: a one-character token at column 5 has
/// `end_column == 6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub const fn new(
        start: usize,
        end: usize,
        line: usize,
        column: usize,
        end_line: usize,
        end_column: usize,
    ) -> Self {
        Self {
            start,
            end,
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Span covering `self` through `other`.
    pub fn to(self, other: SourceSpan) -> SourceSpan {
        SourceSpan {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
            end_line: other.end_line,
            end_column: other.end_column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
}

pub const DEFAULT_FILE: &str = "<input>";

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            end_line: None,
            end_column: None,
        }
    }

    pub fn from_span(file: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            file: file.into(),
            line: span.line,
            column: span.column,
            end_line: Some(span.end_line),
            end_column: Some(span.end_column),
        }
    }

    /// Number of carets to draw under the reported column.
    fn caret_width(&self, source_line: &str) -> usize {
        match (self.end_line, self.end_column) {
            (Some(end_line), Some(end_column)) if end_line == self.line => {
                end_column.saturating_sub(self.column).max(1)
            }
            (Some(end_line), _) if end_line > self.line => {
                let line_len = source_line.chars().count();
                (line_len + 1).saturating_sub(self.column).max(1)
            }
            _ => 1,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Program text together with the name it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub file: String,
    pub text: String,
}

impl SourceText {
    pub fn new(file: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            text: text.into(),
        }
    }
}

/// A single structured failure (or warning) with a stable code.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub source_line: Option<String>,
    pub suggestion: Option<String>,
    pub related: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.default_severity(),
            message: message.into(),
            location: None,
            source_line: None,
            suggestion: None,
            related: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        let file = self
            .location
            .take()
            .map(|loc| loc.file)
            .unwrap_or_else(|| DEFAULT_FILE.to_string());
        self.location = Some(SourceLocation::from_span(file, span));
        self
    }

    /// Attach `span` only if no location has been recorded yet.
    pub fn or_span(self, span: SourceSpan) -> Self {
        if self.location.is_some() {
            self
        } else {
            self.with_span(span)
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_related(mut self, related: Diagnostic) -> Self {
        self.related.push(related);
        self
    }

    /// Fill in the file name and the offending source line from `source`.
    ///
    /// Only blanks are filled, so the innermost text applied wins. Related
    /// diagnostics are attributed too.
    pub fn with_source(mut self, file: &str, source: &str) -> Self {
        if let Some(location) = self.location.as_mut() {
            if location.file == DEFAULT_FILE {
                location.file = file.to_string();
            }
            if self.source_line.is_none() && location.line > 0 {
                self.source_line = source
                    .lines()
                    .nth(location.line - 1)
                    .map(|line| line.trim_end_matches('\r').to_string());
            }
        }
        self.related = self
            .related
            .into_iter()
            .map(|related| related.with_source(file, source))
            .collect();
        self
    }

    pub fn with_source_text(self, source: &SourceText) -> Self {
        self.with_source(&source.file, &source.text)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Human-readable rendering with a caret under the offending span.
    pub fn format(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}[{}]: {}", self.severity, self.code, self.message);

        if let Some(location) = &self.location {
            let gutter = location.line.to_string().len();
            let pad = " ".repeat(gutter);
            let _ = writeln!(out, "{pad}--> {location}");
            if let Some(source_line) = &self.source_line {
                let offset = " ".repeat(location.column.saturating_sub(1));
                let carets = "^".repeat(location.caret_width(source_line));
                let _ = writeln!(out, "{pad} |");
                let _ = writeln!(out, "{} | {source_line}", location.line);
                let _ = writeln!(out, "{pad} | {offset}{carets}");
            }
        }

        for related in &self.related {
            match &related.location {
                Some(location) => {
                    let _ = writeln!(out, "note: {} at {location}", related.message);
                }
                None => {
                    let _ = writeln!(out, "note: {}", related.message);
                }
            }
        }

        if let Some(suggestion) = &self.suggestion {
            let _ = writeln!(out, "help: {suggestion}");
        }
        out
    }

    pub fn to_record(&self) -> DiagnosticRecord {
        DiagnosticRecord {
            code: self.code,
            severity: self.severity,
            message: self.message.clone(),
            location: self.location.clone(),
            source_line: self.source_line.clone(),
            suggestion: self.suggestion.clone(),
            related: self.related.iter().map(Diagnostic::to_record).collect(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_record()).unwrap_or_else(|_| {
            format!(r#"{{"code":"{}","message":"{}"}}"#, self.code, self.message)
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Structured form of a [`Diagnostic`] for editors and other tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub source_line: Option<String>,
    pub suggestion: Option<String>,
    pub related: Vec<DiagnosticRecord>,
}

/// Unified error type for the Lumen toolchain.
#[derive(Debug, Error)]
pub enum LumenError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LumenError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            LumenError::Diagnostic(diag) => Some(diag),
            LumenError::Io(_) => None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.diagnostic().map(|diag| diag.code)
    }
}

pub type Result<T> = std::result::Result<T, LumenError>;
