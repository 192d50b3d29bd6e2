use std::error::Error;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};

use crate::lexer::Span;

/// A user-facing error produced by any stage of the compiler, carrying the
/// source span it refers to. Semantic errors about duplicate definitions also
/// carry the span of the earlier definition as a secondary label.
#[derive(Debug, Clone)]
pub struct LangError {
    pub span: Span,
    pub message: String,
    pub note: Option<String>,
    pub code: Option<String>,
    pub related: Option<(Span, String)>,
    pub source: NamedSource<String>,
    pub severity: miette::Severity,
}

/// A specialized `Result` type for language processing operations.
/// We box the `LangError` to reduce its size.
pub type LangResult<T = ()> = Result<T, Box<LangError>>;

impl LangError {
    pub fn error<T: Into<String>>(file_name: &str, src: &str, span: Span, message: impl Into<String>, note: Option<T>, code: Option<&str>) -> Self {
        Self {
            span,
            message: message.into(),
            note: note.map(Into::into),
            code: code.map(Into::into),
            related: None,
            source: NamedSource::new(file_name, src.to_string()),
            severity: miette::Severity::Error,
        }
    }

    /// Attaches a secondary label, e.g. pointing at a previous definition.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related = Some((span, label.into()));
        self
    }
}

impl std::fmt::Display for LangError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for LangError {}

impl Diagnostic for LangError {
    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source)
    }

    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.code.as_deref().map(|c| Box::new(c) as Box<dyn std::fmt::Display>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.note.as_deref().map(|n| Box::new(n) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let primary = LabeledSpan::at(self.span.chars.0..self.span.chars.1.max(self.span.chars.0 + 1), self.message.clone());
        let mut labels = vec![primary];
        if let Some((span, label)) = &self.related {
            labels.push(LabeledSpan::at(span.chars.0..span.chars.1.max(span.chars.0 + 1), label.clone()));
        }
        Some(Box::new(labels.into_iter()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(self.severity)
    }
}
