//! Error types for filter compilation.
//!
//! Every failure a query can cause is reported as a [`SyntaxError`]. The
//! [`SyntaxErrorKind`] discriminant lets callers tell causes apart without
//! string matching; the span (when known) points into the query text.

use std::fmt;
use std::ops::Range;

use thiserror::Error;

/// Byte range into the query text.
pub type Span = Range<usize>;

/// Result type for query parsing and compilation.
pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// What went wrong while parsing or compiling a filter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    /// Unknown character, unterminated string, malformed number.
    Lexical,
    /// Token sequence does not match the grammar (includes unbalanced parens).
    Grammar,
    /// Root identifier missing from the table mapping.
    UnresolvedSymbol,
    /// Root resolved but the attribute is not known for that entity.
    UnknownAttribute,
    /// Subscript is not `["name"]` or `["name", {...}]`.
    InvalidSubscript,
    /// Context access is not exactly one level past `context`.
    ContextDepth,
    /// Valid grammar, but no SQL lowering exists for it.
    Unsupported,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyntaxErrorKind::Lexical => "lexical error",
            SyntaxErrorKind::Grammar => "grammar error",
            SyntaxErrorKind::UnresolvedSymbol => "unresolved symbol",
            SyntaxErrorKind::UnknownAttribute => "unknown attribute",
            SyntaxErrorKind::InvalidSubscript => "invalid subscript",
            SyntaxErrorKind::ContextDepth => "invalid context path",
            SyntaxErrorKind::Unsupported => "unsupported construct",
        };
        f.write_str(s)
    }
}

/// The single error type surfaced by [`crate::QueryParser::parse`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("syntax error ({kind}): {message}")]
pub struct SyntaxError {
    kind: SyntaxErrorKind,
    message: String,
    span: Option<Span>,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn at(kind: SyntaxErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self::at(SyntaxErrorKind::Lexical, message, span)
    }

    pub fn grammar(message: impl Into<String>, span: Span) -> Self {
        Self::at(SyntaxErrorKind::Grammar, message, span)
    }

    pub fn unresolved(symbol: &str) -> Self {
        Self::new(
            SyntaxErrorKind::UnresolvedSymbol,
            format!("unknown identifier '{}'", symbol),
        )
    }

    pub fn unknown_attribute(entity: &str, attribute: &str) -> Self {
        Self::new(
            SyntaxErrorKind::UnknownAttribute,
            format!("'{}' has no attribute '{}'", entity, attribute),
        )
    }

    pub fn invalid_subscript(message: impl Into<String>, span: Span) -> Self {
        Self::at(SyntaxErrorKind::InvalidSubscript, message, span)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(SyntaxErrorKind::Unsupported, message)
    }

    pub fn kind(&self) -> SyntaxErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    /// Attach a span if the error does not carry one yet.
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }
}
