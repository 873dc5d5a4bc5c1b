//! Error and diagnostic types shared across the crate

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use serde::Serialize;
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A low-level markup syntax error
#[derive(Error, Debug, Clone)]
pub enum MarkupError {
    #[error("markup error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl MarkupError {
    pub fn span(&self) -> &Span {
        match self {
            MarkupError::Syntax { span, .. } => span,
        }
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::parser::lexer::Token>> for MarkupError {
    fn from(err: chumsky::error::Rich<'a, crate::parser::lexer::Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("unexpected {}", format_token(tok)),
                None => "unexpected end of input".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                _ => None,
            })
            .collect();

        MarkupError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Open(tag) => format!("open tag <{}>", tag.name),
        Token::Close(name) => format!("close tag </{}>", name),
        Token::Text(_) => "text".to_string(),
        Token::Comment => "comment".to_string(),
        Token::Declaration => "declaration".to_string(),
    }
}

/// 1-based line number of a byte offset
pub fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

fn line_hint(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {})", line),
        None => String::new(),
    }
}

/// Fatal errors raised while parsing a template document. No descriptor is
/// produced when one of these is returned.
#[derive(Debug, Error, Clone)]
pub enum TemplateParsingError {
    /// The document could not be parsed as markup at all
    #[error("{document}: malformed markup at line {line}: {message}")]
    Malformed {
        document: String,
        message: String,
        span: Span,
        line: usize,
        expected: Vec<String>,
    },

    /// Two slot elements share a name while duplicates are disallowed
    #[error("{document}: duplicate slot name '{name}'{}", line_hint(.line))]
    DuplicateSlot {
        document: String,
        name: String,
        span: Option<Span>,
        line: Option<usize>,
    },

    /// Slots were required but the document declares none
    #[error("{document}: template declares no slots")]
    NoSlots { document: String },

    #[error("{document}: template declares {found} slots, at least {min} required")]
    TooFewSlots {
        document: String,
        found: usize,
        min: usize,
    },

    #[error("{document}: template declares {found} slots, at most {max} allowed")]
    TooManySlots {
        document: String,
        found: usize,
        max: usize,
    },

    /// Contradictory parse options
    #[error("invalid parse options: {reason}")]
    InvalidOptions { reason: String },
}

impl TemplateParsingError {
    /// Create a malformed-markup error from a markup syntax error
    pub fn malformed(document: impl Into<String>, source: &str, err: MarkupError) -> Self {
        let MarkupError::Syntax {
            span,
            message,
            expected,
        } = err;
        Self::Malformed {
            document: document.into(),
            line: line_of(source, span.start),
            message,
            span,
            expected,
        }
    }

    /// Create a duplicate slot error, deriving the line hint from the span
    pub fn duplicate(document: impl Into<String>, name: impl Into<String>, source: &str, span: Option<Span>) -> Self {
        Self::DuplicateSlot {
            document: document.into(),
            name: name.into(),
            line: span.as_ref().map(|s| line_of(source, s.start)),
            span,
        }
    }

    /// Get the source span if available
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Malformed { span, .. } => Some(span),
            Self::DuplicateSlot { span, .. } => span.as_ref(),
            _ => None,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let Some(span) = self.span().cloned() else {
            return self.to_string();
        };

        let label_message = match self {
            Self::Malformed { expected, message, .. } if !expected.is_empty() => {
                format!("{}\nExpected: {}", message, expected.join(", "))
            }
            Self::Malformed { message, .. } => message.clone(),
            Self::DuplicateSlot { name, .. } => format!("slot '{}' declared again here", name),
            _ => self.to_string(),
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_message(label_message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Severity of a non-fatal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Category of a non-fatal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCategory {
    /// Slot marker with a missing or invalid name; the slot is skipped
    SlotName,
    /// Negative or non-numeric `max-widgets`; the slot stays unbounded
    MaxWidgets,
    /// Repeated slot name kept only at its first occurrence
    DuplicateSlot,
    /// Disallowed construct or structural problem in style text
    Style,
    /// Resolved slot content truncated to the slot's widget limit
    SlotCapacity,
    UnknownWidgetType,
    UnknownTheme,
    /// Widgets or override records for a slot the layout does not declare
    OrphanedSlot,
    /// Ancestor chain that does not match the page's parent links
    AncestorChain,
    /// Registration replaced an existing entry of the same name
    ReplacedEntry,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::SlotName => write!(f, "slot-name"),
            DiagnosticCategory::MaxWidgets => write!(f, "max-widgets"),
            DiagnosticCategory::DuplicateSlot => write!(f, "duplicate-slot"),
            DiagnosticCategory::Style => write!(f, "style"),
            DiagnosticCategory::SlotCapacity => write!(f, "slot-capacity"),
            DiagnosticCategory::UnknownWidgetType => write!(f, "unknown-widget-type"),
            DiagnosticCategory::UnknownTheme => write!(f, "unknown-theme"),
            DiagnosticCategory::OrphanedSlot => write!(f, "orphaned-slot"),
            DiagnosticCategory::AncestorChain => write!(f, "ancestor-chain"),
            DiagnosticCategory::ReplacedEntry => write!(f, "replaced-entry"),
        }
    }
}

/// A non-fatal issue recorded on a parsed layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub severity: Severity,
    pub message: String,
    /// Byte range in the template document, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn warning(category: DiagnosticCategory, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            category,
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    pub fn error(category: DiagnosticCategory, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            category,
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}[{}]: {}", level, self.category, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_of() {
        let src = "a\nb\nc";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, 2), 2);
        assert_eq!(line_of(src, 4), 3);
        assert_eq!(line_of(src, 100), 3);
    }

    #[test]
    fn test_duplicate_display_includes_line() {
        let src = "<a slot=x></a>\n<b slot=x></b>";
        let err = TemplateParsingError::duplicate("home", "x", src, Some(15..29));
        let msg = err.to_string();
        assert!(msg.contains("duplicate slot name 'x'"));
        assert!(msg.contains("line 2"));
    }

    #[test]
    fn test_format_without_span_falls_back_to_display() {
        let err = TemplateParsingError::NoSlots {
            document: "home".to_string(),
        };
        assert_eq!(err.format("", "home.html"), err.to_string());
    }

    #[test]
    fn test_format_with_span_renders_report() {
        let src = "<div slot=a></div>\n<div slot=a></div>";
        let err = TemplateParsingError::duplicate("home", "a", src, Some(19..31));
        let report = err.format(src, "home.html");
        assert!(report.contains("home.html"));
        assert!(report.contains("declared again"));
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::warning(DiagnosticCategory::MaxWidgets, "negative limit", None);
        assert_eq!(d.to_string(), "warning[max-widgets]: negative limit");
    }
}
