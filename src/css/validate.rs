//! Disallowed-construct scanner shared by template parsing and CSS scoping

use std::fmt;

use serde::Serialize;

use super::lexer::{tokenize, CssToken};
use crate::error::Span;

/// Kind of problem found in style text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum StyleIssueKind {
    /// `javascript:`, `vbscript:` or `data:text/html` URL
    ScriptUrl(String),
    /// IE `expression(...)`
    Expression,
    /// `-moz-binding`
    Binding,
    /// IE `behavior:` property
    Behavior,
    /// `}` without a matching `{`
    UnbalancedBrace,
    /// `{` never closed
    UnclosedBrace,
    UnterminatedString,
    UnterminatedComment,
}

impl StyleIssueKind {
    /// Structural issues make the text unparseable as CSS
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            StyleIssueKind::UnbalancedBrace
                | StyleIssueKind::UnclosedBrace
                | StyleIssueKind::UnterminatedString
                | StyleIssueKind::UnterminatedComment
        )
    }
}

impl fmt::Display for StyleIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleIssueKind::ScriptUrl(scheme) => write!(f, "script-executing URL scheme '{}'", scheme),
            StyleIssueKind::Expression => write!(f, "expression() evaluation"),
            StyleIssueKind::Binding => write!(f, "-moz-binding"),
            StyleIssueKind::Behavior => write!(f, "behavior property"),
            StyleIssueKind::UnbalancedBrace => write!(f, "unbalanced closing brace"),
            StyleIssueKind::UnclosedBrace => write!(f, "unclosed brace"),
            StyleIssueKind::UnterminatedString => write!(f, "unterminated string"),
            StyleIssueKind::UnterminatedComment => write!(f, "unterminated comment"),
        }
    }
}

/// A problem in style text, located by byte span
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleIssue {
    #[serde(flatten)]
    pub kind: StyleIssueKind,
    pub span: Span,
}

impl fmt::Display for StyleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.kind, self.span.start, self.span.end)
    }
}

const SCRIPT_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

/// Comment-free copy of the input. Every byte of `text` remembers the source
/// span it was produced from.
#[derive(Default)]
struct Stripped {
    text: String,
    origin: Vec<Span>,
}

impl Stripped {
    fn push(&mut self, source: &str, span: &Span) {
        for (offset, c) in source[span.clone()].char_indices() {
            let at = span.start + offset;
            self.push_char(c, at..at + c.len_utf8());
        }
    }

    fn push_char(&mut self, c: char, origin: Span) {
        for _ in 0..c.len_utf8() {
            self.origin.push(origin.clone());
        }
        self.text.push(c);
    }

    /// Decode CSS escapes: `\` with 1-6 hex digits and one optional trailing
    /// whitespace, or `\` before any other character except a newline.
    /// A decoded character maps to the whole escape in the source.
    fn unescape(&self) -> Stripped {
        let chars: Vec<(usize, char)> = self.text.char_indices().collect();
        let mut out = Stripped {
            text: String::with_capacity(self.text.len()),
            origin: Vec::with_capacity(self.origin.len()),
        };

        let mut i = 0;
        while i < chars.len() {
            let (at, c) = chars[i];
            if c != '\\' {
                out.push_char(c, self.origin[at].clone());
                i += 1;
                continue;
            }

            let mut j = i + 1;
            let mut hex = String::new();
            while j < chars.len() && hex.len() < 6 && chars[j].1.is_ascii_hexdigit() {
                hex.push(chars[j].1);
                j += 1;
            }

            if !hex.is_empty() {
                match chars.get(j).map(|&(_, c)| c) {
                    Some('\r') if chars.get(j + 1).is_some_and(|&(_, c)| c == '\n') => j += 2,
                    Some(' ' | '\t' | '\n' | '\r' | '\x0c') => j += 1,
                    _ => {}
                }
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|&code| code != 0)
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                let end = self.origin[chars[j - 1].0].end;
                out.push_char(decoded, self.origin[at].start..end);
                i = j;
            } else if let Some(&(next_at, next)) = chars
                .get(j)
                .filter(|&&(_, c)| !matches!(c, '\n' | '\r' | '\x0c'))
            {
                out.push_char(next, self.origin[at].start..self.origin[next_at].end);
                i = j + 1;
            } else {
                // Escaped newline or trailing backslash stays literal
                out.push_char(c, self.origin[at].clone());
                i += 1;
            }
        }
        out
    }

    fn source_span(&self, start: usize, len: usize) -> Span {
        self.origin[start].start..self.origin[start + len - 1].end
    }
}

/// Scan style text for disallowed constructs and structural problems.
/// Comments are stripped and escapes decoded before constructs are matched,
/// so a scheme split by a comment or spelled with escapes is still caught.
/// Issues are ordered by position.
pub fn validate(css: &str) -> Vec<StyleIssue> {
    let mut issues = Vec::new();
    let mut stripped = Stripped::default();
    let mut open_braces: Vec<usize> = Vec::new();

    for (tok, span) in tokenize(css) {
        match tok {
            CssToken::Comment => {}
            CssToken::UnterminatedComment => {
                // Everything after an unterminated comment opener is comment text
                issues.push(StyleIssue {
                    kind: StyleIssueKind::UnterminatedComment,
                    span: span.start..css.len(),
                });
                break;
            }
            CssToken::UnterminatedString => {
                issues.push(StyleIssue {
                    kind: StyleIssueKind::UnterminatedString,
                    span: span.clone(),
                });
                stripped.push(css, &span);
            }
            CssToken::BraceOpen => {
                open_braces.push(span.start);
                stripped.push(css, &span);
            }
            CssToken::BraceClose => {
                if open_braces.pop().is_none() {
                    issues.push(StyleIssue {
                        kind: StyleIssueKind::UnbalancedBrace,
                        span: span.clone(),
                    });
                }
                stripped.push(css, &span);
            }
            CssToken::String | CssToken::Semicolon | CssToken::AtKeyword | CssToken::Other => {
                stripped.push(css, &span);
            }
        }
    }

    for start in open_braces {
        issues.push(StyleIssue {
            kind: StyleIssueKind::UnclosedBrace,
            span: start..start + 1,
        });
    }

    let stripped = stripped.unescape();
    // ASCII lowercasing keeps byte offsets stable
    let lower = stripped.text.to_ascii_lowercase();

    for scheme in SCRIPT_SCHEMES {
        for (at, _) in lower.match_indices(scheme) {
            issues.push(StyleIssue {
                kind: StyleIssueKind::ScriptUrl(scheme.trim_end_matches(':').to_string()),
                span: stripped.source_span(at, scheme.len()),
            });
        }
    }

    for at in find_followed_by(&lower, "expression", '(') {
        issues.push(StyleIssue {
            kind: StyleIssueKind::Expression,
            span: stripped.source_span(at, "expression".len()),
        });
    }

    for (at, _) in lower.match_indices("-moz-binding") {
        issues.push(StyleIssue {
            kind: StyleIssueKind::Binding,
            span: stripped.source_span(at, "-moz-binding".len()),
        });
    }

    for at in find_followed_by(&lower, "behavior", ':') {
        issues.push(StyleIssue {
            kind: StyleIssueKind::Behavior,
            span: stripped.source_span(at, "behavior".len()),
        });
    }

    issues.sort_by_key(|issue| issue.span.start);
    issues
}

/// Offsets of `word` followed, after optional whitespace, by `next`
fn find_followed_by(haystack: &str, word: &str, next: char) -> Vec<usize> {
    haystack
        .match_indices(word)
        .filter(|(at, _)| {
            haystack[at + word.len()..]
                .trim_start()
                .starts_with(next)
        })
        .map(|(at, _)| at)
        .collect()
}
