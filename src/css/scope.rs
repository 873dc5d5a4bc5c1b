//! Selector rewriting that confines style text to a scope

use serde::Serialize;
use thiserror::Error;

use super::is_identifier;
use super::lexer::{tokenize, CssToken};
use super::validate::{validate, StyleIssue};
use crate::error::Span;

/// Style text rewritten so every rule only matches inside its scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopedCss {
    pub scope_id: String,
    /// The qualifying ancestor selector, e.g. `[data-scope="home"]`
    pub selector: String,
    pub css: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CssValidationError {
    #[error("invalid scope id '{scope_id}': only letters, digits, '_' and '-' are allowed")]
    InvalidScope { scope_id: String },

    #[error("style text rejected: {}", summarize(.issues))]
    Disallowed { issues: Vec<StyleIssue> },
}

impl CssValidationError {
    pub fn issues(&self) -> &[StyleIssue] {
        match self {
            CssValidationError::Disallowed { issues } => issues,
            CssValidationError::InvalidScope { .. } => &[],
        }
    }
}

fn summarize(issues: &[StyleIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// At-rules whose bodies are rule lists that get rewritten recursively
const GROUPING_AT_RULES: &[&str] = &["media", "supports", "container", "layer", "document"];

/// Selectors that name the document root and collapse onto the scope element
const ROOT_SELECTORS: &[&str] = &[":root", "html", "body"];

/// The attribute selector that qualifies rules for `scope_id`
pub fn scope_selector(scope_id: &str) -> String {
    format!("[data-scope=\"{}\"]", scope_id)
}

/// Rewrite `style_text` so each selector is prefixed with the scope selector
/// for `scope_id`. Text with any disallowed construct or structural problem
/// is rejected with every issue found.
pub fn scope(style_text: &str, scope_id: &str) -> Result<ScopedCss, CssValidationError> {
    if !is_identifier(scope_id) {
        return Err(CssValidationError::InvalidScope {
            scope_id: scope_id.to_string(),
        });
    }

    let issues = validate(style_text);
    if !issues.is_empty() {
        return Err(CssValidationError::Disallowed { issues });
    }

    let selector = scope_selector(scope_id);
    let css = Rewriter {
        src: style_text,
        tokens: tokenize(style_text),
        pos: 0,
        selector: &selector,
    }
    .run();

    Ok(ScopedCss {
        scope_id: scope_id.to_string(),
        selector,
        css,
    })
}

struct Rewriter<'a> {
    src: &'a str,
    tokens: Vec<(CssToken, Span)>,
    pos: usize,
    selector: &'a str,
}

impl<'a> Rewriter<'a> {
    fn run(mut self) -> String {
        let mut out = String::with_capacity(self.src.len() * 2);
        loop {
            self.rules(&mut out);
            // Only a stray `}` stops a top-level rule list early
            match self.tokens.get(self.pos) {
                Some((_, span)) => {
                    out.push_str(&self.src[span.clone()]);
                    self.pos += 1;
                }
                None => return out,
            }
        }
    }

    fn peek(&self) -> Option<CssToken> {
        self.tokens.get(self.pos).map(|(tok, _)| *tok)
    }

    /// Source text covered by tokens `start..end`
    fn slice(&self, start: usize, end: usize) -> &'a str {
        if start >= end {
            return "";
        }
        &self.src[self.tokens[start].1.start..self.tokens[end - 1].1.end]
    }

    /// Rewrite a rule list up to (not including) its closing brace
    fn rules(&mut self, out: &mut String) {
        loop {
            let start = self.pos;
            while let Some(tok) = self.peek() {
                if matches!(tok, CssToken::BraceOpen | CssToken::BraceClose | CssToken::Semicolon) {
                    break;
                }
                self.pos += 1;
            }
            let prelude = self.slice(start, self.pos);

            match self.peek() {
                Some(CssToken::Semicolon) => {
                    out.push_str(prelude);
                    out.push(';');
                    self.pos += 1;
                }
                Some(CssToken::BraceOpen) => match self.at_rule_name(start) {
                    Some(name) if GROUPING_AT_RULES.contains(&name.as_str()) => {
                        out.push_str(prelude);
                        out.push('{');
                        self.pos += 1;
                        self.rules(out);
                        if self.peek() == Some(CssToken::BraceClose) {
                            out.push('}');
                            self.pos += 1;
                        }
                    }
                    // Keyframes, font-face, page and the like pass through whole
                    Some(_) => {
                        out.push_str(prelude);
                        self.copy_block(out);
                    }
                    None => {
                        out.push_str(&scope_prelude(prelude, self.selector));
                        self.copy_block(out);
                    }
                },
                _ => {
                    out.push_str(prelude);
                    return;
                }
            }
        }
    }

    /// Lowercased at-keyword of the prelude starting at token `start`, if any
    fn at_rule_name(&self, start: usize) -> Option<String> {
        let (tok, span) = self.tokens[start..self.pos].iter().find(|(tok, span)| match tok {
            CssToken::Comment => false,
            CssToken::Other => !self.src[span.clone()].trim().is_empty(),
            _ => true,
        })?;
        match tok {
            CssToken::AtKeyword => Some(self.src[span.start + 1..span.end].to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Copy a brace-delimited block verbatim, nested blocks included
    fn copy_block(&mut self, out: &mut String) {
        let mut depth = 0usize;
        while let Some((tok, span)) = self.tokens.get(self.pos) {
            out.push_str(&self.src[span.clone()]);
            self.pos += 1;
            match tok {
                CssToken::BraceOpen => depth += 1,
                CssToken::BraceClose => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Prefix every selector in a rule prelude, keeping surrounding whitespace
/// and leading comments in place.
fn scope_prelude(prelude: &str, scope: &str) -> String {
    let lead = leading_trivia_len(prelude);
    let body = prelude[lead..].trim_end();
    let trail = &prelude[lead + body.len()..];

    let scoped: Vec<String> = split_selector_list(body)
        .into_iter()
        .map(|sel| scope_one(sel.trim(), scope))
        .collect();

    format!("{}{}{}", &prelude[..lead], scoped.join(", "), trail)
}

fn leading_trivia_len(text: &str) -> usize {
    let mut rest = text;
    loop {
        let trimmed = rest.trim_start();
        match trimmed.strip_prefix("/*").and_then(|after| after.find("*/").map(|end| &after[end + 2..])) {
            Some(after) => rest = after,
            None => return text.len() - trimmed.len(),
        }
    }
}

fn scope_one(selector: &str, scope: &str) -> String {
    let lower = selector.to_ascii_lowercase();
    for root in ROOT_SELECTORS {
        if let Some(rest) = lower.strip_prefix(root) {
            let boundary = rest
                .chars()
                .next()
                .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            if boundary {
                return format!("{}{}", scope, &selector[root.len()..]);
            }
        }
    }
    format!("{} {}", scope, selector)
}

/// Split a selector list on commas outside brackets, parentheses and strings
pub fn split_selector_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped(css: &str) -> String {
        scope(css, "home").expect("Should scope").css
    }

    #[test]
    fn test_prefixes_each_selector() {
        assert_eq!(
            scoped(".a { color: red }\n.b, .c:hover { margin: 0 }"),
            "[data-scope=\"home\"] .a { color: red }\n[data-scope=\"home\"] .b, [data-scope=\"home\"] .c:hover { margin: 0 }"
        );
    }

    #[test]
    fn test_media_block_rewritten_inside() {
        assert_eq!(
            scoped("@media (max-width: 600px) { .a { x: y } }"),
            "@media (max-width: 600px) { [data-scope=\"home\"] .a { x: y } }"
        );
    }

    #[test]
    fn test_keyframes_and_font_face_untouched() {
        let css = "@keyframes spin { from { a: b } 50% { a: c } to { a: d } }\n@font-face { font-family: X }";
        assert_eq!(scoped(css), css);
    }

    #[test]
    fn test_statement_at_rules_pass_through() {
        let css = "@charset \"utf-8\";\n@import url(base.css);\np { a: b }";
        assert_eq!(
            scoped(css),
            "@charset \"utf-8\";\n@import url(base.css);\n[data-scope=\"home\"] p { a: b }"
        );
    }

    #[test]
    fn test_root_selectors_collapse_onto_scope() {
        assert_eq!(
            scoped(":root { --x: 1 } body.dark p { a: b } html{}"),
            "[data-scope=\"home\"] { --x: 1 } [data-scope=\"home\"].dark p { a: b } [data-scope=\"home\"]{}"
        );
    }

    #[test]
    fn test_root_prefix_needs_word_boundary() {
        assert_eq!(scoped("bodyguard {}"), "[data-scope=\"home\"] bodyguard {}");
    }

    #[test]
    fn test_leading_comment_kept() {
        assert_eq!(scoped("/* hi */ .a{}"), "/* hi */ [data-scope=\"home\"] .a{}");
    }

    #[test]
    fn test_split_respects_parens_and_strings() {
        assert_eq!(
            split_selector_list(":is(a, b), [title=\"x,y\"], c"),
            vec![":is(a, b)", " [title=\"x,y\"]", " c"]
        );
    }

    #[test]
    fn test_invalid_scope_id() {
        assert!(matches!(
            scope(".a{}", "bad id"),
            Err(CssValidationError::InvalidScope { .. })
        ));
    }

    #[test]
    fn test_disallowed_constructs_reject() {
        let err = scope(".a { background: url(javascript:x) } .b {", "home").unwrap_err();
        assert_eq!(err.issues().len(), 2);
    }
}
