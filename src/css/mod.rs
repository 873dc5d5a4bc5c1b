//! CSS scope engine
//!
//! Style text attached to layouts, widgets and themes is validated for
//! disallowed constructs and rewritten so its selectors only match inside
//! a scope element.

pub mod lexer;
pub mod scope;
pub mod validate;

pub use scope::{scope, scope_selector, CssValidationError, ScopedCss};
pub use validate::{validate, StyleIssue, StyleIssueKind};

/// Whether `s` is a non-empty run of ASCII letters, digits, `_` and `-`.
/// Slot names and scope ids share this alphabet.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("main_content-2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("side bar"));
        assert!(!is_identifier("héader"));
    }
}
