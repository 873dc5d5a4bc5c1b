//! CSS tokenizer using logos
//!
//! Only the structure the scope engine needs is recognized: comments,
//! strings, braces, semicolons and at-keywords. Everything else is passed
//! through as opaque runs.

use logos::Logos;

use crate::error::Span;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssToken {
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    Comment,

    /// `/*` with no matching `*/`
    #[token("/*")]
    UnterminatedComment,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    String,

    #[regex(r#""([^"\\\n]|\\.)*"#)]
    #[regex(r"'([^'\\\n]|\\.)*")]
    UnterminatedString,

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token(";")]
    Semicolon,

    #[regex(r"@[A-Za-z_\-][A-Za-z0-9_\-]*")]
    AtKeyword,

    #[regex(r#"[^{};"'/@]+"#)]
    #[token("/")]
    #[token("@")]
    Other,
}

/// Tokenize style text. Input the tokenizer cannot classify is passed through
/// as [`CssToken::Other`], so the token spans always tile the whole input.
pub fn tokenize(input: &str) -> Vec<(CssToken, Span)> {
    CssToken::lexer(input)
        .spanned()
        .map(|(tok, span)| (tok.unwrap_or(CssToken::Other), span))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<CssToken> {
        tokenize(input).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_rule_structure() {
        assert_eq!(
            kinds(".a { color: red; }"),
            vec![
                CssToken::Other,
                CssToken::BraceOpen,
                CssToken::Other,
                CssToken::Semicolon,
                CssToken::Other,
                CssToken::BraceClose,
            ]
        );
    }

    #[test]
    fn test_comments_and_strings() {
        assert_eq!(
            kinds(r#"/* x { */ "a}b" '{'"#),
            vec![
                CssToken::Comment,
                CssToken::Other,
                CssToken::String,
                CssToken::Other,
                CssToken::String,
            ]
        );
    }

    #[test]
    fn test_unterminated_comment_and_string() {
        assert_eq!(kinds("/* open"), vec![CssToken::UnterminatedComment, CssToken::Other]);
        assert_eq!(kinds("\"open"), vec![CssToken::UnterminatedString]);
    }

    #[test]
    fn test_at_keyword_and_lone_symbols() {
        assert_eq!(
            kinds("@media a/b @"),
            vec![
                CssToken::AtKeyword,
                CssToken::Other,
                CssToken::Other,
                CssToken::Other,
                CssToken::Other,
            ]
        );
    }

    #[test]
    fn test_spans_tile_input() {
        let input = "a{b:c}/*d*/@e;";
        let toks = tokenize(input);
        let mut pos = 0;
        for (_, span) in toks {
            assert_eq!(span.start, pos);
            pos = span.end;
        }
        assert_eq!(pos, input.len());
    }
}
