//! Lexer for structural template documents using logos
//!
//! Text content and tag internals are lexed separately: the top-level lexer
//! recognizes tag boundaries and text runs, and an open tag's attributes are
//! consumed by a nested [`AttrToken`] lexer from inside the tag callback.
//! `<style>` and `<script>` bodies are swallowed whole as raw text.

use logos::{Lexer, Logos};

use super::ast::{Attribute, RawBody, RawKind, Span, Tag};

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    /// `<!-- ... -->`, dropped before parsing
    #[token("<!--", comment)]
    Comment,

    /// `<!DOCTYPE html>` and other declarations, dropped before parsing
    #[regex(r"<![A-Za-z][^>]*>")]
    Declaration,

    #[regex(r"<[A-Za-z][A-Za-z0-9_:.\-]*", open_tag)]
    Open(Tag),

    #[regex(r"</[A-Za-z][A-Za-z0-9_:.\-]*[ \t\r\n]*>", close_tag)]
    Close(String),

    #[regex(r"[^<]+", |lex| lex.slice().to_string())]
    Text(String),
}

/// Tokens inside an open tag, after its name
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
enum AttrToken {
    #[regex(r"[A-Za-z_:@][A-Za-z0-9_:.@\-]*", |lex| lex.slice().to_string(), priority = 3)]
    Name(String),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| unquote(lex.slice()))]
    #[regex(r"'[^']*'", |lex| unquote(lex.slice()))]
    Quoted(String),

    #[regex(r#"[^ \t\r\n"'=<>`/]+"#, |lex| lex.slice().to_string(), priority = 1)]
    Unquoted(String),

    #[token(">")]
    End,

    #[token("/>")]
    SelfClose,
}

fn unquote(s: &str) -> String {
    s[1..s.len() - 1].to_string()
}

fn comment(lex: &mut Lexer<Token>) -> bool {
    match lex.remainder().find("-->") {
        Some(end) => {
            lex.bump(end + 3);
            true
        }
        None => false,
    }
}

fn close_tag(lex: &mut Lexer<Token>) -> String {
    lex.slice()[2..].trim_end_matches('>').trim_end().to_string()
}

fn open_tag(lex: &mut Lexer<Token>) -> Option<Tag> {
    let name = lex.slice()[1..].to_string();
    let (attributes, self_closing, consumed) = lex_attributes(lex.remainder(), lex.span().end)?;
    lex.bump(consumed);

    let raw = match RawKind::from_tag_name(&name) {
        Some(_) if !self_closing => Some(raw_body(lex, &name)?),
        _ => None,
    };

    Some(Tag {
        name,
        attributes,
        self_closing,
        raw,
    })
}

/// Lex attributes up to the end of an open tag. Returns the attributes,
/// whether the tag self-closes, and the number of bytes consumed. Running out
/// of input before `>` leaves the tag unterminated and yields `None`.
fn lex_attributes(src: &str, base: usize) -> Option<(Vec<Attribute>, bool, usize)> {
    let mut attributes = Vec::new();
    let mut inner = AttrToken::lexer(src).spanned().peekable();

    while let Some((token, span)) = inner.next() {
        match token.ok()? {
            AttrToken::End => return Some((attributes, false, span.end)),
            AttrToken::SelfClose => return Some((attributes, true, span.end)),
            AttrToken::Name(attr) => {
                let value = if matches!(inner.peek(), Some((Ok(AttrToken::Equals), _))) {
                    inner.next();
                    match inner.next()? {
                        (Ok(AttrToken::Quoted(v)), _)
                        | (Ok(AttrToken::Unquoted(v)), _)
                        | (Ok(AttrToken::Name(v)), _) => Some(v),
                        _ => return None,
                    }
                } else {
                    None
                };
                attributes.push(Attribute {
                    name: attr,
                    value,
                    span: base + span.start..base + span.end,
                });
            }
            // A value without a preceding `name=` cannot start an attribute
            AttrToken::Equals | AttrToken::Quoted(_) | AttrToken::Unquoted(_) => return None,
        }
    }
    None
}

/// Consume a raw-text body up to and including its close tag
fn raw_body(lex: &mut Lexer<Token>, name: &str) -> Option<RawBody> {
    let start = lex.span().end;
    let rest = lex.remainder();
    let body_len = find_close_tag(rest, name)?;
    let text = rest[..body_len].to_string();
    let close_len = rest[body_len..].find('>')? + 1;
    lex.bump(body_len + close_len);
    Some(RawBody {
        text,
        span: start..start + body_len,
    })
}

/// Byte offset of `</name` (ASCII case-insensitive) followed by whitespace or `>`
fn find_close_tag(haystack: &str, name: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let needle_len = name.len() + 2;
    let mut from = 0;
    while let Some(pos) = haystack[from..].find("</") {
        let at = from + pos;
        let end = at + needle_len;
        if end <= bytes.len()
            && haystack.is_char_boundary(end)
            && haystack[at + 2..end].eq_ignore_ascii_case(name)
            && matches!(bytes.get(end), Some(b'>' | b' ' | b'\t' | b'\r' | b'\n'))
        {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

/// Lex input into tokens with spans. Comments and declarations are dropped;
/// unrecognized input is reported as `Err(span)`.
pub fn lex(input: &str) -> impl Iterator<Item = Result<(Token, Span), Span>> + '_ {
    Token::lexer(input)
        .spanned()
        .filter(|(tok, _)| !matches!(tok, Ok(Token::Comment) | Ok(Token::Declaration)))
        .map(|(tok, span)| match tok {
            Ok(t) => Ok((t, span)),
            Err(()) => Err(span),
        })
}
