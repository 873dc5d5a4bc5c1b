//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::MarkupError;
use crate::parser::ast::*;
use crate::parser::lexer::{lex, Token};

/// Element nesting beyond this depth is rejected before parsing
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a structural template document into a markup tree
pub fn parse(input: &str) -> Result<Document, Vec<MarkupError>> {
    let len = input.len();

    let mut tokens = Vec::new();
    let mut depth = 0usize;
    for item in lex(input) {
        let (tok, span) = item.map_err(|span| {
            vec![MarkupError::Syntax {
                message: format!(
                    "unrecognized markup starting with {:?}",
                    snippet(input, &span)
                ),
                span,
                expected: vec![],
            }]
        })?;
        match &tok {
            Token::Open(tag) if !tag.is_leaf() => depth += 1,
            Token::Close(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth > MAX_NESTING_DEPTH {
            return Err(vec![MarkupError::Syntax {
                message: format!("elements nested deeper than {}", MAX_NESTING_DEPTH),
                span,
                expected: vec![],
            }]);
        }
        tokens.push((tok, SimpleSpan::from(span)));
    }

    // Turn the token list into a stream that chumsky can use
    let token_stream =
        Stream::from_iter(tokens).map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn snippet(input: &str, span: &Span) -> String {
    input[span.start..]
        .chars()
        .take(12)
        .collect()
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let node = recursive(|node| {
        let text = select! {
            Token::Text(t) => Node::Text(t),
        };

        // Void, self-closing and raw-text tags are complete on their own
        let leaf = select! {
            Token::Open(tag) if tag.is_leaf() => tag,
        }
        .map_with(|tag, e| leaf_node(tag, span_range(&e.span())));

        let open = select! {
            Token::Open(tag) if !tag.is_leaf() => tag,
        }
        .map_with(|tag, e| Spanned::new(tag, span_range(&e.span())));

        let close = select! {
            Token::Close(name) => name,
        };

        let element = open
            .then(node.clone().repeated().collect::<Vec<_>>())
            .then(close)
            .try_map(|((open, children), close), span| {
                if open.node.name.eq_ignore_ascii_case(&close) {
                    Ok(Node::Element(Element {
                        name: open.node.name,
                        attributes: open.node.attributes,
                        children,
                        open_span: open.span,
                    }))
                } else {
                    Err(Rich::custom(
                        span,
                        format!(
                            "close tag </{}> does not match open tag <{}>",
                            close, open.node.name
                        ),
                    ))
                }
            });

        choice((text, leaf, element))
            .map_with(|n, e| Spanned::new(n, span_range(&e.span())))
            .boxed()
    });

    // Document is a list of top-level nodes
    node.repeated()
        .collect()
        .then_ignore(end())
        .map(|nodes| Document { nodes })
}

fn leaf_node(tag: Tag, span: Span) -> Node {
    match (RawKind::from_tag_name(&tag.name), tag.raw) {
        (Some(kind), Some(body)) => Node::Raw(RawBlock {
            kind,
            attributes: tag.attributes,
            body,
        }),
        (_, _) => Node::Element(Element {
            name: tag.name,
            attributes: tag.attributes,
            children: vec![],
            open_span: span,
        }),
    }
}
