//! Markup tree types for structural template documents

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A single attribute on an open tag. Valueless attributes (`<input disabled>`)
/// carry `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
    /// Span of the attribute name
    pub span: Span,
}

/// Raw-text element kinds whose content is not parsed as markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Style,
    Script,
}

impl RawKind {
    pub fn from_tag_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("style") {
            Some(RawKind::Style)
        } else if name.eq_ignore_ascii_case("script") {
            Some(RawKind::Script)
        } else {
            None
        }
    }
}

/// Body of a raw-text element, consumed by the lexer up to its close tag
#[derive(Debug, Clone, PartialEq)]
pub struct RawBody {
    pub text: String,
    pub span: Span,
}

/// An open tag as produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
    /// Present for `<style>` and `<script>`; the close tag has already been consumed.
    pub raw: Option<RawBody>,
}

/// HTML void elements never take a close tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

impl Tag {
    /// Whether this tag forms a complete node on its own
    pub fn is_leaf(&self) -> bool {
        self.self_closing
            || self.raw.is_some()
            || VOID_ELEMENTS
                .iter()
                .any(|v| v.eq_ignore_ascii_case(&self.name))
    }
}

/// A parsed element with its children
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Spanned<Node>>,
    /// Span of the open tag, used for line hints
    pub open_span: Span,
}

impl Element {
    /// Look up an attribute by name, ASCII case-insensitively
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Value of an attribute; valueless attributes read as the empty string
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }
}

/// A raw-text block kept in the tree
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub kind: RawKind,
    pub attributes: Vec<Attribute>,
    pub body: RawBody,
}

/// A node of the markup tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Raw(RawBlock),
}

/// Root of a parsed structural document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<Spanned<Node>>,
}

impl Document {
    /// Remove every `<style>` block from the tree, returning their bodies in
    /// document order. The remaining tree holds only markup structure.
    pub fn take_styles(&mut self) -> Vec<RawBody> {
        let mut styles = Vec::new();
        take_styles_from(&mut self.nodes, &mut styles);
        styles
    }

    /// Depth-first, document-order visit of every element
    pub fn walk_elements<'a>(&'a self, visit: &mut impl FnMut(&'a Element)) {
        walk_nodes(&self.nodes, visit);
    }
}

fn take_styles_from(nodes: &mut Vec<Spanned<Node>>, styles: &mut Vec<RawBody>) {
    let mut kept = Vec::with_capacity(nodes.len());
    for mut node in nodes.drain(..) {
        match &mut node.node {
            Node::Raw(block) if block.kind == RawKind::Style => {
                styles.push(block.body.clone());
                continue;
            }
            Node::Element(element) => take_styles_from(&mut element.children, styles),
            _ => {}
        }
        kept.push(node);
    }
    *nodes = kept;
}

fn walk_nodes<'a>(nodes: &'a [Spanned<Node>], visit: &mut impl FnMut(&'a Element)) {
    for node in nodes {
        if let Node::Element(element) = &node.node {
            visit(element);
            walk_nodes(&element.children, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag {
            name: name.to_string(),
            attributes: vec![],
            self_closing: false,
            raw: None,
        }
    }

    #[test]
    fn test_void_elements_are_leaves() {
        assert!(tag("br").is_leaf());
        assert!(tag("IMG").is_leaf());
        assert!(!tag("div").is_leaf());
    }

    #[test]
    fn test_take_styles_removes_nested_blocks() {
        let style = |text: &str| {
            Spanned::new(
                Node::Raw(RawBlock {
                    kind: RawKind::Style,
                    attributes: vec![],
                    body: RawBody {
                        text: text.to_string(),
                        span: 0..text.len(),
                    },
                }),
                0..1,
            )
        };
        let mut doc = Document {
            nodes: vec![
                style("a {}"),
                Spanned::new(
                    Node::Element(Element {
                        name: "div".to_string(),
                        attributes: vec![],
                        children: vec![style("b {}"), Spanned::new(Node::Text("x".into()), 0..1)],
                        open_span: 0..5,
                    }),
                    0..10,
                ),
            ],
        };

        let styles = doc.take_styles();
        let texts: Vec<_> = styles.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a {}", "b {}"]);
        assert_eq!(doc.nodes.len(), 1);
        match &doc.nodes[0].node {
            Node::Element(e) => assert_eq!(e.children.len(), 1),
            other => panic!("Expected element, got {:?}", other),
        }
    }
}
