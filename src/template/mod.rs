//! Template parser for layout documents
//!
//! A layout template is a markup document whose slot regions are elements
//! carrying a marker attribute. Parsing extracts the embedded style text,
//! builds the ordered slot manifest and collects non-fatal diagnostics.
//!
//! # Example
//!
//! ```text
//! <style>.sidebar { width: 20rem }</style>
//! <main>
//!   <header slot="header" title="Page Header" max-widgets="2"></header>
//!   <aside slot="sidebar" css-classes="sidebar narrow"></aside>
//! </main>
//! ```

mod options;

pub use options::ParseOptions;

use std::collections::HashSet;

use tracing::debug;

use crate::css::{self, StyleIssue};
use crate::error::{Diagnostic, DiagnosticCategory, MarkupError, Span, TemplateParsingError};
use crate::parser::{self, Element, RawBody};
use crate::registry::{humanize, slot_selector, LayoutDescriptor, LayoutSource, SlotDescriptor, SlotManifest};

/// A structural document to be parsed into a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    /// Layout name, also used in error messages
    pub identifier: String,
    pub source: String,
}

impl TemplateDocument {
    pub fn new(identifier: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source: source.into(),
        }
    }
}

/// Parse a template document into a layout descriptor.
///
/// Unparseable markup, disallowed duplicate slot names and violated slot
/// count constraints are fatal. Everything else is recorded as a diagnostic
/// on the returned descriptor.
pub fn parse_template(
    doc: &TemplateDocument,
    options: &ParseOptions,
) -> Result<LayoutDescriptor, TemplateParsingError> {
    options.check()?;

    let mut tree = parser::parse(&doc.source).map_err(|errors| first_markup_error(doc, errors))?;

    let style = ExtractedStyle::join(tree.take_styles());

    let mut diagnostics = Vec::new();
    let slots = collect_slots(doc, &tree, options, &mut diagnostics)?;

    if options.validate_style {
        if let Some(text) = &style.text {
            for issue in css::validate(text) {
                diagnostics.push(style.diagnostic(&issue));
            }
        }
    }

    check_slot_count(doc, slots.len(), options)?;

    debug!(
        layout = %doc.identifier,
        slots = slots.len(),
        diagnostics = diagnostics.len(),
        "parsed template"
    );

    Ok(LayoutDescriptor {
        name: doc.identifier.clone(),
        source: LayoutSource::Template {
            source: doc.source.clone(),
            options: options.clone(),
        },
        slot_manifest: SlotManifest::from_checked(slots),
        style_text: style.text,
        parsing_diagnostics: diagnostics,
    })
}

fn first_markup_error(doc: &TemplateDocument, errors: Vec<MarkupError>) -> TemplateParsingError {
    let err = errors.into_iter().next().unwrap_or_else(|| MarkupError::Syntax {
        span: 0..0,
        message: "document could not be parsed".to_string(),
        expected: vec![],
    });
    TemplateParsingError::malformed(&doc.identifier, &doc.source, err)
}

/// Visit slot-marked elements in document order and build their descriptors
fn collect_slots(
    doc: &TemplateDocument,
    tree: &parser::Document,
    options: &ParseOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<SlotDescriptor>, TemplateParsingError> {
    let mut marked: Vec<&Element> = Vec::new();
    tree.walk_elements(&mut |element| {
        if element.attribute(&options.marker_attribute).is_some() {
            marked.push(element);
        }
    });

    let mut slots: Vec<SlotDescriptor> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for element in marked {
        let Some(slot) = slot_from_element(element, options, diagnostics) else {
            continue;
        };

        if !seen.insert(slot.name.clone()) {
            if options.duplicates_fatal() {
                return Err(TemplateParsingError::duplicate(
                    &doc.identifier,
                    &slot.name,
                    &doc.source,
                    Some(element.open_span.clone()),
                ));
            }
            diagnostics.push(Diagnostic::warning(
                DiagnosticCategory::DuplicateSlot,
                format!("slot '{}' declared again; keeping the first declaration", slot.name),
                Some(element.open_span.clone()),
            ));
            continue;
        }

        slots.push(slot);
    }

    Ok(slots)
}

fn slot_from_element(
    element: &Element,
    options: &ParseOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<SlotDescriptor> {
    let span = Some(element.open_span.clone());
    let name = element.attribute_value(&options.marker_attribute).unwrap_or("");

    if !css::is_identifier(name) {
        let message = if name.is_empty() {
            format!("<{}> is marked as a slot but has no name", element.name)
        } else {
            format!(
                "invalid slot name '{}': only letters, digits, '_' and '-' are allowed",
                name
            )
        };
        diagnostics.push(Diagnostic::warning(DiagnosticCategory::SlotName, message, span));
        return None;
    }

    let title = non_empty(element.attribute_value("title"))
        .map(str::to_string)
        .unwrap_or_else(|| humanize(name));

    let max_widgets = match non_empty(element.attribute_value("max-widgets")) {
        None => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n < 0 => {
                diagnostics.push(Diagnostic::warning(
                    DiagnosticCategory::MaxWidgets,
                    format!("slot '{}': negative max-widgets {} treated as unbounded", name, n),
                    span.clone(),
                ));
                None
            }
            Ok(n) => usize::try_from(n).ok(),
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCategory::MaxWidgets,
                    format!("slot '{}': max-widgets '{}' is not an integer", name, raw),
                    span.clone(),
                ));
                None
            }
        },
    };

    Some(SlotDescriptor {
        name: name.to_string(),
        title,
        description: non_empty(element.attribute_value("description")).map(str::to_string),
        max_widgets,
        css_classes: element
            .attribute_value("css-classes")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        selector: slot_selector(&options.marker_attribute, name),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_slot_count(
    doc: &TemplateDocument,
    found: usize,
    options: &ParseOptions,
) -> Result<(), TemplateParsingError> {
    if options.require_slots && found == 0 {
        return Err(TemplateParsingError::NoSlots {
            document: doc.identifier.clone(),
        });
    }
    if let Some(min) = options.min_slots {
        if found < min {
            return Err(TemplateParsingError::TooFewSlots {
                document: doc.identifier.clone(),
                found,
                min,
            });
        }
    }
    if let Some(max) = options.max_slots {
        if found > max {
            return Err(TemplateParsingError::TooManySlots {
                document: doc.identifier.clone(),
                found,
                max,
            });
        }
    }
    Ok(())
}

/// Style blocks joined with newlines, remembering where each came from
struct ExtractedStyle {
    text: Option<String>,
    /// (offset in joined text, span in the document)
    segments: Vec<(usize, Span)>,
}

impl ExtractedStyle {
    fn join(blocks: Vec<RawBody>) -> Self {
        if blocks.is_empty() {
            return Self {
                text: None,
                segments: Vec::new(),
            };
        }
        let mut text = String::new();
        let mut segments = Vec::with_capacity(blocks.len());
        for (i, block) in blocks.into_iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            segments.push((text.len(), block.span));
            text.push_str(&block.text);
        }
        Self {
            text: Some(text),
            segments,
        }
    }

    /// Document offset of a byte offset in the joined text
    fn document_offset(&self, offset: usize) -> usize {
        let idx = self
            .segments
            .partition_point(|(start, _)| *start <= offset)
            .saturating_sub(1);
        match self.segments.get(idx) {
            Some((start, span)) => span.start + (offset - start).min(span.len()),
            None => offset,
        }
    }

    fn diagnostic(&self, issue: &StyleIssue) -> Diagnostic {
        let start = self.document_offset(issue.span.start);
        let end = self.document_offset(issue.span.end.saturating_sub(1)) + 1;
        let span = Some(start..end.max(start));
        let message = format!("style: {}", issue.kind);
        if issue.kind.is_structural() {
            Diagnostic::error(DiagnosticCategory::Style, message, span)
        } else {
            Diagnostic::warning(DiagnosticCategory::Style, message, span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;

    fn parse(source: &str) -> Result<LayoutDescriptor, TemplateParsingError> {
        parse_template(&TemplateDocument::new("test", source), &ParseOptions::default())
    }

    fn categories(layout: &LayoutDescriptor) -> Vec<DiagnosticCategory> {
        layout.parsing_diagnostics.iter().map(|d| d.category).collect()
    }

    #[test]
    fn test_simple_slot() {
        let layout = parse(r#"<div slot="main"></div>"#).expect("Should parse");
        let slot = layout.slot_manifest.get("main").expect("slot main");
        assert_eq!(slot.title, "Main");
        assert_eq!(slot.max_widgets, None);
        assert_eq!(slot.selector, "[slot='main']");
        assert!(layout.parsing_diagnostics.is_empty());
        assert!(layout.style_text.is_none());
    }

    #[test]
    fn test_metadata_attributes() {
        let layout = parse(
            r#"<header slot="header" title="Page Header" description="Top" max-widgets="2" css-classes=" header-section  wide "></header>"#,
        )
        .expect("Should parse");
        let slot = layout.slot_manifest.get("header").unwrap();
        assert_eq!(slot.title, "Page Header");
        assert_eq!(slot.description.as_deref(), Some("Top"));
        assert_eq!(slot.max_widgets, Some(2));
        assert_eq!(slot.css_classes, vec!["header-section", "wide"]);
    }

    #[test]
    fn test_slots_in_document_order_including_nested() {
        let layout = parse(
            r#"<main slot="outer"><div><section slot="inner"></section></div></main><footer slot="foot"/>"#,
        )
        .unwrap();
        assert_eq!(layout.slot_manifest.names(), vec!["outer", "inner", "foot"]);
    }

    #[test]
    fn test_duplicate_rejected_with_line() {
        let err = parse("<div slot=\"content\"></div>\n<div slot=\"content\"></div>").unwrap_err();
        match err {
            TemplateParsingError::DuplicateSlot { name, line, document, .. } => {
                assert_eq!(name, "content");
                assert_eq!(line, Some(2));
                assert_eq!(document, "test");
            }
            other => panic!("Expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicates_allowed_keep_first() {
        let options = ParseOptions::new().with_duplicate_slots(true);
        let layout = parse_template(
            &TemplateDocument::new("t", r#"<a slot="x" title="First"></a><b slot="x" title="Second"></b>"#),
            &options,
        )
        .unwrap();
        assert_eq!(layout.slot_manifest.len(), 1);
        assert_eq!(layout.slot_manifest.get("x").unwrap().title, "First");
        assert_eq!(categories(&layout), vec![DiagnosticCategory::DuplicateSlot]);
    }

    #[test]
    fn test_invalid_and_missing_names_skipped() {
        let layout = parse(r#"<div slot="bad name"></div><div slot></div><div slot="ok"></div>"#).unwrap();
        assert_eq!(layout.slot_manifest.names(), vec!["ok"]);
        assert_eq!(
            categories(&layout),
            vec![DiagnosticCategory::SlotName, DiagnosticCategory::SlotName]
        );
    }

    #[test]
    fn test_max_widgets_edge_values() {
        let layout = parse(
            r#"<a slot="neg" max-widgets="-1"></a><b slot="nan" max-widgets="lots"></b><c slot="zero" max-widgets="0"></c>"#,
        )
        .unwrap();
        let manifest = &layout.slot_manifest;
        assert_eq!(manifest.get("neg").unwrap().max_widgets, None);
        assert_eq!(manifest.get("nan").unwrap().max_widgets, None);
        assert_eq!(manifest.get("zero").unwrap().max_widgets, Some(0));
        let severities: Vec<_> = layout.parsing_diagnostics.iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Error]);
    }

    #[test]
    fn test_style_blocks_extracted_and_joined() {
        let layout = parse("<style>.a{}</style><div slot=\"main\"><style>.b{}</style></div>").unwrap();
        assert_eq!(layout.style_text.as_deref(), Some(".a{}\n.b{}"));
        assert!(layout.parsing_diagnostics.is_empty());
    }

    #[test]
    fn test_style_issue_span_maps_to_document() {
        let source = "<div slot=\"m\"></div><style>.a { background: url(javascript:x) }</style>";
        let layout = parse(source).unwrap();
        assert_eq!(layout.parsing_diagnostics.len(), 1);
        let diag = &layout.parsing_diagnostics[0];
        assert_eq!(diag.category, DiagnosticCategory::Style);
        assert_eq!(diag.severity, Severity::Warning);
        let span = diag.span.clone().unwrap();
        assert_eq!(&source[span], "javascript:");
    }

    #[test]
    fn test_unbalanced_style_kept_with_error_diagnostic() {
        let layout = parse("<style>.a { color: red</style><div slot=\"m\"></div>").unwrap();
        assert_eq!(layout.style_text.as_deref(), Some(".a { color: red"));
        assert_eq!(layout.parsing_diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_style_validation_can_be_disabled() {
        let options = ParseOptions::new().with_style_validation(false);
        let layout = parse_template(
            &TemplateDocument::new("t", "<style>.a { x: expression(1) }</style>"),
            &options,
        )
        .unwrap();
        assert!(layout.parsing_diagnostics.is_empty());
    }

    #[test]
    fn test_slot_count_constraints() {
        let doc = TemplateDocument::new("t", r#"<a slot="one"></a><b slot="two"></b>"#);
        assert!(matches!(
            parse_template(&doc, &ParseOptions::new().with_min_slots(3)),
            Err(TemplateParsingError::TooFewSlots { found: 2, min: 3, .. })
        ));
        assert!(matches!(
            parse_template(&doc, &ParseOptions::new().with_max_slots(1)),
            Err(TemplateParsingError::TooManySlots { found: 2, max: 1, .. })
        ));
        let empty = TemplateDocument::new("t", "<main></main>");
        assert!(matches!(
            parse_template(&empty, &ParseOptions::new().with_required_slots(true)),
            Err(TemplateParsingError::NoSlots { .. })
        ));
        assert!(parse_template(&empty, &ParseOptions::default()).is_ok());
    }

    #[test]
    fn test_custom_marker_attribute() {
        let options = ParseOptions::new().with_marker_attribute("data-region");
        let layout = parse_template(
            &TemplateDocument::new("t", r#"<div data-region="hero" slot="ignored"></div>"#),
            &options,
        )
        .unwrap();
        assert_eq!(layout.slot_manifest.names(), vec!["hero"]);
        assert_eq!(layout.slot_manifest.get("hero").unwrap().selector, "[data-region='hero']");
    }

    #[test]
    fn test_malformed_markup_is_fatal() {
        let err = parse("<main>\n<div slot=\"a\">\n</main>").unwrap_err();
        assert!(matches!(err, TemplateParsingError::Malformed { .. }));
    }

    #[test]
    fn test_reparse_is_identical() {
        let source = r#"<style>.x{}</style><div slot="a" max-widgets="3"></div><div slot="b"></div>"#;
        assert_eq!(parse(source).unwrap(), parse(source).unwrap());
    }
}
