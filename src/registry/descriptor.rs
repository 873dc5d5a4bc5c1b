//! Descriptor types held by the type registry

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::css::{self, CssValidationError, ScopedCss};
use crate::error::Diagnostic;
use crate::template::ParseOptions;
use crate::theme::ThemeDescriptor;

/// Errors in a slot manifest supplied directly by code
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("duplicate slot name '{name}' in manifest")]
    DuplicateSlot { name: String },

    #[error("invalid slot name '{name}': only letters, digits, '_' and '-' are allowed")]
    InvalidName { name: String },
}

/// Human-readable form of a slot name: `main_content` becomes `Main Content`
pub fn humanize(name: &str) -> String {
    name.split(|c| c == '_' || c == '-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// A named placement region within a layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    /// `None` means unbounded
    pub max_widgets: Option<usize>,
    pub css_classes: Vec<String>,
    pub selector: String,
}

impl SlotDescriptor {
    /// Create a slot with a title derived from its name and the default marker
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: humanize(&name),
            selector: slot_selector("slot", &name),
            name,
            description: None,
            max_widgets: None,
            css_classes: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_max_widgets(mut self, max: usize) -> Self {
        self.max_widgets = Some(max);
        self
    }

    pub fn with_css_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.css_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Derive the selector from a marker attribute other than `slot`
    pub fn with_marker(mut self, marker: &str) -> Self {
        self.selector = slot_selector(marker, &self.name);
        self
    }
}

pub(crate) fn slot_selector(marker: &str, name: &str) -> String {
    format!("[{}='{}']", marker, name)
}

/// Ordered list of slots, names unique. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotManifest {
    slots: Vec<SlotDescriptor>,
}

impl SlotManifest {
    /// Build a manifest, rejecting invalid or repeated names
    pub fn new(slots: Vec<SlotDescriptor>) -> Result<Self, ManifestError> {
        for (i, slot) in slots.iter().enumerate() {
            if !css::is_identifier(&slot.name) {
                return Err(ManifestError::InvalidName {
                    name: slot.name.clone(),
                });
            }
            if slots[..i].iter().any(|earlier| earlier.name == slot.name) {
                return Err(ManifestError::DuplicateSlot {
                    name: slot.name.clone(),
                });
            }
        }
        Ok(Self { slots })
    }

    /// Wrap slots the template parser has already checked
    pub(crate) fn from_checked(slots: Vec<SlotDescriptor>) -> Self {
        Self { slots }
    }

    pub fn get(&self, name: &str) -> Option<&SlotDescriptor> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotDescriptor> {
        self.slots.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Render as `{"slots": [...]}`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Where a layout's manifest comes from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutSource {
    /// Parsed from a structural template; kept so the layout can be reloaded
    Template { source: String, options: ParseOptions },
    /// Manifest supplied directly by code
    Code,
}

/// A named layout and its slot manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutDescriptor {
    pub name: String,
    pub source: LayoutSource,
    pub slot_manifest: SlotManifest,
    pub style_text: Option<String>,
    /// Non-fatal issues found while parsing the template
    pub parsing_diagnostics: Vec<Diagnostic>,
}

impl LayoutDescriptor {
    /// Create a code-defined layout
    pub fn code(
        name: impl Into<String>,
        slots: Vec<SlotDescriptor>,
        style_text: Option<String>,
    ) -> Result<Self, ManifestError> {
        Ok(Self {
            name: name.into(),
            source: LayoutSource::Code,
            slot_manifest: SlotManifest::new(slots)?,
            style_text,
            parsing_diagnostics: Vec::new(),
        })
    }

    pub fn is_template(&self) -> bool {
        matches!(self.source, LayoutSource::Template { .. })
    }

    pub fn template_source(&self) -> Option<&str> {
        match &self.source {
            LayoutSource::Template { source, .. } => Some(source),
            LayoutSource::Code => None,
        }
    }

    /// Style text scoped to this layout's name, if it has any
    pub fn scoped_style(&self) -> Result<Option<ScopedCss>, CssValidationError> {
        match &self.style_text {
            Some(text) => css::scope(text, &self.name).map(Some),
            None => Ok(None),
        }
    }
}

/// How a widget type's configuration payload is checked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "schema", rename_all = "lowercase")]
pub enum WidgetConfig {
    /// Validated against an opaque schema by a collaborator
    Schema(serde_json::Value),
    Freeform,
}

/// A registered kind of content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetTypeDescriptor {
    pub name: String,
    pub configuration: WidgetConfig,
    /// Identifier of the renderer that draws this widget type
    pub rendering_target: String,
    /// Whether instances authored on an ancestor reach descendant pages
    pub inheritable: bool,
}

impl WidgetTypeDescriptor {
    pub fn new(name: impl Into<String>, rendering_target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: WidgetConfig::Freeform,
            rendering_target: rendering_target.into(),
            inheritable: true,
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.configuration = WidgetConfig::Schema(schema);
        self
    }

    pub fn with_inheritable(mut self, inheritable: bool) -> Self {
        self.inheritable = inheritable;
        self
    }
}

/// Anything the registry can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Layout(LayoutDescriptor),
    Widget(WidgetTypeDescriptor),
    Theme(ThemeDescriptor),
}

impl Descriptor {
    pub fn name(&self) -> &str {
        match self {
            Descriptor::Layout(d) => &d.name,
            Descriptor::Widget(d) => &d.name,
            Descriptor::Theme(d) => &d.name,
        }
    }

    /// Table name used in log messages
    pub fn kind(&self) -> &'static str {
        match self {
            Descriptor::Layout(_) => "layout",
            Descriptor::Widget(_) => "widget type",
            Descriptor::Theme(_) => "theme",
        }
    }
}

impl From<LayoutDescriptor> for Descriptor {
    fn from(d: LayoutDescriptor) -> Self {
        Descriptor::Layout(d)
    }
}

impl From<WidgetTypeDescriptor> for Descriptor {
    fn from(d: WidgetTypeDescriptor) -> Self {
        Descriptor::Widget(d)
    }
}

impl From<ThemeDescriptor> for Descriptor {
    fn from(d: ThemeDescriptor) -> Self {
        Descriptor::Theme(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("main"), "Main");
        assert_eq!(humanize("page_header"), "Page Header");
        assert_eq!(humanize("left-side_bar"), "Left Side Bar");
        assert_eq!(humanize("a__b"), "A B");
        assert_eq!(humanize("MAIN_CONTENT"), "Main Content");
    }

    #[test]
    fn test_slot_defaults() {
        let slot = SlotDescriptor::new("side_bar");
        assert_eq!(slot.title, "Side Bar");
        assert_eq!(slot.selector, "[slot='side_bar']");
        assert_eq!(slot.max_widgets, None);
    }

    #[test]
    fn test_manifest_rejects_duplicates() {
        let result = SlotManifest::new(vec![SlotDescriptor::new("a"), SlotDescriptor::new("a")]);
        assert_eq!(
            result,
            Err(ManifestError::DuplicateSlot {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_manifest_rejects_bad_names() {
        let result = SlotManifest::new(vec![SlotDescriptor::new("a b")]);
        assert!(matches!(result, Err(ManifestError::InvalidName { .. })));
    }

    #[test]
    fn test_manifest_json_shape() {
        let manifest = SlotManifest::new(vec![SlotDescriptor::new("header")
            .with_max_widgets(2)
            .with_css_classes(["header-section"])])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(value["slots"][0]["name"], "header");
        assert_eq!(value["slots"][0]["max_widgets"], 2);
        assert_eq!(value["slots"][0]["selector"], "[slot='header']");
    }

    #[test]
    fn test_code_layout_scoped_style() {
        let layout = LayoutDescriptor::code(
            "home",
            vec![SlotDescriptor::new("main")],
            Some(".a { color: red }".to_string()),
        )
        .unwrap();
        let scoped = layout.scoped_style().unwrap().unwrap();
        assert_eq!(scoped.css, "[data-scope=\"home\"] .a { color: red }");
        assert!(!layout.is_template());
    }
}
