//! Process-wide table of layouts, widget types and themes
//!
//! Readers load an immutable snapshot; writers build a modified copy and
//! publish it with a compare-and-swap, so a reader never observes a
//! half-updated descriptor.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::{info, warn};

use super::descriptor::{Descriptor, LayoutDescriptor, LayoutSource, ManifestError, WidgetTypeDescriptor};
use crate::css::CssValidationError;
use crate::error::{Diagnostic, DiagnosticCategory, TemplateParsingError};
use crate::template::{parse_template, ParseOptions, TemplateDocument};
use crate::theme::ThemeDescriptor;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown layout: {name}")]
    UnknownLayout { name: String },

    #[error("invalid manifest for layout '{layout}': {source}")]
    InvalidManifest {
        layout: String,
        #[source]
        source: ManifestError,
    },

    #[error(transparent)]
    Template(#[from] TemplateParsingError),

    #[error("failed to serialize manifest: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    pub fn unknown_layout(name: impl Into<String>) -> Self {
        Self::UnknownLayout { name: name.into() }
    }
}

/// Whether a registration added a name or replaced an existing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Inserted,
    Replaced,
}

/// One consistent view of every table
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    generation: u64,
    layouts: HashMap<String, Arc<LayoutDescriptor>>,
    widgets: HashMap<String, Arc<WidgetTypeDescriptor>>,
    themes: HashMap<String, Arc<ThemeDescriptor>>,
}

impl RegistrySnapshot {
    /// Bumped on every write; usable as a cache stamp
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn layout(&self, name: &str) -> Option<&Arc<LayoutDescriptor>> {
        self.layouts.get(name)
    }

    pub fn widget(&self, name: &str) -> Option<&Arc<WidgetTypeDescriptor>> {
        self.widgets.get(name)
    }

    pub fn theme(&self, name: &str) -> Option<&Arc<ThemeDescriptor>> {
        self.themes.get(name)
    }

    fn insert(&mut self, descriptor: Descriptor) -> RegisterOutcome {
        let replaced = match descriptor {
            Descriptor::Layout(d) => self.layouts.insert(d.name.clone(), Arc::new(d)).is_some(),
            Descriptor::Widget(d) => self.widgets.insert(d.name.clone(), Arc::new(d)).is_some(),
            Descriptor::Theme(d) => self.themes.insert(d.name.clone(), Arc::new(d)).is_some(),
        };
        if replaced {
            RegisterOutcome::Replaced
        } else {
            RegisterOutcome::Inserted
        }
    }
}

fn sorted<T>(table: &HashMap<String, Arc<T>>) -> Vec<Arc<T>> {
    let mut names: Vec<&String> = table.keys().collect();
    names.sort();
    names.into_iter().filter_map(|n| table.get(n).cloned()).collect()
}

/// Registry of layout, widget-type and theme descriptors
#[derive(Debug, Default)]
pub struct TypeRegistry {
    snap: ArcSwap<RegistrySnapshot>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; stays valid and unchanged while held
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snap.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.snap.load().generation
    }

    /// Apply `change` to a copy of the current snapshot and publish it,
    /// retrying if another writer got there first
    fn update<T>(&self, mut change: impl FnMut(&mut RegistrySnapshot) -> T) -> T {
        loop {
            let cur = self.snap.load_full();
            let mut next = (*cur).clone();
            let out = change(&mut next);
            next.generation = cur.generation + 1;
            let prev = self.snap.compare_and_swap(&cur, Arc::new(next));
            if Arc::ptr_eq(&prev, &cur) {
                return out;
            }
        }
    }

    /// Register a descriptor. An existing entry with the same name is
    /// replaced, last registration wins.
    pub fn register(&self, descriptor: impl Into<Descriptor>) -> RegisterOutcome {
        let descriptor = descriptor.into();
        let kind = descriptor.kind();
        let name = descriptor.name().to_string();

        let outcome = self.update(|snap| snap.insert(descriptor.clone()));
        if outcome == RegisterOutcome::Replaced {
            warn!(kind, name = %name, "replaced existing registry entry");
        }
        outcome
    }

    /// Parse a template and register the resulting layout
    pub fn register_template(
        &self,
        name: &str,
        source: &str,
        options: &ParseOptions,
    ) -> Result<RegisterOutcome, TemplateParsingError> {
        let layout = parse_template(&TemplateDocument::new(name, source), options)?;
        Ok(self.register(layout))
    }

    /// Look a name up in the layout, widget-type and theme tables, in that order
    pub fn get(&self, name: &str) -> Option<Descriptor> {
        let snap = self.snap.load();
        if let Some(d) = snap.layouts.get(name) {
            return Some(Descriptor::Layout((**d).clone()));
        }
        if let Some(d) = snap.widgets.get(name) {
            return Some(Descriptor::Widget((**d).clone()));
        }
        snap.themes.get(name).map(|d| Descriptor::Theme((**d).clone()))
    }

    /// Every descriptor: layouts, then widget types, then themes, each by name
    pub fn list(&self) -> Vec<Descriptor> {
        let snap = self.snap.load_full();
        let layouts = sorted(&snap.layouts)
            .into_iter()
            .map(|d| Descriptor::Layout((*d).clone()));
        let widgets = sorted(&snap.widgets)
            .into_iter()
            .map(|d| Descriptor::Widget((*d).clone()));
        let themes = sorted(&snap.themes)
            .into_iter()
            .map(|d| Descriptor::Theme((*d).clone()));
        layouts.chain(widgets).chain(themes).collect()
    }

    pub fn layout(&self, name: &str) -> Option<Arc<LayoutDescriptor>> {
        self.snap.load().layouts.get(name).cloned()
    }

    pub fn widget(&self, name: &str) -> Option<Arc<WidgetTypeDescriptor>> {
        self.snap.load().widgets.get(name).cloned()
    }

    pub fn theme(&self, name: &str) -> Option<Arc<ThemeDescriptor>> {
        self.snap.load().themes.get(name).cloned()
    }

    pub fn list_layouts(&self) -> Vec<Arc<LayoutDescriptor>> {
        sorted(&self.snap.load().layouts)
    }

    pub fn list_widgets(&self) -> Vec<Arc<WidgetTypeDescriptor>> {
        sorted(&self.snap.load().widgets)
    }

    pub fn list_themes(&self) -> Vec<Arc<ThemeDescriptor>> {
        sorted(&self.snap.load().themes)
    }

    /// Alias for [`TypeRegistry::reload_layout`]
    pub fn reload(&self, name: &str) -> Result<Arc<LayoutDescriptor>, RegistryError> {
        self.reload_layout(name)
    }

    /// Re-parse a template-backed layout from its stored source and swap the
    /// result in. Code-defined layouts are returned unchanged. On a parse
    /// failure the previous descriptor stays registered.
    pub fn reload_layout(&self, name: &str) -> Result<Arc<LayoutDescriptor>, RegistryError> {
        self.swap_layout(name, None)
    }

    /// Replace a template-backed layout's source, keeping its parse options
    pub fn reload_layout_with_source(
        &self,
        name: &str,
        source: &str,
    ) -> Result<Arc<LayoutDescriptor>, RegistryError> {
        self.swap_layout(name, Some(source))
    }

    fn swap_layout(&self, name: &str, new_source: Option<&str>) -> Result<Arc<LayoutDescriptor>, RegistryError> {
        loop {
            let cur = self.snap.load_full();
            let existing = cur
                .layouts
                .get(name)
                .ok_or_else(|| RegistryError::unknown_layout(name))?;

            let LayoutSource::Template { source, options } = &existing.source else {
                info!(layout = name, "code-defined layout, nothing to reload");
                return Ok(existing.clone());
            };

            let doc = TemplateDocument::new(name, new_source.unwrap_or(source));
            let reparsed = Arc::new(parse_template(&doc, options)?);

            let mut next = (*cur).clone();
            next.layouts.insert(name.to_string(), reparsed.clone());
            next.generation = cur.generation + 1;

            let prev = self.snap.compare_and_swap(&cur, Arc::new(next));
            if Arc::ptr_eq(&prev, &cur) {
                info!(
                    layout = name,
                    slots = reparsed.slot_manifest.len(),
                    generation = cur.generation + 1,
                    "reloaded layout"
                );
                return Ok(reparsed);
            }
        }
    }

    /// Diagnostics for a layout: those recorded at parse time plus any
    /// problem scoping its style text
    pub fn validate_layout(&self, name: &str) -> Result<Vec<Diagnostic>, RegistryError> {
        let layout = self
            .layout(name)
            .ok_or_else(|| RegistryError::unknown_layout(name))?;

        let mut diagnostics = layout.parsing_diagnostics.clone();
        let style_checked = matches!(
            &layout.source,
            LayoutSource::Template { options, .. } if options.validate_style
        );

        match layout.scoped_style() {
            Err(CssValidationError::InvalidScope { scope_id }) => diagnostics.push(Diagnostic::error(
                DiagnosticCategory::Style,
                format!("layout name '{}' cannot be used as a style scope", scope_id),
                None,
            )),
            Err(CssValidationError::Disallowed { issues }) if !style_checked => {
                for issue in issues {
                    let message = format!("style: {}", issue);
                    diagnostics.push(if issue.kind.is_structural() {
                        Diagnostic::error(DiagnosticCategory::Style, message, None)
                    } else {
                        Diagnostic::warning(DiagnosticCategory::Style, message, None)
                    });
                }
            }
            _ => {}
        }

        Ok(diagnostics)
    }

    /// The layout's slot manifest as `{"slots": [...]}` JSON
    pub fn manifest_json(&self, name: &str) -> Result<String, RegistryError> {
        let layout = self
            .layout(name)
            .ok_or_else(|| RegistryError::unknown_layout(name))?;
        Ok(layout.slot_manifest.to_json()?)
    }
}
