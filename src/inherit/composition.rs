//! Resolver output: the effective layout, theme and widgets of a page

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

use super::page::{PageId, WidgetId, WidgetInstance};
use crate::error::{Diagnostic, DiagnosticCategory};

/// A widget in its final position, with provenance
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWidget {
    pub widget: WidgetInstance,
    pub is_inherited: bool,
    /// The owner page when inherited
    pub inherited_from_page_id: Option<PageId>,
}

impl ResolvedWidget {
    /// Annotate a widget relative to the page being composed
    pub fn for_page(widget: WidgetInstance, page: PageId) -> Self {
        let is_inherited = widget.owner_page_id != page;
        Self {
            inherited_from_page_id: is_inherited.then_some(widget.owner_page_id),
            is_inherited,
            widget,
        }
    }

    pub fn id(&self) -> WidgetId {
        self.widget.id
    }
}

impl Serialize for ResolvedWidget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ResolvedWidget", 6)?;
        s.serialize_field("widget_id", &self.widget.id)?;
        s.serialize_field("widget_type_name", &self.widget.widget_type_name)?;
        s.serialize_field("configuration", &self.widget.configuration)?;
        s.serialize_field("is_inherited", &self.is_inherited)?;
        s.serialize_field("inherited_from_page_id", &self.inherited_from_page_id)?;
        s.serialize_field("sort_order", &self.widget.sort_order)?;
        s.end()
    }
}

/// Non-fatal issues found while resolving a page
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CompositionWarning {
    #[error("slot '{slot}' resolved {found} widgets, truncated to {limit}")]
    SlotCapacityExceeded {
        slot: String,
        limit: usize,
        found: usize,
    },

    #[error("widget {widget_id} in slot '{slot}' has unregistered type '{widget_type}'")]
    UnknownWidgetType {
        slot: String,
        widget_id: WidgetId,
        widget_type: String,
    },

    #[error("effective theme '{theme}' is not registered")]
    UnknownTheme { theme: String },

    #[error("page {page_id} has content for slot '{slot}', which layout '{layout}' does not declare")]
    OrphanedSlot {
        page_id: PageId,
        slot: String,
        layout: String,
    },

    #[error("ancestor chain: {message}")]
    AncestorChain { message: String },
}

impl CompositionWarning {
    pub fn category(&self) -> DiagnosticCategory {
        match self {
            CompositionWarning::SlotCapacityExceeded { .. } => DiagnosticCategory::SlotCapacity,
            CompositionWarning::UnknownWidgetType { .. } => DiagnosticCategory::UnknownWidgetType,
            CompositionWarning::UnknownTheme { .. } => DiagnosticCategory::UnknownTheme,
            CompositionWarning::OrphanedSlot { .. } => DiagnosticCategory::OrphanedSlot,
            CompositionWarning::AncestorChain { .. } => DiagnosticCategory::AncestorChain,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::warning(self.category(), self.to_string(), None)
    }
}

/// Fully resolved composition of one page
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EffectiveComposition {
    pub page_id: PageId,
    pub effective_layout: String,
    pub effective_theme: Option<String>,
    /// In layout manifest order
    pub slots: IndexMap<String, Vec<ResolvedWidget>>,
    pub warnings: Vec<CompositionWarning>,
    /// Registry generation the composition was resolved against
    pub registry_generation: u64,
}

impl EffectiveComposition {
    pub fn slot(&self, name: &str) -> Option<&[ResolvedWidget]> {
        self.slots.get(name).map(Vec::as_slice)
    }

    /// Widget ids of a slot in final order; empty for unknown slots
    pub fn widget_ids(&self, slot: &str) -> Vec<WidgetId> {
        self.slot(slot)
            .map(|widgets| widgets.iter().map(ResolvedWidget::id).collect())
            .unwrap_or_default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.warnings.iter().map(CompositionWarning::to_diagnostic).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
