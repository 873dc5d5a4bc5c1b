//! Inheritance resolver
//!
//! Computes a page's effective composition from the page, its ancestor chain
//! and a registry snapshot. The walk for every slot starts at the page and
//! moves toward the root:
//!
//! - a page with an `Extend`, `Replace` or `Break` record contributes its own
//!   widgets for the slot, ordered by `sort_order` then id, after everything
//!   contributed below it;
//! - a page without a record contributes nothing unless it is the topmost
//!   page of the walk, whose widgets form the base everything inherits;
//! - `Replace` and `Break` stop the walk at the page that carries them;
//! - widget types registered as non-inheritable only count on their owner.
//!
//! The walk is bounded by the chain handed in, never by following parent
//! links, so a malformed chain cannot make it loop.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::composition::{CompositionWarning, EffectiveComposition, ResolvedWidget};
use super::page::{OverrideRecord, Page, PageId};
use crate::registry::{RegistrySnapshot, SlotDescriptor, TypeRegistry};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no layout resolved for page {page_id}")]
    NoLayoutResolved { page_id: PageId },

    #[error("page {page_id} resolves to unknown layout '{layout}'")]
    UnknownLayout { page_id: PageId, layout: String },
}

/// Site-wide fallbacks consulted once the ancestor chain is exhausted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub default_layout: Option<String>,
    pub default_theme: Option<String>,
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_layout(mut self, layout: impl Into<String>) -> Self {
        self.default_layout = Some(layout.into());
        self
    }

    pub fn with_default_theme(mut self, theme: impl Into<String>) -> Self {
        self.default_theme = Some(theme.into());
        self
    }
}

/// Resolves pages against a type registry
#[derive(Debug)]
pub struct InheritanceResolver<'r> {
    registry: &'r TypeRegistry,
    config: ResolverConfig,
}

impl<'r> InheritanceResolver<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `page` given its ancestors, root first and ending at its parent
    pub fn resolve(&self, page: &Page, ancestors: &[Page]) -> Result<EffectiveComposition, ResolveError> {
        let snapshot = self.registry.snapshot();
        resolve_with_snapshot(&snapshot, &self.config, page, ancestors)
    }
}

/// Resolve against a fixed registry snapshot
pub fn resolve_with_snapshot(
    snapshot: &Arc<RegistrySnapshot>,
    config: &ResolverConfig,
    page: &Page,
    ancestors: &[Page],
) -> Result<EffectiveComposition, ResolveError> {
    let mut warnings = Vec::new();
    let walk = walk_order(page, ancestors, &mut warnings);

    let layout_name = walk
        .iter()
        .find_map(|p| p.layout_name.clone())
        .or_else(|| config.default_layout.clone())
        .ok_or(ResolveError::NoLayoutResolved { page_id: page.id })?;

    let layout = snapshot
        .layout(&layout_name)
        .ok_or_else(|| ResolveError::UnknownLayout {
            page_id: page.id,
            layout: layout_name.clone(),
        })?;

    let theme = walk
        .iter()
        .find_map(|p| p.theme_name.clone())
        .or_else(|| config.default_theme.clone());
    if let Some(theme) = &theme {
        if snapshot.theme(theme).is_none() {
            warnings.push(CompositionWarning::UnknownTheme {
                theme: theme.clone(),
            });
        }
    }

    for slot in page.mentioned_slots() {
        if !layout.slot_manifest.contains(slot) {
            warnings.push(CompositionWarning::OrphanedSlot {
                page_id: page.id,
                slot: slot.to_string(),
                layout: layout_name.clone(),
            });
        }
    }

    let mut slots = IndexMap::with_capacity(layout.slot_manifest.len());
    for slot in layout.slot_manifest.iter() {
        let widgets = resolve_slot(snapshot, slot, page.id, &walk, &mut warnings);
        slots.insert(slot.name.clone(), widgets);
    }

    Ok(EffectiveComposition {
        page_id: page.id,
        effective_layout: layout_name,
        effective_theme: theme,
        slots,
        warnings,
        registry_generation: snapshot.generation(),
    })
}

/// Pages from the target upward. Repeated ids are dropped and a chain that
/// does not end at the page's parent is reported.
fn walk_order<'a>(
    page: &'a Page,
    ancestors: &'a [Page],
    warnings: &mut Vec<CompositionWarning>,
) -> Vec<&'a Page> {
    match (page.parent_id, ancestors.last()) {
        (Some(parent), Some(last)) if parent != last.id => {
            warnings.push(CompositionWarning::AncestorChain {
                message: format!(
                    "chain ends at page {} but page {} has parent {}",
                    last.id, page.id, parent
                ),
            });
        }
        (Some(parent), None) => warnings.push(CompositionWarning::AncestorChain {
            message: format!("page {} has parent {} but no ancestors were supplied", page.id, parent),
        }),
        (None, Some(_)) => warnings.push(CompositionWarning::AncestorChain {
            message: format!("page {} is a root but ancestors were supplied", page.id),
        }),
        _ => {}
    }

    let mut seen: HashSet<PageId> = HashSet::from([page.id]);
    let mut walk = Vec::with_capacity(ancestors.len() + 1);
    walk.push(page);
    for ancestor in ancestors.iter().rev() {
        if seen.insert(ancestor.id) {
            walk.push(ancestor);
        } else {
            warnings.push(CompositionWarning::AncestorChain {
                message: format!("page {} appears more than once; later occurrence skipped", ancestor.id),
            });
        }
    }
    walk
}

fn resolve_slot(
    snapshot: &RegistrySnapshot,
    slot: &SlotDescriptor,
    target: PageId,
    walk: &[&Page],
    warnings: &mut Vec<CompositionWarning>,
) -> Vec<ResolvedWidget> {
    let mut result: Vec<ResolvedWidget> = Vec::new();
    let top = walk.len().saturating_sub(1);

    for (depth, page) in walk.iter().enumerate() {
        let record = page.override_for(&slot.name);
        if record == OverrideRecord::Inherit && depth != top {
            continue;
        }

        for widget in page.local_widgets(&slot.name) {
            let widget_type = snapshot.widget(&widget.widget_type_name);
            if page.id != target && widget_type.is_some_and(|t| !t.inheritable) {
                continue;
            }
            if widget_type.is_none() {
                warnings.push(CompositionWarning::UnknownWidgetType {
                    slot: slot.name.clone(),
                    widget_id: widget.id,
                    widget_type: widget.widget_type_name.clone(),
                });
            }
            result.push(ResolvedWidget::for_page(widget.clone(), target));
        }

        if record.terminates() {
            break;
        }
    }

    if let Some(limit) = slot.max_widgets {
        if result.len() > limit {
            debug!(
                slot = %slot.name,
                limit,
                found = result.len(),
                "truncating slot to its widget limit"
            );
            warnings.push(CompositionWarning::SlotCapacityExceeded {
                slot: slot.name.clone(),
                limit,
                found: result.len(),
            });
            result.truncate(limit);
        }
    }

    result
}
