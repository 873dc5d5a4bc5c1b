//! Pages, widget instances and per-slot override records

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(pub u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A configured widget placed into a slot on the page that authored it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetInstance {
    pub id: WidgetId,
    pub slot_name: String,
    #[serde(default)]
    pub sort_order: i32,
    pub widget_type_name: String,
    /// Opaque payload, validated by the widget type's owner
    #[serde(default)]
    pub configuration: serde_json::Value,
    /// The authoring page, as opposed to pages that merely inherit it
    pub owner_page_id: PageId,
}

impl WidgetInstance {
    pub fn new(
        id: WidgetId,
        owner_page_id: PageId,
        slot_name: impl Into<String>,
        widget_type_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            slot_name: slot_name.into(),
            sort_order: 0,
            widget_type_name: widget_type_name.into(),
            configuration: serde_json::Value::Null,
            owner_page_id,
        }
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_configuration(mut self, configuration: serde_json::Value) -> Self {
        self.configuration = configuration;
        self
    }
}

/// How a page's own widgets in a slot combine with what its ancestors provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideRecord {
    /// No directive; local widgets stay dormant and ancestors are consulted
    #[default]
    Inherit,
    /// Local widgets go ahead of inherited ones
    Extend,
    /// Local widgets are the whole result
    Replace,
    /// Inheritance severed; local widgets are the whole result even if empty
    Break,
}

impl OverrideRecord {
    /// Whether this record stops the upward walk
    pub fn terminates(self) -> bool {
        matches!(self, OverrideRecord::Replace | OverrideRecord::Break)
    }
}

impl fmt::Display for OverrideRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverrideRecord::Inherit => "inherit",
            OverrideRecord::Extend => "extend",
            OverrideRecord::Replace => "replace",
            OverrideRecord::Break => "break",
        };
        write!(f, "{}", s)
    }
}

/// A node in the page tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    #[serde(default)]
    pub parent_id: Option<PageId>,
    /// `None` inherits from the parent
    #[serde(default)]
    pub layout_name: Option<String>,
    /// `None` inherits from the parent
    #[serde(default)]
    pub theme_name: Option<String>,
    /// Slots without an entry inherit
    #[serde(default)]
    pub slot_overrides: BTreeMap<String, OverrideRecord>,
    /// Widgets authored on this page
    #[serde(default)]
    pub widgets: Vec<WidgetInstance>,
}

impl Page {
    pub fn new(id: PageId) -> Self {
        Self {
            id,
            parent_id: None,
            layout_name: None,
            theme_name: None,
            slot_overrides: BTreeMap::new(),
            widgets: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: PageId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout_name = Some(layout.into());
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme_name = Some(theme.into());
        self
    }

    /// Author a widget on this page. Ownership is always this page.
    pub fn add_widget(&mut self, mut widget: WidgetInstance) {
        widget.owner_page_id = self.id;
        self.widgets.push(widget);
    }

    pub fn with_widget(mut self, widget: WidgetInstance) -> Self {
        self.add_widget(widget);
        self
    }

    /// Record for `slot`; absent records read as [`OverrideRecord::Inherit`]
    pub fn override_for(&self, slot: &str) -> OverrideRecord {
        self.slot_overrides.get(slot).copied().unwrap_or_default()
    }

    /// Set the record for `slot`. Setting `Inherit` removes the entry.
    pub fn set_override(&mut self, slot: impl Into<String>, record: OverrideRecord) {
        let slot = slot.into();
        if record == OverrideRecord::Inherit {
            self.slot_overrides.remove(&slot);
        } else {
            self.slot_overrides.insert(slot, record);
        }
    }

    pub fn break_slot(&mut self, slot: impl Into<String>) {
        self.set_override(slot, OverrideRecord::Break);
    }

    pub fn replace_slot(&mut self, slot: impl Into<String>) {
        self.set_override(slot, OverrideRecord::Replace);
    }

    pub fn extend_slot(&mut self, slot: impl Into<String>) {
        self.set_override(slot, OverrideRecord::Extend);
    }

    pub fn with_override(mut self, slot: impl Into<String>, record: OverrideRecord) -> Self {
        self.set_override(slot, record);
        self
    }

    /// Return `slot` to ancestor resolution and hand back the record that was
    /// dropped. Widgets authored for the slot are kept; without a record they
    /// no longer contribute.
    pub fn restore_slot(&mut self, slot: &str) -> OverrideRecord {
        self.slot_overrides.remove(slot).unwrap_or_default()
    }

    /// Widgets this page authored in `slot`, by sort order then id
    pub fn local_widgets(&self, slot: &str) -> Vec<&WidgetInstance> {
        let mut local: Vec<&WidgetInstance> =
            self.widgets.iter().filter(|w| w.slot_name == slot).collect();
        local.sort_by_key(|w| (w.sort_order, w.id));
        local
    }

    /// Slot names this page mentions through widgets or override records
    pub fn mentioned_slots(&self) -> Vec<&str> {
        let mut slots: Vec<&str> = self
            .slot_overrides
            .keys()
            .map(String::as_str)
            .chain(self.widgets.iter().map(|w| w.slot_name.as_str()))
            .collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(id: u64, slot: &str, order: i32) -> WidgetInstance {
        WidgetInstance::new(WidgetId(id), PageId(0), slot, "text").with_sort_order(order)
    }

    #[test]
    fn test_add_widget_takes_ownership() {
        let mut page = Page::new(PageId(7));
        page.add_widget(widget(1, "main", 0));
        assert_eq!(page.widgets[0].owner_page_id, PageId(7));
    }

    #[test]
    fn test_local_widgets_ordering() {
        let page = Page::new(PageId(1))
            .with_widget(widget(3, "main", 1))
            .with_widget(widget(2, "main", 0))
            .with_widget(widget(1, "main", 1))
            .with_widget(widget(9, "side", 0));
        let ids: Vec<_> = page.local_widgets("main").iter().map(|w| w.id.0).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_override_defaults_and_inherit_removes() {
        let mut page = Page::new(PageId(1));
        assert_eq!(page.override_for("main"), OverrideRecord::Inherit);
        page.break_slot("main");
        assert_eq!(page.override_for("main"), OverrideRecord::Break);
        page.set_override("main", OverrideRecord::Inherit);
        assert!(page.slot_overrides.is_empty());
    }

    #[test]
    fn test_restore_keeps_authored_widgets() {
        let mut page = Page::new(PageId(1))
            .with_widget(widget(1, "main", 0))
            .with_widget(widget(2, "side", 0));
        page.replace_slot("main");
        assert_eq!(page.restore_slot("main"), OverrideRecord::Replace);
        assert_eq!(page.widgets.len(), 2);
        assert_eq!(page.local_widgets("main").len(), 1);
        assert_eq!(page.override_for("main"), OverrideRecord::Inherit);
        assert_eq!(page.restore_slot("main"), OverrideRecord::Inherit);
    }

    #[test]
    fn test_override_record_serde() {
        let record: OverrideRecord = serde_json::from_str("\"break\"").unwrap();
        assert_eq!(record, OverrideRecord::Break);
        assert_eq!(serde_json::to_string(&OverrideRecord::Extend).unwrap(), "\"extend\"");
    }

    #[test]
    fn test_mentioned_slots() {
        let mut page = Page::new(PageId(1)).with_widget(widget(1, "main", 0));
        page.extend_slot("main");
        page.break_slot("aside");
        assert_eq!(page.mentioned_slots(), vec!["aside", "main"]);
    }
}
