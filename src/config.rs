//! Site configuration loaded from TOML
//!
//! A site file declares the site-wide defaults, the layouts, themes and widget
//! types to register at startup, and optionally a set of pages. Template and
//! theme files referenced by path are read relative to the site file.
//!
//! ```toml
//! [site]
//! default_layout = "home"
//!
//! [[layouts]]
//! name = "home"
//! template = "layouts/home.html"
//!
//! [[widgets]]
//! name = "text"
//! rendering_target = "text-block"
//!
//! [[pages]]
//! id = 1
//! overrides = { sidebar = "break" }
//! widgets = [{ id = 10, slot = "main", type = "text" }]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::inherit::{OverrideRecord, Page, PageId, PageTree, ResolverConfig, WidgetId, WidgetInstance};
use crate::registry::{
    DiscoveryError, DiscoveryModule, LayoutDescriptor, Registrar, SlotDescriptor, WidgetTypeDescriptor,
};
use crate::template::ParseOptions;
use crate::theme::{ThemeDescriptor, ThemeError};

/// Errors that can occur when loading a site configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse site TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub name: Option<String>,
    pub default_layout: Option<String>,
    pub default_theme: Option<String>,
}

/// A layout declared as a template file, inline template or explicit slots
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutEntry {
    pub name: String,
    /// Path of a template document
    pub template: Option<PathBuf>,
    /// Inline template document
    pub source: Option<String>,
    /// Code-defined manifest
    pub slots: Option<Vec<SlotEntry>>,
    /// Style text for code-defined layouts
    pub style: Option<String>,
    #[serde(default)]
    pub options: ParseOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotEntry {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub max_widgets: Option<usize>,
    #[serde(default)]
    pub css_classes: Vec<String>,
}

impl From<SlotEntry> for SlotDescriptor {
    fn from(entry: SlotEntry) -> Self {
        let mut slot = SlotDescriptor::new(entry.name).with_css_classes(entry.css_classes);
        if let Some(title) = entry.title {
            slot = slot.with_title(title);
        }
        if let Some(description) = entry.description {
            slot = slot.with_description(description);
        }
        if let Some(max) = entry.max_widgets {
            slot = slot.with_max_widgets(max);
        }
        slot
    }
}

/// A theme given inline or by TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeEntry {
    pub name: Option<String>,
    pub file: Option<PathBuf>,
    pub description: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetEntry {
    pub name: String,
    pub rendering_target: String,
    pub schema: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub inheritable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageEntry {
    pub id: u64,
    pub parent: Option<u64>,
    pub layout: Option<String>,
    pub theme: Option<String>,
    #[serde(default)]
    pub overrides: BTreeMap<String, OverrideRecord>,
    #[serde(default)]
    pub widgets: Vec<PageWidgetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageWidgetEntry {
    pub id: u64,
    pub slot: String,
    #[serde(rename = "type")]
    pub widget_type: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawSite {
    #[serde(default)]
    site: SiteSection,
    #[serde(default)]
    layouts: Vec<LayoutEntry>,
    #[serde(default)]
    themes: Vec<ThemeEntry>,
    #[serde(default)]
    widgets: Vec<WidgetEntry>,
    #[serde(default)]
    pages: Vec<PageEntry>,
}

/// A loaded site: descriptors ready to register and page fixtures
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub layouts: Vec<LayoutEntry>,
    pub themes: Vec<ThemeDescriptor>,
    pub widgets: Vec<WidgetEntry>,
    pub pages: Vec<PageEntry>,
}

impl SiteConfig {
    /// Load a site file; referenced files resolve against its directory
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = read(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_str(&content, base_dir)
    }

    /// Parse site TOML, reading referenced template and theme files
    /// relative to `base_dir`
    pub fn from_str(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawSite = toml::from_str(content)?;

        let mut layouts = raw.layouts;
        for layout in &mut layouts {
            let declared = [layout.template.is_some(), layout.source.is_some(), layout.slots.is_some()]
                .iter()
                .filter(|d| **d)
                .count();
            if declared != 1 {
                return Err(ConfigError::invalid(format!(
                    "layout '{}' must declare exactly one of template, source or slots",
                    layout.name
                )));
            }
            if let Some(path) = layout.template.take() {
                let path = base_dir.join(path);
                debug!(layout = %layout.name, path = %path.display(), "reading template");
                layout.source = Some(read(&path)?);
            }
        }

        let themes = raw
            .themes
            .into_iter()
            .map(|entry| theme_from_entry(entry, base_dir))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = std::collections::HashSet::new();
        for page in &raw.pages {
            if !seen.insert(page.id) {
                return Err(ConfigError::invalid(format!("page {} declared twice", page.id)));
            }
        }

        Ok(Self {
            site: raw.site,
            layouts,
            themes,
            widgets: raw.widgets,
            pages: raw.pages,
        })
    }

    /// Site-wide defaults for the resolver
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            default_layout: self.site.default_layout.clone(),
            default_theme: self.site.default_theme.clone(),
        }
    }

    /// Build the page store from the declared pages
    pub fn page_tree(&self) -> PageTree {
        self.pages.iter().map(page_from_entry).collect()
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn theme_from_entry(entry: ThemeEntry, base_dir: &Path) -> Result<ThemeDescriptor, ConfigError> {
    if let Some(file) = entry.file {
        let mut theme = ThemeDescriptor::from_file(&base_dir.join(file))?;
        if let Some(name) = entry.name {
            theme.name = name;
        }
        return Ok(theme);
    }

    let name = entry
        .name
        .ok_or_else(|| ConfigError::invalid("inline theme without a name"))?;
    let theme = ThemeDescriptor {
        name,
        description: entry.description,
        variables: entry.variables,
        style_text: entry.style,
    };
    theme.check_variables()?;
    Ok(theme)
}

fn page_from_entry(entry: &PageEntry) -> Page {
    let mut page = Page::new(PageId(entry.id));
    page.parent_id = entry.parent.map(PageId);
    page.layout_name = entry.layout.clone();
    page.theme_name = entry.theme.clone();
    for (slot, record) in &entry.overrides {
        page.set_override(slot.clone(), *record);
    }
    for w in &entry.widgets {
        let mut widget = WidgetInstance::new(WidgetId(w.id), page.id, w.slot.clone(), w.widget_type.clone())
            .with_sort_order(w.sort_order);
        if let Some(config) = &w.config {
            widget = widget.with_configuration(config.clone());
        }
        page.add_widget(widget);
    }
    page
}

impl DiscoveryModule for SiteConfig {
    fn name(&self) -> &str {
        self.site.name.as_deref().unwrap_or("site")
    }

    fn register(&self, registrar: &mut Registrar<'_>) -> Result<(), DiscoveryError> {
        for entry in &self.widgets {
            let mut widget = WidgetTypeDescriptor::new(&entry.name, &entry.rendering_target)
                .with_inheritable(entry.inheritable);
            if let Some(schema) = &entry.schema {
                widget = widget.with_schema(schema.clone());
            }
            registrar.register(widget);
        }

        for theme in &self.themes {
            registrar.register(theme.clone());
        }

        for entry in &self.layouts {
            match (&entry.source, &entry.slots) {
                (Some(source), _) => {
                    registrar.register_template(&entry.name, source, &entry.options)?;
                }
                (None, Some(slots)) => {
                    let slots = slots.iter().cloned().map(SlotDescriptor::from).collect();
                    registrar.register(LayoutDescriptor::code(&entry.name, slots, entry.style.clone())?);
                }
                (None, None) => {
                    return Err(DiscoveryError::module(format!(
                        "layout '{}' has no template source or slots",
                        entry.name
                    )))
                }
            }
        }

        Ok(())
    }
}
