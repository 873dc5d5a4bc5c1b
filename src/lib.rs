//! Page Composer - layout templates and page inheritance for tree-structured sites
//!
//! This library parses structural layout templates into slot manifests, keeps
//! layouts, widget types and themes in a copy-on-write registry, and resolves
//! each page's effective layout, theme and widgets from its ancestors.
//!
//! # Example
//!
//! ```rust
//! use page_composer::parse_layout;
//!
//! let layout = parse_layout("home", r#"<main><div slot="content" max-widgets="3"></div></main>"#).unwrap();
//! assert_eq!(layout.slot_manifest.names(), vec!["content"]);
//! ```

pub mod config;
pub mod css;
pub mod error;
pub mod inherit;
pub mod parser;
pub mod registry;
pub mod template;
pub mod theme;

pub use config::{ConfigError, SiteConfig};
pub use css::{scope, CssValidationError, ScopedCss};
pub use error::{Diagnostic, DiagnosticCategory, Severity, TemplateParsingError};
pub use inherit::{
    CompositionWarning, EffectiveComposition, InheritanceResolver, OverrideRecord, Page, PageId,
    PageTree, PageTreeError, ResolveError, ResolvedWidget, ResolverConfig, WidgetId,
    WidgetInstance,
};
pub use registry::{
    Descriptor, Discovery, DiscoveryReport, LayoutDescriptor, RegistryError, SlotDescriptor,
    SlotManifest, TypeRegistry, WidgetTypeDescriptor,
};
pub use template::{parse_template, ParseOptions, TemplateDocument};
pub use theme::ThemeDescriptor;

use std::path::Path;

use thiserror::Error;

/// Errors that can occur while composing a page of a loaded site
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Tree(#[from] PageTreeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Parse a layout template with default options
///
/// # Example
///
/// ```rust
/// use page_composer::{parse_layout, TemplateParsingError};
///
/// let err = parse_layout("dup", r#"<div slot="a"></div><div slot="a"></div>"#).unwrap_err();
/// assert!(matches!(err, TemplateParsingError::DuplicateSlot { .. }));
/// ```
pub fn parse_layout(name: &str, source: &str) -> Result<LayoutDescriptor, TemplateParsingError> {
    parse_template(&TemplateDocument::new(name, source), &ParseOptions::default())
}

/// A site loaded from configuration: populated registry plus page store
#[derive(Debug)]
pub struct Site {
    pub registry: TypeRegistry,
    pub pages: PageTree,
    pub resolver_config: ResolverConfig,
    /// Outcome of the discovery pass that populated the registry
    pub report: DiscoveryReport,
}

impl Site {
    /// Run discovery over a site configuration
    pub fn load(config: SiteConfig) -> Self {
        let pages = config.page_tree();
        let resolver_config = config.resolver_config();
        let registry = TypeRegistry::new();
        let report = Discovery::new().with_module(config).run(&registry);
        Self {
            registry,
            pages,
            resolver_config,
            report,
        }
    }

    /// Load and run discovery over a site file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::load(SiteConfig::from_file(path)?))
    }

    pub fn resolver(&self) -> InheritanceResolver<'_> {
        InheritanceResolver::new(&self.registry).with_config(self.resolver_config.clone())
    }

    /// Materialize a page's ancestor chain and resolve it
    pub fn compose(&self, page_id: PageId) -> Result<EffectiveComposition, ComposeError> {
        let page = self.pages.get(page_id).ok_or(PageTreeError::NotFound(page_id))?;
        let ancestors = self.pages.ancestors(page_id)?;
        Ok(self.resolver().resolve(page, &ancestors)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = r#"
[site]
default_layout = "home"

[[layouts]]
name = "home"
source = '<main slot="main"></main>'

[[widgets]]
name = "text"
rendering_target = "text"

[[pages]]
id = 1
widgets = [{ id = 1, slot = "main", type = "text" }]

[[pages]]
id = 2
parent = 1
"#;

    fn site() -> Site {
        Site::load(SiteConfig::from_str(SITE, Path::new(".")).unwrap())
    }

    #[test]
    fn test_parse_layout_simple() {
        let layout = parse_layout("home", r#"<div slot="main"></div>"#).unwrap();
        assert_eq!(layout.slot_manifest.get("main").unwrap().title, "Main");
    }

    #[test]
    fn test_site_compose() {
        let site = site();
        assert!(site.report.is_clean());
        let composition = site.compose(PageId(2)).unwrap();
        assert_eq!(composition.effective_layout, "home");
        assert_eq!(composition.widget_ids("main"), vec![WidgetId(1)]);
        assert!(composition.slot("main").unwrap()[0].is_inherited);
    }

    #[test]
    fn test_site_compose_unknown_page() {
        let err = site().compose(PageId(42)).unwrap_err();
        assert!(matches!(err, ComposeError::Tree(PageTreeError::NotFound(PageId(42)))));
    }
}
