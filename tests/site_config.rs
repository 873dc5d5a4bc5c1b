use std::fs;
use std::path::{Path, PathBuf};

use page_composer::{
    ConfigError, DiagnosticCategory, OverrideRecord, PageId, Site, SiteConfig, WidgetId,
};
use pretty_assertions::assert_eq;

fn unique_temp_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "page-composer-{}-{}-{}",
        name,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

const SITE: &str = r##"
[site]
name = "docs"
default_layout = "article"
default_theme = "paper"

[[layouts]]
name = "article"
template = "layouts/article.html"

[[layouts]]
name = "bare"
slots = [{ name = "body", title = "Body", max_widgets = 1 }]

[[themes]]
file = "themes/paper.toml"

[[themes]]
name = "night"
variables = { bg = "#111", fg = "#eee" }

[[widgets]]
name = "markdown"
rendering_target = "markdown"

[[widgets]]
name = "promo"
rendering_target = "banner"
inheritable = false

[[pages]]
id = 1
widgets = [
    { id = 1, slot = "nav", type = "markdown" },
    { id = 2, slot = "aside", type = "promo" },
]

[[pages]]
id = 2
parent = 1
theme = "night"
overrides = { aside = "replace" }
widgets = [{ id = 3, slot = "aside", type = "markdown", config = { text = "Related" } }]

[[pages]]
id = 3
parent = 2
"##;

const ARTICLE: &str = r#"<style>
  nav { display: flex }
</style>
<article>
  <nav slot="nav"></nav>
  <div slot="body"></div>
  <aside slot="aside" max-widgets="2"></aside>
</article>
"#;

const PAPER: &str = r##"
style = "p { margin: 0 }"

[metadata]
description = "Light paper palette"

[variables]
bg = "#fffdf6"
"##;

fn site_dir() -> PathBuf {
    let dir = unique_temp_dir("site");
    write(&dir.join("site.toml"), SITE);
    write(&dir.join("layouts/article.html"), ARTICLE);
    write(&dir.join("themes/paper.toml"), PAPER);
    dir
}

#[test]
fn test_load_site_from_files() {
    let dir = site_dir();
    let site = Site::from_file(&dir.join("site.toml")).expect("Should load");

    assert!(site.report.is_clean(), "{:?}", site.report);
    assert_eq!(site.report.modules, vec!["docs"]);
    assert_eq!(site.pages.len(), 3);

    let article = site.registry.layout("article").expect("article layout");
    assert_eq!(article.slot_manifest.names(), vec!["nav", "body", "aside"]);
    assert!(article.is_template());

    // Theme named after its file stem
    let paper = site.registry.theme("paper").expect("paper theme");
    assert_eq!(paper.description.as_deref(), Some("Light paper palette"));
    assert_eq!(paper.variable("bg"), Some("#fffdf6"));

    assert!(!site.registry.widget("promo").unwrap().inheritable);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_compose_pages_of_loaded_site() {
    let dir = site_dir();
    let site = Site::from_file(&dir.join("site.toml")).expect("Should load");

    let root = site.compose(PageId(1)).expect("Should compose");
    assert_eq!(root.effective_layout, "article");
    assert_eq!(root.effective_theme.as_deref(), Some("paper"));
    assert_eq!(root.widget_ids("aside"), vec![WidgetId(2)]);

    let section = site.compose(PageId(2)).expect("Should compose");
    assert_eq!(section.effective_theme.as_deref(), Some("night"));
    assert_eq!(section.widget_ids("nav"), vec![WidgetId(1)]);
    assert_eq!(section.widget_ids("aside"), vec![WidgetId(3)]);
    assert_eq!(
        section.slot("aside").unwrap()[0].widget.configuration["text"],
        "Related"
    );

    // Promo never reaches descendants, and the replace on page 2 stops the walk
    let leaf = site.compose(PageId(3)).expect("Should compose");
    assert_eq!(leaf.widget_ids("aside"), vec![WidgetId(3)]);
    assert!(leaf.warnings.is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_page_overrides_loaded() {
    let dir = site_dir();
    let config = SiteConfig::from_file(&dir.join("site.toml")).expect("Should load");
    let pages = config.page_tree();
    assert_eq!(
        pages.get(PageId(2)).unwrap().override_for("aside"),
        OverrideRecord::Replace
    );
    assert_eq!(
        pages.get(PageId(3)).unwrap().override_for("aside"),
        OverrideRecord::Inherit
    );
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_validate_and_reload_from_site() {
    let dir = site_dir();
    let site = Site::from_file(&dir.join("site.toml")).expect("Should load");

    assert!(site.registry.validate_layout("article").unwrap().is_empty());
    assert!(site.registry.validate_layout("bare").unwrap().is_empty());

    let reloaded = site
        .registry
        .reload_layout_with_source("article", r#"<main slot="nav"></main>"#)
        .expect("Should reload");
    assert_eq!(reloaded.slot_manifest.names(), vec!["nav"]);

    // Page 2's aside override now points at a slot the layout lacks
    let section = site.compose(PageId(2)).expect("Should compose");
    assert!(section
        .diagnostics()
        .iter()
        .any(|d| d.category == DiagnosticCategory::OrphanedSlot));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_broken_template_reported_by_discovery() {
    let dir = unique_temp_dir("broken");
    write(
        &dir.join("site.toml"),
        "[[layouts]]\nname = \"bad\"\nsource = '<div slot=\"a\"></span>'\n",
    );
    let site = Site::from_file(&dir.join("site.toml")).expect("Should load");
    assert_eq!(site.report.failures.len(), 1);
    assert_eq!(site.report.failures[0].module, "site");
    assert!(site.registry.layout("bad").is_none());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_site_file() {
    let dir = unique_temp_dir("missing");
    let err = SiteConfig::from_file(&dir.join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    fs::remove_dir_all(&dir).ok();
}
