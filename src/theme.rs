//! Theme descriptors for page palettes
//!
//! A theme maps variable names to values and may carry extra style text.
//! Rendered, it becomes a `:root` block of custom properties scoped to the
//! theme's name so several themes can coexist on one page.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::css::{self, CssValidationError, ScopedCss};

/// Errors that can occur when loading or parsing themes
#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("failed to read theme file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to parse theme TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("theme has no name")]
    MissingName,
    #[error("invalid theme variable name '{name}'")]
    InvalidVariable { name: String },
}

/// A named palette of custom properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Variable name (without the leading `--`) to value
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub style_text: Option<String>,
}

/// TOML structure for deserializing theme files
#[derive(Deserialize)]
struct TomlTheme {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    style: Option<String>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
    description: Option<String>,
}

impl ThemeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            variables: BTreeMap::new(),
            style_text: None,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_style(mut self, style_text: impl Into<String>) -> Self {
        self.style_text = Some(style_text.into());
        self
    }

    /// Load a theme from a TOML file. The file stem names the theme when the
    /// file's metadata does not.
    pub fn from_file(path: &Path) -> Result<Self, ThemeError> {
        let content = std::fs::read_to_string(path)?;
        let fallback = path.file_stem().and_then(|s| s.to_str());
        Self::parse_toml(&content, fallback)
    }

    /// Load a theme from a TOML string with a `[metadata] name`
    pub fn from_toml_str(content: &str) -> Result<Self, ThemeError> {
        Self::parse_toml(content, None)
    }

    fn parse_toml(content: &str, fallback_name: Option<&str>) -> Result<Self, ThemeError> {
        let parsed: TomlTheme = toml::from_str(content)?;
        let name = parsed
            .metadata
            .as_ref()
            .and_then(|m| m.name.clone())
            .or_else(|| fallback_name.map(str::to_string))
            .ok_or(ThemeError::MissingName)?;

        let theme = ThemeDescriptor {
            name,
            description: parsed.metadata.and_then(|m| m.description),
            variables: parsed.variables,
            style_text: parsed.style,
        };
        theme.check_variables()?;
        Ok(theme)
    }

    /// Reject variable names that cannot be written as custom properties
    pub fn check_variables(&self) -> Result<(), ThemeError> {
        match self.variables.keys().find(|k| !css::is_identifier(k)) {
            Some(bad) => Err(ThemeError::InvalidVariable { name: bad.clone() }),
            None => Ok(()),
        }
    }

    /// Look up a variable value
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|s| s.as_str())
    }

    /// Render the palette and extra style text, scoped to the theme name
    pub fn to_css(&self) -> Result<ScopedCss, CssValidationError> {
        let mut text = String::new();
        if !self.variables.is_empty() {
            text.push_str(":root {\n");
            for (name, value) in &self.variables {
                text.push_str(&format!("  --{}: {};\n", name, value));
            }
            text.push_str("}\n");
        }
        if let Some(style) = &self.style_text {
            text.push_str(style);
        }
        css::scope(&text, &self.name)
    }
}
