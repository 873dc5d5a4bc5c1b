//! Options controlling how a template document is turned into a manifest

use serde::{Deserialize, Serialize};

use crate::error::TemplateParsingError;

/// Configuration options for template parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Reject templates that declare the same slot name twice
    pub require_unique_slot_names: bool,

    /// Tolerate duplicate slot names even when uniqueness is required;
    /// the first occurrence wins and later ones are reported
    pub allow_duplicate_slots: bool,

    /// Scan extracted style text for disallowed constructs
    pub validate_style: bool,

    /// Fail when the template declares no slots at all
    pub require_slots: bool,

    pub min_slots: Option<usize>,
    pub max_slots: Option<usize>,

    /// Attribute that marks an element as a slot
    pub marker_attribute: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            require_unique_slot_names: true,
            allow_duplicate_slots: false,
            validate_style: true,
            require_slots: false,
            min_slots: None,
            max_slots: None,
            marker_attribute: "slot".to_string(),
        }
    }
}

impl ParseOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unique_slot_names(mut self, require: bool) -> Self {
        self.require_unique_slot_names = require;
        self
    }

    /// Allow duplicate slot names, keeping the first of each
    pub fn with_duplicate_slots(mut self, allow: bool) -> Self {
        self.allow_duplicate_slots = allow;
        self
    }

    pub fn with_style_validation(mut self, validate: bool) -> Self {
        self.validate_style = validate;
        self
    }

    pub fn with_required_slots(mut self, require: bool) -> Self {
        self.require_slots = require;
        self
    }

    pub fn with_min_slots(mut self, min: usize) -> Self {
        self.min_slots = Some(min);
        self
    }

    pub fn with_max_slots(mut self, max: usize) -> Self {
        self.max_slots = Some(max);
        self
    }

    /// Use a different marker attribute instead of `slot`
    pub fn with_marker_attribute(mut self, name: impl Into<String>) -> Self {
        self.marker_attribute = name.into();
        self
    }

    /// Whether a repeated slot name aborts the parse
    pub fn duplicates_fatal(&self) -> bool {
        self.require_unique_slot_names && !self.allow_duplicate_slots
    }

    /// Reject contradictory settings before any parsing work
    pub fn check(&self) -> Result<(), TemplateParsingError> {
        if let (Some(min), Some(max)) = (self.min_slots, self.max_slots) {
            if min > max {
                return Err(TemplateParsingError::InvalidOptions {
                    reason: format!("min_slots ({}) exceeds max_slots ({})", min, max),
                });
            }
        }
        if self.marker_attribute.trim().is_empty() {
            return Err(TemplateParsingError::InvalidOptions {
                reason: "marker attribute name is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert!(options.require_unique_slot_names);
        assert!(!options.allow_duplicate_slots);
        assert!(options.validate_style);
        assert_eq!(options.marker_attribute, "slot");
        assert!(options.duplicates_fatal());
    }

    #[test]
    fn test_allow_duplicates_overrides_uniqueness() {
        let options = ParseOptions::new().with_duplicate_slots(true);
        assert!(!options.duplicates_fatal());
    }

    #[test]
    fn test_min_above_max_rejected() {
        let options = ParseOptions::new().with_min_slots(3).with_max_slots(2);
        assert!(matches!(
            options.check(),
            Err(TemplateParsingError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let options: ParseOptions = toml::from_str("allow_duplicate_slots = true").unwrap();
        assert!(options.allow_duplicate_slots);
        assert!(options.validate_style);
    }
}
