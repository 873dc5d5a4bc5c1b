//! Startup population of the type registry
//!
//! Each collaborating module exposes a [`DiscoveryModule`] whose `register`
//! entry point adds its layouts, widget types and themes. [`Discovery`]
//! invokes the modules in the order they were added; a failing module is
//! reported and never stops the others.

use thiserror::Error;
use tracing::{debug, warn};

use super::descriptor::{Descriptor, ManifestError};
use super::registry::{RegisterOutcome, RegistryError, TypeRegistry};
use crate::error::{Diagnostic, DiagnosticCategory, TemplateParsingError};
use crate::template::{parse_template, ParseOptions, TemplateDocument};
use crate::theme::ThemeError;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Template(#[from] TemplateParsingError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("{message}")]
    Module { message: String },
}

impl DiscoveryError {
    pub fn module(message: impl Into<String>) -> Self {
        Self::Module {
            message: message.into(),
        }
    }
}

/// Registration handle given to a module; records replaced entries
pub struct Registrar<'r> {
    registry: &'r TypeRegistry,
    module: String,
    registered: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'r> Registrar<'r> {
    fn new(registry: &'r TypeRegistry, module: &str) -> Self {
        Self {
            registry,
            module: module.to_string(),
            registered: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn register(&mut self, descriptor: impl Into<Descriptor>) -> RegisterOutcome {
        let descriptor = descriptor.into();
        let kind = descriptor.kind();
        let name = descriptor.name().to_string();

        let outcome = self.registry.register(descriptor);
        self.registered += 1;
        if outcome == RegisterOutcome::Replaced {
            self.diagnostics.push(Diagnostic::warning(
                DiagnosticCategory::ReplacedEntry,
                format!("{} '{}' re-registered by module '{}'", kind, name, self.module),
                None,
            ));
        }
        outcome
    }

    /// Parse a template and register the layout it describes
    pub fn register_template(
        &mut self,
        name: &str,
        source: &str,
        options: &ParseOptions,
    ) -> Result<RegisterOutcome, TemplateParsingError> {
        let layout = parse_template(&TemplateDocument::new(name, source), options)?;
        Ok(self.register(layout))
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }
}

/// A collaborating module that contributes descriptors at startup
pub trait DiscoveryModule {
    fn name(&self) -> &str;

    fn register(&self, registrar: &mut Registrar<'_>) -> Result<(), DiscoveryError>;
}

/// A discovery module backed by a closure
pub struct FnModule<F> {
    name: String,
    f: F,
}

impl<F> FnModule<F>
where
    F: Fn(&mut Registrar<'_>) -> Result<(), DiscoveryError>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> DiscoveryModule for FnModule<F>
where
    F: Fn(&mut Registrar<'_>) -> Result<(), DiscoveryError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, registrar: &mut Registrar<'_>) -> Result<(), DiscoveryError> {
        (self.f)(registrar)
    }
}

/// A module that failed during discovery
#[derive(Debug)]
pub struct ModuleFailure {
    pub module: String,
    pub error: DiscoveryError,
}

/// Outcome of a discovery pass
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Modules that completed, in invocation order
    pub modules: Vec<String>,
    pub failures: Vec<ModuleFailure>,
    /// Number of descriptors registered, failed modules included
    pub registered: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl DiscoveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Startup orchestrator over an explicit list of modules
#[derive(Default)]
pub struct Discovery {
    modules: Vec<Box<dyn DiscoveryModule>>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: impl DiscoveryModule + 'static) -> Self {
        self.add(module);
        self
    }

    pub fn add(&mut self, module: impl DiscoveryModule + 'static) {
        self.modules.push(Box::new(module));
    }

    /// Invoke every module's entry point against `registry`
    pub fn run(&self, registry: &TypeRegistry) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for module in &self.modules {
            let mut registrar = Registrar::new(registry, module.name());
            let result = module.register(&mut registrar);

            report.registered += registrar.registered;
            report.diagnostics.append(&mut registrar.diagnostics);

            match result {
                Ok(()) => {
                    debug!(module = module.name(), registered = registrar.registered, "module registered");
                    report.modules.push(module.name().to_string());
                }
                Err(error) => {
                    warn!(module = module.name(), error = %error, "module failed during discovery");
                    report.failures.push(ModuleFailure {
                        module: module.name().to_string(),
                        error,
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WidgetTypeDescriptor;

    #[test]
    fn test_modules_run_in_order_and_failures_isolated() {
        let discovery = Discovery::new()
            .with_module(FnModule::new("widgets", |r: &mut Registrar<'_>| {
                r.register(WidgetTypeDescriptor::new("text", "text"));
                Ok(())
            }))
            .with_module(FnModule::new("broken", |_: &mut Registrar<'_>| {
                Err(DiscoveryError::module("boom"))
            }))
            .with_module(FnModule::new("layouts", |r: &mut Registrar<'_>| {
                r.register_template("home", r#"<div slot="main"></div>"#, &ParseOptions::default())?;
                Ok(())
            }));

        let registry = TypeRegistry::new();
        let report = discovery.run(&registry);

        assert_eq!(report.modules, vec!["widgets", "layouts"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].module, "broken");
        assert_eq!(report.registered, 2);
        assert!(registry.layout("home").is_some());
    }

    #[test]
    fn test_replaced_entries_reported() {
        let module = |target: &'static str| {
            FnModule::new(target, move |r: &mut Registrar<'_>| {
                r.register(WidgetTypeDescriptor::new("text", target));
                Ok(())
            })
        };
        let registry = TypeRegistry::new();
        let report = Discovery::new()
            .with_module(module("first"))
            .with_module(module("second"))
            .run(&registry);

        assert!(report.is_clean());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].category, DiagnosticCategory::ReplacedEntry);
        assert_eq!(registry.widget("text").unwrap().rendering_target, "second");
    }

    #[test]
    fn test_register_template_through_registrar() {
        let registry = TypeRegistry::new();
        let report = Discovery::new()
            .with_module(FnModule::new("layouts", |r: &mut Registrar<'_>| {
                let options = ParseOptions::default();
                r.register_template("home", r#"<div slot="main"></div>"#, &options)?;
                r.register_template("home", r#"<div slot="a"></div><div slot="b"></div>"#, &options)?;
                r.register_template("bad", r#"<div slot="a"></span>"#, &options)?;
                Ok(())
            }))
            .run(&registry);

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, DiscoveryError::Template(_)));
        assert_eq!(report.registered, 2);
        assert_eq!(report.diagnostics[0].category, DiagnosticCategory::ReplacedEntry);
        assert_eq!(registry.layout("home").unwrap().slot_manifest.names(), vec!["a", "b"]);
        assert!(registry.layout("bad").is_none());
    }
}
