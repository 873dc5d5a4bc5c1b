//! Type registry for layouts, widget types and themes

mod descriptor;
mod discovery;
#[allow(clippy::module_inception)]
mod registry;

pub use descriptor::{
    humanize, Descriptor, LayoutDescriptor, LayoutSource, ManifestError, SlotDescriptor,
    SlotManifest, WidgetConfig, WidgetTypeDescriptor,
};
pub(crate) use descriptor::slot_selector;
pub use discovery::{
    Discovery, DiscoveryError, DiscoveryModule, DiscoveryReport, FnModule, ModuleFailure,
    Registrar,
};
pub use registry::{RegisterOutcome, RegistryError, RegistrySnapshot, TypeRegistry};
