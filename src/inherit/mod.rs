//! Page inheritance: pages, override records and the resolver that turns a
//! page plus its ancestors into an effective composition

mod composition;
mod page;
mod resolver;
mod tree;

pub use composition::{CompositionWarning, EffectiveComposition, ResolvedWidget};
pub use page::{OverrideRecord, Page, PageId, WidgetId, WidgetInstance};
pub use resolver::{resolve_with_snapshot, InheritanceResolver, ResolveError, ResolverConfig};
pub use tree::{PageTree, PageTreeError};
