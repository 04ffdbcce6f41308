//! Module root models for Taproot projects.
//!
//! A [`Project`] owns its modules. Each module has a committed, read-only
//! [`RootModel`]:
//! - content entries (content roots with source and excluded folders)
//! - order entries (module source, libraries, other modules, SDKs)
//! - module extension states
//!
//! Edits go through [`Project::modifiable_model`] and [`Project::commit`].

mod compare;
mod content;
mod disposer;
mod extension;
mod ids;
mod library;
mod model;
mod order;
mod order_list;
mod pointers;
mod project;

pub use content::{ContentEntry, SourceFolder};
pub use disposer::CompositeDisposable;
pub use extension::{
    ExtensionKind, ExtensionProvider, ExtensionRegistry, ExtensionState, ModuleExtension,
};
pub use ids::{ModuleId, ModuleRef, OrderEntryId, ProjectId};
pub use library::{Library, LibraryLevel, LibraryTable};
pub use model::{RootModel, COMPONENT_ELEMENT, ROOT_MANAGER_COMPONENT};
pub use order::{
    DependencyScope, LibraryEntry, ModuleEntry, ModuleExtensionSdkEntry, OrderEntry,
    OrderEntryKind, OrderEntryType, OrderRootType, RootUrls,
};
pub use order_list::RearrangeError;
pub use pointers::{FilePointer, FilePointerManager};
pub use project::{ModuleRootManager, Project, RootsChanged};
