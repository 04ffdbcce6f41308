//! Order entries: the dependency descriptors that make up a module's
//! resolution order.

use std::collections::BTreeMap;
use std::fmt;

use taproot_xml::Element;

use crate::ids::OrderEntryId;
use crate::library::{Library, LibraryLevel, LibraryTable, LIBRARY_ELEMENT};

pub(crate) const ORDER_ENTRY_ELEMENT: &str = "orderEntry";

const TYPE_ATTR: &str = "type";
const NAME_ATTR: &str = "name";
const LEVEL_ATTR: &str = "level";
const EXPORTED_ATTR: &str = "exported";
const SCOPE_ATTR: &str = "scope";
const MODULE_NAME_ATTR: &str = "module-name";
const PRODUCTION_ON_TEST_ATTR: &str = "production-on-test";
const EXTENSION_ID_ATTR: &str = "extension-id";
const FOR_TESTS_ATTR: &str = "forTests";

const MODULE_SOURCE_TYPE: &str = "sourceFolder";
const LIBRARY_TYPE: &str = "library";
const MODULE_LIBRARY_TYPE: &str = "module-library";
const MODULE_TYPE: &str = "module";
const MODULE_EXTENSION_SDK_TYPE: &str = "module-extension-sdk";
const INHERITED_SDK_TYPE: &str = "inheritedSdk";

/// Classification of root URLs an order entry contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderRootType {
    Classes,
    Sources,
    Documentation,
}

impl OrderRootType {
    pub const ALL: [OrderRootType; 3] = [
        OrderRootType::Classes,
        OrderRootType::Sources,
        OrderRootType::Documentation,
    ];

    pub(crate) fn element_name(self) -> &'static str {
        match self {
            OrderRootType::Classes => "CLASSES",
            OrderRootType::Sources => "SOURCES",
            OrderRootType::Documentation => "JAVADOC",
        }
    }
}

pub type RootUrls = BTreeMap<OrderRootType, Vec<String>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DependencyScope {
    #[default]
    Compile,
    Test,
    Runtime,
    Provided,
}

impl DependencyScope {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyScope::Compile => "COMPILE",
            DependencyScope::Test => "TEST",
            DependencyScope::Runtime => "RUNTIME",
            DependencyScope::Provided => "PROVIDED",
        }
    }

    /// Unknown values fall back to [`DependencyScope::Compile`].
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "TEST" => DependencyScope::Test,
            "RUNTIME" => DependencyScope::Runtime,
            "PROVIDED" => DependencyScope::Provided,
            _ => DependencyScope::Compile,
        }
    }
}

/// Discriminant of [`OrderEntryKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEntryType {
    ModuleSource,
    Library,
    Module,
    ModuleExtensionSdk,
    InheritedSdk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    name: String,
    level: LibraryLevel,
    exported: bool,
    scope: DependencyScope,
    /// Snapshot of the library roots; `None` for an unresolved library.
    roots: Option<RootUrls>,
}

impl LibraryEntry {
    pub fn resolved(library: &Library) -> Self {
        Self {
            name: library.name().to_owned(),
            level: library.level(),
            exported: false,
            scope: DependencyScope::Compile,
            roots: Some(library.roots().clone()),
        }
    }

    pub fn unresolved(name: impl Into<String>, level: LibraryLevel) -> Self {
        Self {
            name: name.into(),
            level,
            exported: false,
            scope: DependencyScope::Compile,
            roots: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LibraryLevel {
        self.level
    }

    pub fn is_valid(&self) -> bool {
        self.roots.is_some()
    }

    pub fn urls(&self, root_type: OrderRootType) -> &[String] {
        self.roots
            .as_ref()
            .and_then(|roots| roots.get(&root_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn to_library(&self) -> Library {
        let mut library = Library::new(self.name.as_str(), self.level);
        for root_type in OrderRootType::ALL {
            for url in self.urls(root_type) {
                library.add_root(root_type, url.as_str());
            }
        }
        library
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    module_name: String,
    exported: bool,
    scope: DependencyScope,
    production_on_test: bool,
}

impl ModuleEntry {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            exported: false,
            scope: DependencyScope::Compile,
            production_on_test: false,
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn is_production_on_test(&self) -> bool {
        self.production_on_test
    }
}

/// SDK supplied by a module extension. The SDK name lives in the extension state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExtensionSdkEntry {
    extension_id: String,
}

impl ModuleExtensionSdkEntry {
    pub fn new(extension_id: impl Into<String>) -> Self {
        Self {
            extension_id: extension_id.into(),
        }
    }

    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEntryKind {
    /// The module's own sources; exactly one per model.
    ModuleSource,
    Library(LibraryEntry),
    Module(ModuleEntry),
    ModuleExtensionSdk(ModuleExtensionSdkEntry),
    /// The project SDK.
    InheritedSdk,
}

impl OrderEntryKind {
    pub fn entry_type(&self) -> OrderEntryType {
        match self {
            OrderEntryKind::ModuleSource => OrderEntryType::ModuleSource,
            OrderEntryKind::Library(_) => OrderEntryType::Library,
            OrderEntryKind::Module(_) => OrderEntryType::Module,
            OrderEntryKind::ModuleExtensionSdk(_) => OrderEntryType::ModuleExtensionSdk,
            OrderEntryKind::InheritedSdk => OrderEntryType::InheritedSdk,
        }
    }

    /// `Some(exported)` for entries that can be re-exported to dependents.
    pub fn exported(&self) -> Option<bool> {
        match self {
            OrderEntryKind::Library(entry) => Some(entry.exported),
            OrderEntryKind::Module(entry) => Some(entry.exported),
            _ => None,
        }
    }

    pub fn scope(&self) -> Option<DependencyScope> {
        match self {
            OrderEntryKind::Library(entry) => Some(entry.scope),
            OrderEntryKind::Module(entry) => Some(entry.scope),
            _ => None,
        }
    }

    pub(crate) fn set_exported(&mut self, exported: bool) -> bool {
        match self {
            OrderEntryKind::Library(entry) => entry.exported = exported,
            OrderEntryKind::Module(entry) => entry.exported = exported,
            _ => return false,
        }
        true
    }

    pub(crate) fn set_scope(&mut self, scope: DependencyScope) -> bool {
        match self {
            OrderEntryKind::Library(entry) => entry.scope = scope,
            OrderEntryKind::Module(entry) => entry.scope = scope,
            _ => return false,
        }
        true
    }

    pub(crate) fn set_production_on_test(&mut self, production_on_test: bool) -> bool {
        match self {
            OrderEntryKind::Module(entry) => entry.production_on_test = production_on_test,
            _ => return false,
        }
        true
    }
}

/// One dependency descriptor together with its id and position in the owning list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEntry {
    id: OrderEntryId,
    index: usize,
    kind: OrderEntryKind,
}

impl OrderEntry {
    pub(crate) fn new(id: OrderEntryId, kind: OrderEntryKind) -> Self {
        Self { id, index: 0, kind }
    }

    pub fn id(&self) -> OrderEntryId {
        self.id
    }

    /// Offset of this entry in the owning order list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn kind(&self) -> &OrderEntryKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut OrderEntryKind {
        &mut self.kind
    }

    pub fn entry_type(&self) -> OrderEntryType {
        self.kind.entry_type()
    }

    pub fn presentable_name(&self) -> String {
        match &self.kind {
            OrderEntryKind::ModuleSource => "<Module source>".to_owned(),
            OrderEntryKind::Library(entry) => entry.name.clone(),
            OrderEntryKind::Module(entry) => entry.module_name.clone(),
            OrderEntryKind::ModuleExtensionSdk(entry) => format!("<{} SDK>", entry.extension_id),
            OrderEntryKind::InheritedSdk => "<Project SDK>".to_owned(),
        }
    }

    /// Appends this entry's `orderEntry` element to `parent`.
    pub(crate) fn write_external(&self, parent: &mut Element) {
        let mut element = Element::new(ORDER_ENTRY_ELEMENT);
        match &self.kind {
            OrderEntryKind::ModuleSource => {
                element.set_attribute(TYPE_ATTR, MODULE_SOURCE_TYPE);
                element.set_attribute(FOR_TESTS_ATTR, "false");
            }
            OrderEntryKind::Library(entry) if entry.level == LibraryLevel::Module => {
                element.set_attribute(TYPE_ATTR, MODULE_LIBRARY_TYPE);
                write_exportable(&mut element, entry.exported, entry.scope);
                element.add_child(entry.to_library().write_external());
            }
            OrderEntryKind::Library(entry) => {
                element.set_attribute(TYPE_ATTR, LIBRARY_TYPE);
                element.set_attribute(NAME_ATTR, entry.name.as_str());
                element.set_attribute(LEVEL_ATTR, entry.level.as_str());
                write_exportable(&mut element, entry.exported, entry.scope);
            }
            OrderEntryKind::Module(entry) => {
                element.set_attribute(TYPE_ATTR, MODULE_TYPE);
                element.set_attribute(MODULE_NAME_ATTR, entry.module_name.as_str());
                write_exportable(&mut element, entry.exported, entry.scope);
                if entry.production_on_test {
                    element.set_attribute(PRODUCTION_ON_TEST_ATTR, "");
                }
            }
            OrderEntryKind::ModuleExtensionSdk(entry) => {
                element.set_attribute(TYPE_ATTR, MODULE_EXTENSION_SDK_TYPE);
                element.set_attribute(EXTENSION_ID_ATTR, entry.extension_id.as_str());
            }
            OrderEntryKind::InheritedSdk => {
                element.set_attribute(TYPE_ATTR, INHERITED_SDK_TYPE);
            }
        }
        parent.add_child(element);
    }
}

fn write_exportable(element: &mut Element, exported: bool, scope: DependencyScope) {
    if exported {
        element.set_attribute(EXPORTED_ATTR, "");
    }
    if scope != DependencyScope::Compile {
        element.set_attribute(SCOPE_ATTR, scope.as_str());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum EntryReadError {
    #[error("missing `type` attribute")]
    MissingType,
    #[error("unknown order entry type `{0}`")]
    UnknownType(String),
    #[error("missing `{0}` attribute")]
    MissingAttribute(&'static str),
    #[error("unknown library level `{0}`")]
    UnknownLevel(String),
    #[error("module library without a `library` element")]
    MissingLibrary,
}

/// Builds an entry kind from an `orderEntry` element.
///
/// Project and application libraries are resolved against `libraries` by
/// name; a library that is not found becomes an unresolved entry.
pub(crate) fn read_order_entry(
    element: &Element,
    libraries: &LibraryTable,
) -> Result<OrderEntryKind, EntryReadError> {
    let entry_type = element.attribute(TYPE_ATTR).ok_or(EntryReadError::MissingType)?;
    let exported = element.has_attribute(EXPORTED_ATTR);
    let scope = element
        .attribute(SCOPE_ATTR)
        .map(DependencyScope::parse)
        .unwrap_or_default();

    let kind = match entry_type {
        MODULE_SOURCE_TYPE => OrderEntryKind::ModuleSource,
        LIBRARY_TYPE => {
            let name = required(element, NAME_ATTR)?;
            let level = match element.attribute(LEVEL_ATTR) {
                Some(level) => LibraryLevel::parse(level)
                    .ok_or_else(|| EntryReadError::UnknownLevel(level.to_owned()))?,
                None => LibraryLevel::Project,
            };
            let entry = match libraries.get(level, name) {
                Some(library) => LibraryEntry::resolved(library),
                None => LibraryEntry::unresolved(name, level),
            };
            OrderEntryKind::Library(LibraryEntry {
                exported,
                scope,
                ..entry
            })
        }
        MODULE_LIBRARY_TYPE => {
            let library = element
                .child(LIBRARY_ELEMENT)
                .and_then(|library| Library::read_external(library, LibraryLevel::Module))
                .ok_or(EntryReadError::MissingLibrary)?;
            OrderEntryKind::Library(LibraryEntry {
                exported,
                scope,
                ..LibraryEntry::resolved(&library)
            })
        }
        MODULE_TYPE => OrderEntryKind::Module(ModuleEntry {
            module_name: required(element, MODULE_NAME_ATTR)?.to_owned(),
            exported,
            scope,
            production_on_test: element.has_attribute(PRODUCTION_ON_TEST_ATTR),
        }),
        MODULE_EXTENSION_SDK_TYPE => OrderEntryKind::ModuleExtensionSdk(
            ModuleExtensionSdkEntry::new(required(element, EXTENSION_ID_ATTR)?),
        ),
        INHERITED_SDK_TYPE => OrderEntryKind::InheritedSdk,
        other => return Err(EntryReadError::UnknownType(other.to_owned())),
    };
    Ok(kind)
}

fn required<'a>(element: &'a Element, name: &'static str) -> Result<&'a str, EntryReadError> {
    element
        .attribute(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(EntryReadError::MissingAttribute(name))
}

impl fmt::Display for OrderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.presentable_name())
    }
}
