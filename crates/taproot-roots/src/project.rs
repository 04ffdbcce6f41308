use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use taproot_xml::Element;

use crate::extension::{ExtensionKind, ExtensionRegistry};
use crate::ids::{ModuleId, ModuleRef, ProjectId};
use crate::library::LibraryTable;
use crate::model::RootModel;
use crate::order::{OrderEntry, OrderEntryKind};
use crate::pointers::FilePointerManager;

static NEXT_PROJECT_ID: AtomicU32 = AtomicU32::new(0);

/// Delivered to project listeners after a commit changed a module's roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootsChanged {
    pub module: ModuleRef,
    pub order_changed: bool,
    pub content_changed: bool,
    /// Ids of the extensions whose committed state changed.
    pub extensions: Vec<String>,
}

/// A module together with its committed root model.
#[derive(Debug)]
pub struct ModuleRootManager {
    module: ModuleRef,
    root_model: RootModel,
}

impl ModuleRootManager {
    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    pub fn root_model(&self) -> &RootModel {
        &self.root_model
    }
}

type Listener = Box<dyn FnMut(&RootsChanged)>;

/// Owns the modules of one project and everything their root models share:
/// extension providers, file pointers, libraries and the project SDK.
pub struct Project {
    id: ProjectId,
    name: String,
    registry: ExtensionRegistry,
    pointers: FilePointerManager,
    libraries: LibraryTable,
    sdk_name: Option<String>,
    modules: Vec<ModuleRootManager>,
    next_module_id: u32,
    listeners: Vec<Listener>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId(NEXT_PROJECT_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            registry: ExtensionRegistry::new(),
            pointers: FilePointerManager::new(),
            libraries: LibraryTable::new(),
            sdk_name: None,
            modules: Vec::new(),
            next_module_id: 0,
            listeners: Vec::new(),
        }
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// # Panics
    ///
    /// Panics once a module exists: every root model holds one extension per provider.
    pub fn register_extension(&mut self, id: impl Into<String>, kind: ExtensionKind) {
        assert!(
            self.modules.is_empty(),
            "extensions must be registered before modules are added to `{}`",
            self.name
        );
        self.registry.register(id, kind);
    }

    pub fn extension_registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn file_pointers(&self) -> &FilePointerManager {
        &self.pointers
    }

    pub fn libraries(&self) -> &LibraryTable {
        &self.libraries
    }

    pub fn libraries_mut(&mut self) -> &mut LibraryTable {
        &mut self.libraries
    }

    /// The project SDK inherited by [`OrderEntryKind::InheritedSdk`] entries.
    pub fn sdk_name(&self) -> Option<&str> {
        self.sdk_name.as_deref()
    }

    pub fn set_sdk_name(&mut self, name: Option<String>) {
        self.sdk_name = name;
    }

    /// Adds a module with a fresh root model.
    ///
    /// # Panics
    ///
    /// Panics when a module with the same name exists.
    pub fn add_module(&mut self, name: &str) -> ModuleRef {
        let module = self.allocate_module(name);
        let root_model = RootModel::new(module.clone(), self);
        self.modules.push(ModuleRootManager {
            module: module.clone(),
            root_model,
        });
        module
    }

    /// Adds a module whose roots are read from its persisted component element.
    pub fn load_module(&mut self, name: &str, component: &Element) -> ModuleRef {
        let module = self.allocate_module(name);
        let root_model = RootModel::read_external(module.clone(), component, self);
        tracing::debug!(
            target: "taproot.roots",
            project = %self.name,
            module = %module.name,
            entries = root_model.order_entries().len(),
            "loaded module roots"
        );
        self.modules.push(ModuleRootManager {
            module: module.clone(),
            root_model,
        });
        module
    }

    /// Removes a module and disposes its root model.
    pub fn remove_module(&mut self, id: ModuleId) -> Option<ModuleRef> {
        let position = self.modules.iter().position(|manager| manager.module.id == id)?;
        let mut manager = self.modules.remove(position);
        manager.root_model.dispose();
        Some(manager.module)
    }

    pub fn find_module(&self, name: &str) -> Option<&ModuleRef> {
        self.modules
            .iter()
            .map(|manager| &manager.module)
            .find(|module| module.name == name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleRootManager> {
        self.modules.iter()
    }

    /// The committed, read-only root model of a module.
    pub fn root_model(&self, id: ModuleId) -> Option<&RootModel> {
        self.manager(id).map(|manager| &manager.root_model)
    }

    /// A writable copy of a module's root model. Apply it with [`Project::commit`]
    /// or drop it (after [`RootModel::dispose`] when callbacks were registered).
    pub fn modifiable_model(&self, id: ModuleId) -> Option<RootModel> {
        self.root_model(id).map(RootModel::modifiable_copy)
    }

    /// Applies an edited copy onto the module's committed model and makes the
    /// copy read-only. Listeners hear about it when anything changed.
    ///
    /// # Panics
    ///
    /// Panics when `model` is not writable or its module is not part of this project.
    pub fn commit(&mut self, model: &mut RootModel) -> Option<RootsChanged> {
        model.assert_writable();
        let module = model.module().clone();
        assert!(
            module.project == self.id,
            "module `{}` does not belong to project `{}`",
            module.name,
            self.name
        );
        let Some(manager) = self.modules.iter_mut().find(|manager| manager.module.id == module.id)
        else {
            panic!("module `{}` is not part of project `{}`", module.name, self.name);
        };

        let summary = model.apply_to(&mut manager.root_model);
        model.mark_committed();
        if summary.is_empty() {
            tracing::debug!(target: "taproot.roots", module = %module.name, "commit without changes");
            return None;
        }

        tracing::info!(
            target: "taproot.roots",
            module = %module.name,
            order_changed = summary.order_changed,
            content_changed = summary.content_changed,
            extensions = ?summary.extensions,
            "committed root model"
        );
        let event = RootsChanged {
            module,
            order_changed: summary.order_changed,
            content_changed: summary.content_changed,
            extensions: summary.extensions,
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
        Some(event)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&RootsChanged) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// The persisted component element of a module's committed roots.
    pub fn write_module(&self, id: ModuleId) -> Option<Element> {
        self.root_model(id).map(RootModel::to_element)
    }

    /// Whether `entry` of `model` resolves inside this project.
    pub fn is_entry_valid(&self, model: &RootModel, entry: &OrderEntry) -> bool {
        match entry.kind() {
            OrderEntryKind::ModuleSource => true,
            OrderEntryKind::Library(library) => library.is_valid(),
            OrderEntryKind::Module(dependency) => self.find_module(dependency.module_name()).is_some(),
            OrderEntryKind::ModuleExtensionSdk(_) => model.sdk_name_of(entry).is_some(),
            OrderEntryKind::InheritedSdk => self.sdk_name.is_some(),
        }
    }

    /// SDK used by a module: the name behind its first SDK entry, taken from
    /// the extension state or the project SDK.
    pub fn module_sdk_name(&self, id: ModuleId) -> Option<&str> {
        let model = self.root_model(id)?;
        let entry = model.first_sdk_entry()?;
        match entry.kind() {
            OrderEntryKind::InheritedSdk => self.sdk_name(),
            _ => model.sdk_name_of(entry),
        }
    }

    fn manager(&self, id: ModuleId) -> Option<&ModuleRootManager> {
        self.modules.iter().find(|manager| manager.module.id == id)
    }

    fn allocate_module(&mut self, name: &str) -> ModuleRef {
        assert!(
            self.find_module(name).is_none(),
            "module `{name}` already exists in project `{}`",
            self.name
        );
        let id = ModuleId(self.next_module_id);
        self.next_module_id += 1;
        ModuleRef {
            project: self.id,
            id,
            name: name.to_owned(),
        }
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("modules", &self.modules)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
