//! A module's roots: content entries, the dependency order and extension states.
//!
//! The model a [`Project`] keeps per module is read-only. Editing happens on a
//! [`RootModel::modifiable_copy`], which remembers what it was copied from so
//! [`RootModel::is_changed`] can answer without reaching back into the source.
//! [`Project::commit`] applies the copy onto the live source model.

use std::sync::Arc;

use taproot_xml::Element;

use crate::compare::{self, extension_sdk_name, RootsView};
use crate::content::{ContentEntry, ContentKey, CONTENT_ELEMENT};
use crate::disposer::CompositeDisposable;
use crate::extension::ModuleExtension;
use crate::ids::{ModuleRef, OrderEntryId};
use crate::library::{Library, LibraryLevel};
use crate::order::{
    read_order_entry, DependencyScope, LibraryEntry, ModuleEntry, ModuleExtensionSdkEntry,
    OrderEntry, OrderEntryKind, OrderEntryType, OrderRootType, ORDER_ENTRY_ELEMENT,
};
use crate::order_list::{OrderList, RearrangeError};
use crate::pointers::FilePointerManager;
use crate::project::Project;

pub const COMPONENT_ELEMENT: &str = "component";
pub const ROOT_MANAGER_COMPONENT: &str = "NewModuleRootManager";

/// The source state a modifiable copy was made from.
#[derive(Debug)]
struct Baseline {
    order: Arc<[OrderEntry]>,
    content: Vec<ContentKey>,
    extensions: Vec<ModuleExtension>,
}

/// What [`RootModel::apply_to`] changed in the source model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CommitSummary {
    pub(crate) order_changed: bool,
    pub(crate) content_changed: bool,
    pub(crate) extensions: Vec<String>,
}

impl CommitSummary {
    pub(crate) fn is_empty(&self) -> bool {
        !self.order_changed && !self.content_changed && self.extensions.is_empty()
    }
}

/// Parts of a modifiable copy edited since it was made.
#[derive(Debug, Clone, Copy, Default)]
struct Edits {
    order: bool,
    content: bool,
}

#[derive(Debug)]
pub struct RootModel {
    module: ModuleRef,
    pointers: FilePointerManager,
    content: Vec<ContentEntry>,
    order: OrderList,
    extensions: Vec<ModuleExtension>,
    baseline: Option<Baseline>,
    next_entry_id: u32,
    writable: bool,
    disposables: CompositeDisposable,
}

impl RootModel {
    /// A fresh read-only model: no content, a module source entry and one
    /// disabled extension per provider registered with `project`.
    pub fn new(module: ModuleRef, project: &Project) -> Self {
        let extensions = project
            .extension_registry()
            .providers()
            .iter()
            .map(ModuleExtension::from_provider)
            .collect();
        let mut model = Self {
            module,
            pointers: project.file_pointers().clone(),
            content: Vec::new(),
            order: OrderList::default(),
            extensions,
            baseline: None,
            next_entry_id: 0,
            writable: false,
            disposables: CompositeDisposable::new(),
        };
        let id = model.allocate_id();
        model
            .order
            .push(OrderEntry::new(id, OrderEntryKind::ModuleSource));
        model
    }

    /// Rebuilds a read-only model from its persisted component element.
    ///
    /// Order entries that cannot be read are skipped. A missing module source
    /// entry is appended and duplicates of it are dropped.
    pub fn read_external(module: ModuleRef, component: &Element, project: &Project) -> Self {
        let mut model = Self::new(module, project);
        model.order.clear();

        for extension in &mut model.extensions {
            extension.load_state(component);
        }

        for element in component.children_named(CONTENT_ELEMENT) {
            let Some(entry) = ContentEntry::read_external(element, &model.pointers) else {
                tracing::warn!(
                    target: "taproot.roots",
                    module = %model.module.name,
                    "skipping content entry without url"
                );
                continue;
            };
            if model.content.iter().any(|existing| existing.url() == entry.url()) {
                continue;
            }
            model.content.push(entry);
        }

        for element in component.children_named(ORDER_ENTRY_ELEMENT) {
            let kind = match read_order_entry(element, project.libraries()) {
                Ok(kind) => kind,
                Err(err) => {
                    tracing::warn!(
                        target: "taproot.roots",
                        module = %model.module.name,
                        error = %err,
                        "skipping order entry"
                    );
                    continue;
                }
            };
            if let OrderEntryKind::Module(entry) = &kind {
                if entry.module_name() == model.module.name {
                    tracing::warn!(
                        target: "taproot.roots",
                        module = %model.module.name,
                        "skipping dependency of a module on itself"
                    );
                    continue;
                }
            }
            let id = model.allocate_id();
            model.order.push(OrderEntry::new(id, kind));
        }

        let mut has_module_source = false;
        model.order.retain(|entry| {
            if entry.entry_type() != OrderEntryType::ModuleSource {
                return true;
            }
            !std::mem::replace(&mut has_module_source, true)
        });
        if !has_module_source {
            let id = model.allocate_id();
            model
                .order
                .push(OrderEntry::new(id, OrderEntryKind::ModuleSource));
        }
        model
    }

    /// A writable deep copy. Content entries get new file pointers; order
    /// entries keep their ids.
    ///
    /// # Panics
    ///
    /// Panics when the model has been disposed.
    pub fn modifiable_copy(&self) -> RootModel {
        self.assert_not_disposed();
        let mut order = OrderList::default();
        order.replace_all(self.order.iter().cloned());
        RootModel {
            module: self.module.clone(),
            pointers: self.pointers.clone(),
            content: self.content.clone(),
            order,
            extensions: self.extensions.clone(),
            baseline: Some(Baseline {
                order: self.order.snapshot(),
                content: self.content_keys(),
                extensions: self.extensions.clone(),
            }),
            next_entry_id: self.next_entry_id,
            writable: true,
            disposables: CompositeDisposable::new(),
        }
    }

    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_disposed(&self) -> bool {
        self.disposables.is_disposed()
    }

    /// Writes extension states, content entries and order entries as children of `parent`.
    pub fn write_external(&self, parent: &mut Element) {
        for extension in &self.extensions {
            if let Some(state) = extension.state_element() {
                parent.add_child(state);
            }
        }
        for entry in self.content_entries() {
            parent.add_child(entry.write_external());
        }
        for entry in self.order.iter() {
            entry.write_external(parent);
        }
    }

    /// `<component name="NewModuleRootManager">` holding [`RootModel::write_external`].
    pub fn to_element(&self) -> Element {
        let mut component =
            Element::new(COMPONENT_ELEMENT).with_attribute("name", ROOT_MANAGER_COMPONENT);
        self.write_external(&mut component);
        component
    }

    // ---- content ----

    /// Content entries ordered by URL.
    pub fn content_entries(&self) -> Vec<&ContentEntry> {
        let mut entries: Vec<_> = self.content.iter().collect();
        entries.sort_by_cached_key(|entry| entry.url());
        entries
    }

    pub fn content_entry(&self, url: &str) -> Option<&ContentEntry> {
        self.content.iter().find(|entry| entry.url() == url)
    }

    /// Adds a content root, or returns the existing entry with the same URL.
    pub fn add_content_entry(&mut self, url: &str) -> &mut ContentEntry {
        self.assert_writable();
        let position = match self.content.iter().position(|entry| entry.url() == url) {
            Some(position) => position,
            None => {
                self.content.push(ContentEntry::new(&self.pointers, url));
                self.content.len() - 1
            }
        };
        &mut self.content[position]
    }

    pub fn content_entry_mut(&mut self, url: &str) -> Option<&mut ContentEntry> {
        self.assert_writable();
        self.content.iter_mut().find(|entry| entry.url() == url)
    }

    pub fn remove_content_entry(&mut self, url: &str) -> bool {
        self.assert_writable();
        let before = self.content.len();
        self.content.retain(|entry| entry.url() != url);
        self.content.len() != before
    }

    // ---- order entries ----

    /// Materialized view of the order entries, shared until the next write.
    pub fn order_entries(&self) -> Arc<[OrderEntry]> {
        self.order.snapshot()
    }

    pub fn order_entry(&self, id: OrderEntryId) -> Option<&OrderEntry> {
        self.order.get(id)
    }

    /// Appends a new entry and returns its id.
    ///
    /// # Panics
    ///
    /// Panics when the model is read-only or `kind` would add a second module
    /// source entry.
    pub fn add_order_entry(&mut self, kind: OrderEntryKind) -> OrderEntryId {
        self.assert_writable();
        if kind.entry_type() == OrderEntryType::ModuleSource {
            assert!(
                self.order
                    .iter()
                    .all(|entry| entry.entry_type() != OrderEntryType::ModuleSource),
                "module `{}` already has a module source entry",
                self.module.name
            );
        }
        let id = self.allocate_id();
        self.order.push(OrderEntry::new(id, kind));
        id
    }

    /// Re-inserts an entry taken from this model or its source, keeping its id.
    ///
    /// # Panics
    ///
    /// Panics when an entry with the same id is already present.
    pub fn restore_order_entry(&mut self, entry: OrderEntry) {
        self.assert_writable();
        assert!(
            !self.order.contains(entry.id()),
            "order entry {entry} is already present"
        );
        assert!(
            entry.entry_type() != OrderEntryType::ModuleSource,
            "module `{}` already has a module source entry",
            self.module.name
        );
        self.next_entry_id = self.next_entry_id.max(entry.id().0 + 1);
        self.order.push(entry);
    }

    pub fn add_library_entry(&mut self, library: &Library) -> OrderEntryId {
        self.add_order_entry(OrderEntryKind::Library(LibraryEntry::resolved(library)))
    }

    /// An entry naming a library that is not defined (yet).
    pub fn add_invalid_library(&mut self, name: &str, level: LibraryLevel) -> OrderEntryId {
        self.add_order_entry(OrderEntryKind::Library(LibraryEntry::unresolved(name, level)))
    }

    /// Adds an SDK entry backed by the extension `extension_id`, after the last
    /// SDK entry or else right after the module source entry.
    ///
    /// # Panics
    ///
    /// Panics when no extension with that id carries an SDK.
    pub fn add_module_extension_sdk_entry(&mut self, extension_id: &str) -> OrderEntryId {
        self.assert_writable();
        assert!(
            self.extension_without_check(extension_id)
                .is_some_and(ModuleExtension::carries_sdk),
            "extension `{extension_id}` does not carry an SDK"
        );
        let id = self.allocate_id();
        self.order.insert_sdk(OrderEntry::new(
            id,
            OrderEntryKind::ModuleExtensionSdk(ModuleExtensionSdkEntry::new(extension_id)),
        ));
        id
    }

    /// # Panics
    ///
    /// Panics for a dependency on the model's own module or on a module of another project.
    pub fn add_module_order_entry(&mut self, module: &ModuleRef) -> OrderEntryId {
        assert!(
            module.project == self.module.project,
            "module `{}` belongs to another project than `{}`",
            module.name,
            self.module.name
        );
        assert!(
            module.id != self.module.id,
            "module `{}` cannot depend on itself",
            module.name
        );
        self.add_order_entry(OrderEntryKind::Module(ModuleEntry::new(module.name.as_str())))
    }

    /// An entry naming a module that does not exist (yet).
    pub fn add_invalid_module_entry(&mut self, name: &str) -> OrderEntryId {
        assert!(
            name != self.module.name,
            "module `{name}` cannot depend on itself"
        );
        self.add_order_entry(OrderEntryKind::Module(ModuleEntry::new(name)))
    }

    /// # Panics
    ///
    /// Panics when `id` is unknown or names the module source entry.
    pub fn remove_order_entry(&mut self, id: OrderEntryId) -> OrderEntry {
        self.assert_writable();
        let is_module_source = match self.order.get(id) {
            Some(entry) => entry.entry_type() == OrderEntryType::ModuleSource,
            None => panic!("order entry {id} is not in module `{}`", self.module.name),
        };
        assert!(
            !is_module_source,
            "the module source entry of `{}` cannot be removed",
            self.module.name
        );
        match self.order.remove_entry(id) {
            Some(entry) => entry,
            None => unreachable!("order entry {id} was looked up above"),
        }
    }

    /// Reorders the entries. `order` must be a permutation of the current ids.
    pub fn rearrange_order_entries(&mut self, order: &[OrderEntryId]) -> Result<(), RearrangeError> {
        self.assert_writable();
        self.order.rearrange(order)
    }

    /// Replaces the first entry of `entry_type` in place. Without such an
    /// entry the replacement goes to the front; `None` removes the entry.
    pub fn replace_entry_of_type(
        &mut self,
        entry_type: OrderEntryType,
        replacement: Option<OrderEntryKind>,
    ) -> Option<OrderEntryId> {
        self.assert_writable();
        assert!(
            entry_type != OrderEntryType::ModuleSource
                && replacement
                    .as_ref()
                    .map_or(true, |kind| kind.entry_type() != OrderEntryType::ModuleSource),
            "the module source entry of `{}` cannot be replaced",
            self.module.name
        );
        let position = self
            .order
            .iter()
            .position(|entry| entry.entry_type() == entry_type);
        match (position, replacement) {
            (Some(position), Some(kind)) => {
                self.order.remove(position);
                let id = self.allocate_id();
                self.order.insert(position, OrderEntry::new(id, kind));
                Some(id)
            }
            (Some(position), None) => {
                self.order.remove(position);
                None
            }
            (None, Some(kind)) => {
                let id = self.allocate_id();
                self.order.insert(0, OrderEntry::new(id, kind));
                Some(id)
            }
            (None, None) => None,
        }
    }

    /// Returns `false` when the entry cannot be exported.
    pub fn set_exported(&mut self, id: OrderEntryId, exported: bool) -> bool {
        self.update_entry(id, |kind| kind.set_exported(exported))
    }

    /// Returns `false` when the entry has no scope.
    pub fn set_scope(&mut self, id: OrderEntryId, scope: DependencyScope) -> bool {
        self.update_entry(id, |kind| kind.set_scope(scope))
    }

    /// Returns `false` for anything but a module entry.
    pub fn set_production_on_test(&mut self, id: OrderEntryId, production_on_test: bool) -> bool {
        self.update_entry(id, |kind| kind.set_production_on_test(production_on_test))
    }

    fn update_entry(&mut self, id: OrderEntryId, update: impl FnOnce(&mut OrderEntryKind) -> bool) -> bool {
        self.assert_writable();
        match self.order.update(id, |entry| update(entry.kind_mut())) {
            Some(updated) => updated,
            None => panic!("order entry {id} is not in module `{}`", self.module.name),
        }
    }

    /// Drops every content entry and every order entry except a new module source entry.
    pub fn clear(&mut self) {
        self.assert_writable();
        self.content.clear();
        self.order.clear();
        let id = self.allocate_id();
        self.order
            .push(OrderEntry::new(id, OrderEntryKind::ModuleSource));
    }

    // ---- lookups ----

    pub fn find_library_order_entry(&self, library: &Library) -> Option<&OrderEntry> {
        self.order.iter().find(|entry| match entry.kind() {
            OrderEntryKind::Library(lib) => {
                lib.name() == library.name() && lib.level() == library.level()
            }
            _ => false,
        })
    }

    pub fn find_module_extension_sdk_entry(&self, extension_id: &str) -> Option<&OrderEntry> {
        self.order.iter().find(|entry| match entry.kind() {
            OrderEntryKind::ModuleExtensionSdk(sdk) => sdk.extension_id() == extension_id,
            _ => false,
        })
    }

    /// Whether a direct module entry points at `module`. Transitive
    /// dependencies are not followed.
    pub fn is_depends_on(&self, module: &ModuleRef) -> bool {
        module.project == self.module.project
            && self.order.iter().any(|entry| match entry.kind() {
                OrderEntryKind::Module(dependency) => dependency.module_name() == module.name,
                _ => false,
            })
    }

    pub fn module_dependency_names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|entry| match entry.kind() {
                OrderEntryKind::Module(dependency) => Some(dependency.module_name().to_owned()),
                _ => None,
            })
            .collect()
    }

    /// SDK name of the first SDK entry, resolved or not. When that entry is the
    /// inherited SDK this is `None`; [`Project::module_sdk_name`] resolves it.
    pub fn sdk_name(&self) -> Option<&str> {
        self.first_sdk_entry()
            .and_then(|entry| self.sdk_name_of(entry))
    }

    pub(crate) fn first_sdk_entry(&self) -> Option<&OrderEntry> {
        self.order.iter().find(|entry| {
            matches!(
                entry.entry_type(),
                OrderEntryType::ModuleExtensionSdk | OrderEntryType::InheritedSdk
            )
        })
    }

    /// Effective SDK name of an extension SDK entry. The inherited SDK
    /// resolves through [`Project::sdk_name`] instead.
    pub fn sdk_name_of(&self, entry: &OrderEntry) -> Option<&str> {
        match entry.kind() {
            OrderEntryKind::ModuleExtensionSdk(sdk) => {
                extension_sdk_name(&self.extensions, sdk.extension_id())
            }
            _ => None,
        }
    }

    pub fn order_entry_urls(&self, entry: &OrderEntry, root_type: OrderRootType) -> Vec<String> {
        let content = self.content_keys();
        RootsView::new(self.order.as_slice(), &self.extensions, &content).urls(entry, root_type)
    }

    // ---- extensions ----

    /// The extension with `id`, if enabled.
    pub fn extension(&self, id: &str) -> Option<&ModuleExtension> {
        self.extension_without_check(id)
            .filter(|extension| extension.is_enabled())
    }

    pub fn extension_without_check(&self, id: &str) -> Option<&ModuleExtension> {
        self.extensions.iter().find(|extension| extension.id() == id)
    }

    /// Enabled extensions.
    pub fn extensions(&self) -> impl Iterator<Item = &ModuleExtension> {
        self.extensions.iter().filter(|extension| extension.is_enabled())
    }

    pub fn extension_mut(&mut self, id: &str) -> Option<&mut ModuleExtension> {
        self.assert_writable();
        self.extensions.iter_mut().find(|extension| extension.id() == id)
    }

    /// Ids of the extensions whose state differs from the copied origin.
    pub fn changed_extensions(&self) -> Vec<&str> {
        let Some(baseline) = &self.baseline else {
            return Vec::new();
        };
        self.extensions
            .iter()
            .filter(|extension| {
                baseline
                    .extensions
                    .iter()
                    .find(|origin| origin.id() == extension.id())
                    .map_or(true, |origin| origin != *extension)
            })
            .map(ModuleExtension::id)
            .collect()
    }

    /// Whether this copy differs from the model it was copied from. Always
    /// `false` for a model that is not a copy.
    pub fn is_changed(&self) -> bool {
        let edits = self.edits();
        edits.order || edits.content || !self.changed_extensions().is_empty()
    }

    /// Which parts of this copy were edited since it was made. Order entries
    /// are compared under this copy's own extensions and content, so an SDK
    /// or source folder change alone does not count as an order edit.
    fn edits(&self) -> Edits {
        let Some(baseline) = &self.baseline else {
            return Edits::default();
        };
        let content = self.content_keys();
        let current = RootsView::new(self.order.as_slice(), &self.extensions, &content);
        let origin = RootsView::new(&baseline.order, &self.extensions, &content);
        Edits {
            order: compare::order_changed(&current, &origin),
            content: compare::content_changed(&content, &baseline.content),
        }
    }

    // ---- lifecycle ----

    /// Runs `callback` when the model is disposed.
    pub fn register_on_dispose(&mut self, callback: impl FnOnce() + 'static) {
        self.disposables.add(callback);
    }

    /// Releases the model's file pointers and runs the disposal callbacks.
    ///
    /// # Panics
    ///
    /// Panics when called twice.
    pub fn dispose(&mut self) {
        self.assert_not_disposed();
        self.writable = false;
        self.content.clear();
        self.disposables.dispose();
        tracing::debug!(target: "taproot.roots", module = %self.module.name, "disposed root model");
    }

    // ---- commit support ----

    /// Applies this copy onto `source`, the live model of the same module.
    ///
    /// Only the parts edited since the copy was made are written, so a copy
    /// left untouched never reverts what a sibling copy committed meanwhile.
    /// The summary compares the source before and after.
    pub(crate) fn apply_to(&self, source: &mut RootModel) -> CommitSummary {
        let edits = self.edits();
        let before_order = source.order.snapshot();
        let before_extensions = source.extensions.clone();
        let before_content = source.content_keys();

        if edits.order {
            source.order.replace_all(self.order.iter().cloned());
            source.next_entry_id = source.next_entry_id.max(self.next_entry_id);
        }
        if edits.content {
            source.content.clear();
            source.content.extend(self.content.iter().cloned());
        }
        let mut extensions = Vec::new();
        for id in self.changed_extensions() {
            let (Some(edited), Some(target)) = (
                self.extension_without_check(id),
                source.extensions.iter_mut().find(|extension| extension.id() == id),
            ) else {
                continue;
            };
            if target != edited {
                *target = edited.clone();
                extensions.push(id.to_owned());
            }
        }

        let after_content = source.content_keys();
        let before = RootsView::new(&before_order, &before_extensions, &before_content);
        let after = RootsView::new(source.order.as_slice(), &source.extensions, &after_content);
        CommitSummary {
            order_changed: compare::order_changed(&before, &after),
            content_changed: compare::content_changed(&before_content, &after_content),
            extensions,
        }
    }

    pub(crate) fn mark_committed(&mut self) {
        self.writable = false;
    }

    fn content_keys(&self) -> Vec<ContentKey> {
        let mut keys: Vec<_> = self.content.iter().map(ContentEntry::key).collect();
        keys.sort();
        keys
    }

    fn allocate_id(&mut self) -> OrderEntryId {
        let id = OrderEntryId(self.next_entry_id);
        self.next_entry_id += 1;
        id
    }

    pub(crate) fn assert_writable(&self) {
        self.assert_not_disposed();
        assert!(
            self.writable,
            "root model of module `{}` is not writable",
            self.module.name
        );
    }

    fn assert_not_disposed(&self) {
        assert!(
            !self.is_disposed(),
            "root model of module `{}` is already disposed",
            self.module.name
        );
    }
}
