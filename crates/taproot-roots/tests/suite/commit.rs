use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use taproot_roots::{
    DependencyScope, Library, LibraryLevel, OrderEntry, OrderEntryType, OrderRootType,
    RootsChanged,
};

use super::demo_project;

fn entry_types(entries: &[OrderEntry]) -> Vec<OrderEntryType> {
    entries.iter().map(OrderEntry::entry_type).collect()
}

#[test]
fn add_commit_remove_commit() {
    let (mut project, app, _) = demo_project();
    let l1 = Library::new("L1", LibraryLevel::Project)
        .with_root(OrderRootType::Classes, "jar:///libs/l1.jar!/");
    project.libraries_mut().add(l1.clone());

    let mut model = project.modifiable_model(app.id).unwrap();
    assert_eq!(model.order_entries().len(), 1);
    model.add_library_entry(&l1);
    assert!(model.is_changed());
    assert!(project.commit(&mut model).is_some());
    assert!(!model.is_writable());

    let mut model = project.modifiable_model(app.id).unwrap();
    assert_eq!(
        entry_types(&model.order_entries()),
        vec![OrderEntryType::ModuleSource, OrderEntryType::Library]
    );
    let l1_id = model.find_library_order_entry(&l1).map(OrderEntry::id).unwrap();
    model.remove_order_entry(l1_id);
    project.commit(&mut model);

    let source = project.root_model(app.id).unwrap();
    assert_eq!(
        entry_types(&source.order_entries()),
        vec![OrderEntryType::ModuleSource]
    );
}

#[test]
fn unchanged_commit_leaves_the_source_untouched() {
    let (mut project, app, core) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    model
        .add_content_entry("file:///work/app")
        .add_source_folder("file:///work/app/src", false);
    model.add_module_order_entry(&core);
    project.commit(&mut model);

    let before = project.root_model(app.id).unwrap().to_element();
    let snapshot = project.root_model(app.id).unwrap().order_entries();

    let mut untouched = project.modifiable_model(app.id).unwrap();
    assert!(!untouched.is_changed());
    assert_eq!(project.commit(&mut untouched), None);

    let source = project.root_model(app.id).unwrap();
    assert_eq!(source.to_element(), before);
    assert!(std::sync::Arc::ptr_eq(&snapshot, &source.order_entries()));
}

#[test]
fn export_flag_or_scope_alone_counts_as_a_change() {
    let (mut project, app, _) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    let id = model.add_invalid_library("guava", LibraryLevel::Project);
    project.commit(&mut model);

    let mut exported = project.modifiable_model(app.id).unwrap();
    assert!(!exported.is_changed());
    assert!(exported.set_exported(id, true));
    assert!(exported.is_changed());

    let mut scoped = project.modifiable_model(app.id).unwrap();
    assert!(scoped.set_scope(id, DependencyScope::Test));
    assert!(scoped.is_changed());
    let event = project.commit(&mut scoped).unwrap();
    assert!(event.order_changed);
    assert!(!event.content_changed);

    let source = project.root_model(app.id).unwrap();
    assert_eq!(
        source.order_entry(id).and_then(|entry| entry.kind().scope()),
        Some(DependencyScope::Test)
    );
}

#[test]
fn reordering_is_a_change() {
    let (mut project, app, core) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    model.add_module_order_entry(&core);
    model.add_invalid_library("junit", LibraryLevel::Project);
    project.commit(&mut model);

    let mut model = project.modifiable_model(app.id).unwrap();
    let mut ids: Vec<_> = model.order_entries().iter().map(OrderEntry::id).collect();
    ids.swap(1, 2);
    model.rearrange_order_entries(&ids).unwrap();
    assert!(model.is_changed());
}

#[test]
fn content_changes_are_committed() {
    let (mut project, app, _) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    let content = model.add_content_entry("file:///work/app");
    content.add_source_folder("file:///work/app/src", false);
    content.add_source_folder("file:///work/app/test", true);
    content.add_exclude_folder("file:///work/app/out");
    assert!(model.is_changed());

    let event = project.commit(&mut model).unwrap();
    assert!(event.content_changed);
    // Source folders feed the module source entry's SOURCES urls.
    assert!(event.order_changed);

    let source = project.root_model(app.id).unwrap();
    let entries = source.content_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].source_folder_urls(),
        vec!["file:///work/app/src", "file:///work/app/test"]
    );
    let module_source = source.order_entries()[0].clone();
    assert_eq!(
        source.order_entry_urls(&module_source, OrderRootType::Sources),
        vec!["file:///work/app/src", "file:///work/app/test"]
    );
}

#[test]
fn extension_changes_are_committed_and_reported() {
    let (mut project, app, _) = demo_project();
    let events: Rc<RefCell<Vec<RootsChanged>>> = Rc::default();
    let sink = Rc::clone(&events);
    project.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let mut model = project.modifiable_model(app.id).unwrap();
    let java = model.extension_mut("java").unwrap();
    java.set_enabled(true);
    java.set_sdk_name(Some("17".to_owned()));
    model.add_module_extension_sdk_entry("java");
    project.commit(&mut model);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].module, app);
    assert_eq!(events[0].extensions, vec!["java".to_owned()]);
    assert_eq!(project.module_sdk_name(app.id), Some("17"));
    assert_eq!(project.root_model(app.id).unwrap().sdk_name(), Some("17"));
}

#[test]
fn sdk_name_changes_are_seen_through_the_sdk_entry() {
    let (mut project, app, _) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    let java = model.extension_mut("java").unwrap();
    java.set_enabled(true);
    java.set_sdk_name(Some("17".to_owned()));
    model.add_module_extension_sdk_entry("java");
    project.commit(&mut model);

    let mut model = project.modifiable_model(app.id).unwrap();
    model
        .extension_mut("java")
        .unwrap()
        .set_sdk_name(Some("21".to_owned()));
    let event = project.commit(&mut model).unwrap();
    assert!(event.order_changed);
    assert_eq!(event.extensions, vec!["java".to_owned()]);
}

#[test]
fn commits_from_two_copies_apply_in_turn() {
    let (mut project, app, core) = demo_project();
    let mut first = project.modifiable_model(app.id).unwrap();
    let mut second = project.modifiable_model(app.id).unwrap();
    first.add_module_order_entry(&core);
    second.add_invalid_library("junit", LibraryLevel::Project);

    project.commit(&mut first);
    project.commit(&mut second);

    let source = project.root_model(app.id).unwrap();
    assert_eq!(
        entry_types(&source.order_entries()),
        vec![OrderEntryType::ModuleSource, OrderEntryType::Library]
    );
}

#[test]
fn untouched_copy_does_not_revert_a_sibling_commit() {
    let (mut project, app, core) = demo_project();
    let mut first = project.modifiable_model(app.id).unwrap();
    let mut second = project.modifiable_model(app.id).unwrap();
    first.add_module_order_entry(&core);
    first.add_content_entry("file:///work/app");
    project.commit(&mut first);
    let committed = project.root_model(app.id).unwrap().to_element();

    assert!(!second.is_changed());
    assert_eq!(project.commit(&mut second), None);
    assert!(!second.is_writable());

    let source = project.root_model(app.id).unwrap();
    assert_eq!(source.to_element(), committed);
    assert_eq!(
        entry_types(&source.order_entries()),
        vec![OrderEntryType::ModuleSource, OrderEntryType::Module]
    );
}

#[test]
fn stale_copy_applies_only_its_own_edits() {
    let (mut project, app, core) = demo_project();
    let mut first = project.modifiable_model(app.id).unwrap();
    let mut second = project.modifiable_model(app.id).unwrap();
    first.add_module_order_entry(&core);
    project.commit(&mut first);

    // Content and extension edits leave the sibling's order entries alone.
    second.add_content_entry("file:///work/app");
    second.extension_mut("language-level").unwrap().set_enabled(true);
    let event = project.commit(&mut second).unwrap();
    assert!(event.content_changed);
    assert!(!event.order_changed);
    assert_eq!(event.extensions, vec!["language-level".to_owned()]);

    let source = project.root_model(app.id).unwrap();
    assert_eq!(source.module_dependency_names(), vec!["core".to_owned()]);
    assert_eq!(source.content_entries().len(), 1);
}

#[test]
#[should_panic(expected = "is not writable")]
fn committing_twice_panics() {
    let (mut project, app, _) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    project.commit(&mut model);
    project.commit(&mut model);
}

#[test]
#[should_panic(expected = "belongs to another project")]
fn cross_project_module_dependency_panics() {
    let (project, app, _) = demo_project();
    let (_other_project, _, foreign) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    model.add_module_order_entry(&foreign);
}
