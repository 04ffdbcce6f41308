use pretty_assertions::assert_eq;
use taproot_roots::{
    DependencyScope, Library, LibraryLevel, OrderEntry, OrderEntryKind, OrderEntryType,
    OrderRootType, Project, ROOT_MANAGER_COMPONENT,
};
use taproot_xml::Element;

use super::demo_project;

fn entry_types(project: &Project, name: &str) -> Vec<OrderEntryType> {
    let module = project.find_module(name).unwrap();
    project
        .root_model(module.id)
        .unwrap()
        .order_entries()
        .iter()
        .map(OrderEntry::entry_type)
        .collect()
}

#[test]
fn committed_roots_survive_a_round_trip_through_xml() {
    let (mut project, app, core) = demo_project();
    let guava = Library::new("guava", LibraryLevel::Project)
        .with_root(OrderRootType::Classes, "jar:///m2/guava.jar!/");
    project.libraries_mut().add(guava.clone());

    let mut model = project.modifiable_model(app.id).unwrap();
    let content = model.add_content_entry("file:///work/app");
    content
        .add_source_folder("file:///work/app/gen", false)
        .set_package_prefix("com.example.gen");
    content.add_exclude_folder("file:///work/app/out");
    model.add_content_entry("file:///work/app-resources");
    let java = model.extension_mut("java").unwrap();
    java.set_enabled(true);
    java.set_sdk_name(Some("17".to_owned()));
    model.add_module_extension_sdk_entry("java");
    let guava_id = model.add_library_entry(&guava);
    model.set_exported(guava_id, true);
    model.set_scope(guava_id, DependencyScope::Test);
    let core_id = model.add_module_order_entry(&core);
    model.set_production_on_test(core_id, true);
    model.add_order_entry(OrderEntryKind::InheritedSdk);
    let local = Library::new("local", LibraryLevel::Module)
        .with_root(OrderRootType::Sources, "jar:///libs/local-src.jar!/");
    model.add_library_entry(&local);
    project.commit(&mut model);

    let xml = project.write_module(app.id).unwrap().to_xml_string().unwrap();
    let parsed = Element::parse(&xml).unwrap();
    assert_eq!(parsed.attribute("name"), Some(ROOT_MANAGER_COMPONENT));

    let mut reloaded = Project::new("reloaded");
    reloaded.register_extension("java", taproot_roots::ExtensionKind::WithSdk);
    reloaded.register_extension("language-level", taproot_roots::ExtensionKind::LanguageLevel);
    reloaded.libraries_mut().add(guava);
    reloaded.add_module("core");
    let app2 = reloaded.load_module("app", &parsed);

    assert_eq!(entry_types(&reloaded, "app"), entry_types(&project, "app"));

    let original = project.root_model(app.id).unwrap();
    let loaded = reloaded.root_model(app2.id).unwrap();
    let urls = |model: &taproot_roots::RootModel| -> Vec<String> {
        model.content_entries().iter().map(|entry| entry.url()).collect()
    };
    assert_eq!(urls(loaded), urls(original));
    assert_eq!(loaded.to_element(), original.to_element());
    assert_eq!(loaded.sdk_name(), Some("17"));

    let loaded_guava = loaded
        .find_library_order_entry(&Library::new("guava", LibraryLevel::Project))
        .unwrap();
    assert_eq!(loaded_guava.kind().exported(), Some(true));
    assert_eq!(loaded_guava.kind().scope(), Some(DependencyScope::Test));
    assert!(reloaded.is_entry_valid(loaded, loaded_guava));
}

#[test]
fn persisted_form_uses_the_component_layout() {
    let (mut project, app, core) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    model.add_content_entry("file:///work/app");
    let id = model.add_module_order_entry(&core);
    model.set_exported(id, true);
    project.commit(&mut model);

    let element = project.write_module(app.id).unwrap();
    let names: Vec<_> = element.children().iter().map(Element::name).collect();
    assert_eq!(names, vec!["content", "orderEntry", "orderEntry"]);

    let source = &element.children()[1];
    assert_eq!(source.attribute("type"), Some("sourceFolder"));
    assert_eq!(source.attribute("forTests"), Some("false"));

    let module = &element.children()[2];
    assert_eq!(module.attribute("type"), Some("module"));
    assert_eq!(module.attribute("module-name"), Some("core"));
    assert_eq!(module.attribute("exported"), Some(""));
    assert_eq!(module.attribute("scope"), None);
    assert!(!module.has_attribute("production-on-test"));
}

#[test]
fn missing_module_source_entry_is_restored_on_load() {
    let xml = r#"<component name="NewModuleRootManager">
  <orderEntry type="inheritedSdk"/>
  <orderEntry type="library" name="junit" level="project"/>
</component>"#;
    let mut project = Project::new("restore");
    let app = project.load_module("app", &Element::parse(xml).unwrap());

    assert_eq!(
        entry_types(&project, "app"),
        vec![
            OrderEntryType::InheritedSdk,
            OrderEntryType::Library,
            OrderEntryType::ModuleSource,
        ]
    );
    let model = project.root_model(app.id).unwrap();
    let junit = &model.order_entries()[1];
    assert!(!project.is_entry_valid(model, junit));
}

#[test]
fn unreadable_and_duplicate_entries_are_dropped_on_load() {
    let xml = r#"<component name="NewModuleRootManager">
  <content url="file:///work/app"/>
  <content url="file:///work/app"/>
  <content/>
  <orderEntry type="sourceFolder" forTests="false"/>
  <orderEntry type="jdk" jdkName="1.8"/>
  <orderEntry type="library" level="project"/>
  <orderEntry type="library" name="x" level="galaxy"/>
  <orderEntry/>
  <orderEntry type="sourceFolder" forTests="false"/>
  <orderEntry type="module" module-name="app"/>
  <orderEntry type="module" module-name="core" scope="RUNTIME"/>
</component>"#;
    let mut project = Project::new("lenient");
    let app = project.load_module("app", &Element::parse(xml).unwrap());

    assert_eq!(
        entry_types(&project, "app"),
        vec![OrderEntryType::ModuleSource, OrderEntryType::Module]
    );
    let model = project.root_model(app.id).unwrap();
    assert_eq!(model.content_entries().len(), 1);
    assert_eq!(model.module_dependency_names(), vec!["core".to_owned()]);
    assert_eq!(
        model.order_entries()[1].kind().scope(),
        Some(DependencyScope::Runtime)
    );
}

#[test]
fn modules_are_saved_and_read_back_from_disk() {
    let (mut project, app, _) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    model
        .add_content_entry("file:///work/app")
        .add_source_folder("file:///work/app/src", false);
    project.commit(&mut model);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".taproot").join("app.xml");
    project.write_module(app.id).unwrap().save_to_path(&path).unwrap();

    let element = Element::read_from_path(&path).unwrap();
    let mut reloaded = Project::new("disk");
    let app2 = reloaded.load_module("app", &element);
    let entries = reloaded.root_model(app2.id).unwrap().content_entries()[0]
        .source_folder_urls();
    assert_eq!(entries, vec!["file:///work/app/src"]);
}

#[test]
fn unnamed_module_libraries_load_and_survive_a_round_trip() {
    let component = Element::parse(
        r#"<component name="NewModuleRootManager">
             <orderEntry type="sourceFolder" forTests="false"/>
             <orderEntry type="module-library">
               <library><CLASSES><root url="jar:///libs/local.jar!/"/></CLASSES></library>
             </orderEntry>
           </component>"#,
    )
    .unwrap();
    let (mut project, app, _) = demo_project();
    project.load_module("loaded", &component);
    assert_eq!(
        entry_types(&project, "loaded"),
        vec![OrderEntryType::ModuleSource, OrderEntryType::Library]
    );

    let unnamed = Library::new("", LibraryLevel::Module)
        .with_root(OrderRootType::Sources, "jar:///libs/local-src.jar!/");
    let mut model = project.modifiable_model(app.id).unwrap();
    model.add_library_entry(&unnamed);
    project.commit(&mut model);

    let saved = project.write_module(app.id).unwrap();
    let library = saved
        .children_named("orderEntry")
        .find_map(|entry| entry.child("library"))
        .unwrap();
    assert_eq!(library.attribute("name"), None);

    let mut reloaded = Project::new("reloaded");
    let app2 = reloaded.load_module("app", &saved);
    let loaded = reloaded.root_model(app2.id).unwrap();
    let entry = loaded.find_library_order_entry(&unnamed).unwrap();
    assert_eq!(
        loaded.order_entry_urls(entry, OrderRootType::Sources),
        vec!["jar:///libs/local-src.jar!/".to_owned()]
    );
}
