use std::collections::BTreeSet;

use proptest::prelude::*;
use taproot_roots::{
    ExtensionKind, Library, LibraryLevel, ModuleExtensionSdkEntry, OrderEntry, OrderEntryKind,
    OrderRootType, Project, RootModel,
};

use super::demo_project;

const PROPTEST_CASES: u32 = 64;

#[derive(Debug, Clone)]
enum PlannedEntry {
    ProjectLibrary { name: String, exported: bool },
    ModuleLibrary { name: Option<String>, jars: Vec<String> },
    Module { name: &'static str, exported: bool },
    ExtensionSdk,
    InheritedSdk,
}

#[derive(Debug, Clone)]
struct PlannedContent {
    name: String,
    source_folder: Option<bool>,
}

fn arb_entry() -> impl Strategy<Value = PlannedEntry> {
    prop_oneof![
        ("[a-z]{1,6}", any::<bool>())
            .prop_map(|(name, exported)| PlannedEntry::ProjectLibrary { name, exported }),
        (
            proptest::option::of("[a-z]{1,6}"),
            proptest::collection::vec("[a-z]{1,6}", 0..3),
        )
            .prop_map(|(name, jars)| PlannedEntry::ModuleLibrary { name, jars }),
        (prop::sample::select(vec!["core", "util", "missing"]), any::<bool>())
            .prop_map(|(name, exported)| PlannedEntry::Module { name, exported }),
        Just(PlannedEntry::ExtensionSdk),
        Just(PlannedEntry::InheritedSdk),
    ]
}

fn arb_content() -> impl Strategy<Value = Vec<PlannedContent>> {
    proptest::collection::btree_set("[a-z]{1,5}", 0..4).prop_flat_map(|names: BTreeSet<String>| {
        let names: Vec<String> = names.into_iter().collect();
        let folders = proptest::collection::vec(proptest::option::of(any::<bool>()), names.len());
        (Just(names), folders).prop_map(|(names, folders)| {
            names
                .into_iter()
                .zip(folders)
                .map(|(name, source_folder)| PlannedContent { name, source_folder })
                .collect()
        })
    })
}

fn apply(model: &mut RootModel, entries: &[PlannedEntry], content: &[PlannedContent]) {
    for planned in content {
        let url = format!("file:///work/{}", planned.name);
        let entry = model.add_content_entry(&url);
        if let Some(is_test) = planned.source_folder {
            entry.add_source_folder(&format!("{url}/src"), is_test);
        }
    }
    for planned in entries {
        match planned {
            PlannedEntry::ProjectLibrary { name, exported } => {
                let id = model.add_invalid_library(name, LibraryLevel::Project);
                model.set_exported(id, *exported);
            }
            PlannedEntry::ModuleLibrary { name, jars } => {
                let mut library =
                    Library::new(name.clone().unwrap_or_default(), LibraryLevel::Module);
                for jar in jars {
                    library.add_root(OrderRootType::Classes, format!("jar:///libs/{jar}.jar!/"));
                }
                model.add_library_entry(&library);
            }
            PlannedEntry::Module { name, exported } => {
                let id = model.add_invalid_module_entry(name);
                model.set_exported(id, *exported);
            }
            PlannedEntry::ExtensionSdk => {
                model.add_order_entry(OrderEntryKind::ModuleExtensionSdk(
                    ModuleExtensionSdkEntry::new("java"),
                ));
            }
            PlannedEntry::InheritedSdk => {
                model.add_order_entry(OrderEntryKind::InheritedSdk);
            }
        }
    }
}

fn kinds(model: &RootModel) -> Vec<OrderEntryKind> {
    model.order_entries().iter().map(|entry| entry.kind().clone()).collect()
}

fn content_layout(model: &RootModel) -> Vec<(String, Vec<String>)> {
    model
        .content_entries()
        .iter()
        .map(|entry| (entry.url(), entry.source_folder_urls()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: PROPTEST_CASES, .. ProptestConfig::default() })]

    #[test]
    fn committed_roots_reload_unchanged(
        entries in proptest::collection::vec(arb_entry(), 0..8),
        content in arb_content(),
    ) {
        let (mut project, app, _) = demo_project();
        let mut model = project.modifiable_model(app.id).unwrap();
        apply(&mut model, &entries, &content);
        project.commit(&mut model);
        let component = project.write_module(app.id).unwrap();

        let mut reloaded = Project::new("reloaded");
        reloaded.register_extension("java", ExtensionKind::WithSdk);
        reloaded.register_extension("language-level", ExtensionKind::LanguageLevel);
        let loaded_id = reloaded.load_module("app", &component).id;

        let original = project.root_model(app.id).unwrap();
        let loaded = reloaded.root_model(loaded_id).unwrap();
        prop_assert_eq!(kinds(loaded), kinds(original));
        prop_assert_eq!(content_layout(loaded), content_layout(original));
        prop_assert_eq!(loaded.to_element(), component);
    }

    #[test]
    fn untouched_copy_commits_as_a_no_op_after_a_sibling(
        entries in proptest::collection::vec(arb_entry(), 0..8),
        content in arb_content(),
    ) {
        let (mut project, app, _) = demo_project();
        let mut edited = project.modifiable_model(app.id).unwrap();
        let mut untouched = project.modifiable_model(app.id).unwrap();
        apply(&mut edited, &entries, &content);
        project.commit(&mut edited);

        let committed = project.root_model(app.id).unwrap().to_element();
        let committed_ids: Vec<_> = project
            .root_model(app.id)
            .unwrap()
            .order_entries()
            .iter()
            .map(OrderEntry::id)
            .collect();

        prop_assert!(!untouched.is_changed());
        prop_assert_eq!(project.commit(&mut untouched), None);

        let mut fresh = project.modifiable_model(app.id).unwrap();
        prop_assert!(!fresh.is_changed());
        prop_assert_eq!(project.commit(&mut fresh), None);

        let source = project.root_model(app.id).unwrap();
        prop_assert_eq!(source.to_element(), committed);
        let ids: Vec<_> = source.order_entries().iter().map(OrderEntry::id).collect();
        prop_assert_eq!(ids, committed_ids);
    }
}
