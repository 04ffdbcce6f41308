use proptest::prelude::*;
use taproot_roots::{
    LibraryLevel, OrderEntry, OrderEntryId, OrderEntryType, RearrangeError, RootModel,
};

use super::demo_project;

const PROPTEST_CASES: u32 = 64;

/// A writable copy of `app` holding the module source plus `libraries` entries.
fn model_with_libraries(libraries: usize) -> RootModel {
    let (project, app, _) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    for n in 0..libraries {
        model.add_invalid_library(&format!("lib{n}"), LibraryLevel::Project);
    }
    model
}

fn ids(model: &RootModel) -> Vec<OrderEntryId> {
    model.order_entries().iter().map(OrderEntry::id).collect()
}

fn arb_permutation() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (0usize..8).prop_flat_map(|libraries| {
        let offsets: Vec<usize> = (0..=libraries).collect();
        (Just(libraries), Just(offsets).prop_shuffle())
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: PROPTEST_CASES, .. ProptestConfig::default() })]

    #[test]
    fn permutations_are_accepted_verbatim((libraries, offsets) in arb_permutation()) {
        let mut model = model_with_libraries(libraries);
        let current = ids(&model);
        let wanted: Vec<_> = offsets.iter().map(|&offset| current[offset]).collect();

        prop_assert_eq!(model.rearrange_order_entries(&wanted), Ok(()));
        prop_assert_eq!(ids(&model), wanted);
        for (offset, entry) in model.order_entries().iter().enumerate() {
            prop_assert_eq!(entry.index(), offset);
        }
    }

    #[test]
    fn non_permutations_are_rejected_and_change_nothing(
        (libraries, offsets) in arb_permutation(),
        mutation in 0u8..3,
    ) {
        let mut model = model_with_libraries(libraries);
        let current = ids(&model);
        let mut wanted: Vec<_> = offsets.iter().map(|&offset| current[offset]).collect();

        let expected = match mutation {
            0 => {
                wanted.pop();
                RearrangeError::SizeMismatch { old: current.len(), new: current.len() - 1 }
            }
            1 => {
                let last = wanted.len() - 1;
                wanted[last] = OrderEntryId(9_999);
                RearrangeError::UnknownEntry(OrderEntryId(9_999))
            }
            _ => {
                wanted.push(wanted[0]);
                RearrangeError::SizeMismatch { old: current.len(), new: current.len() + 1 }
            }
        };

        prop_assert_eq!(model.rearrange_order_entries(&wanted), Err(expected));
        prop_assert_eq!(ids(&model), current);
    }
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut model = model_with_libraries(2);
    let current = ids(&model);
    let wanted = vec![current[0], current[1], current[1]];
    assert_eq!(
        model.rearrange_order_entries(&wanted),
        Err(RearrangeError::DuplicateEntry(current[1]))
    );
}

#[test]
fn sdk_entries_land_after_the_module_source_and_each_other() {
    let (project, app, _) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    model.add_invalid_library("junit", LibraryLevel::Project);

    let first = model.add_module_extension_sdk_entry("java");
    assert_eq!(model.order_entry(first).map(OrderEntry::index), Some(1));

    let second = model.add_module_extension_sdk_entry("java");
    assert_eq!(model.order_entry(second).map(OrderEntry::index), Some(2));

    let types: Vec<_> = model
        .order_entries()
        .iter()
        .map(OrderEntry::entry_type)
        .collect();
    assert_eq!(
        types,
        vec![
            OrderEntryType::ModuleSource,
            OrderEntryType::ModuleExtensionSdk,
            OrderEntryType::ModuleExtensionSdk,
            OrderEntryType::Library,
        ]
    );
}

#[test]
fn module_source_first_then_sdk_at_position_one() {
    let (project, app, _) = demo_project();
    let mut model = project.modifiable_model(app.id).unwrap();
    model.clear();

    let sdk = model.add_module_extension_sdk_entry("java");
    assert_eq!(model.order_entry(sdk).map(OrderEntry::index), Some(1));
}

#[test]
fn clear_leaves_one_module_source_entry() {
    let mut model = model_with_libraries(3);
    model
        .add_content_entry("file:///work/app")
        .add_source_folder("file:///work/app/src", false);
    model.clear();

    assert!(model.content_entries().is_empty());
    let entries = model.order_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type(), OrderEntryType::ModuleSource);
}

#[test]
fn order_snapshot_is_rebuilt_after_each_write() {
    let mut model = model_with_libraries(1);
    let before = model.order_entries();
    assert!(std::sync::Arc::ptr_eq(&before, &model.order_entries()));

    model.add_invalid_library("late", LibraryLevel::Application);
    let after = model.order_entries();
    assert_eq!(before.len() + 1, after.len());
}
