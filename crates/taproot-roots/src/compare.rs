//! Change detection between two root states.

use crate::content::ContentKey;
use crate::extension::ModuleExtension;
use crate::order::{OrderEntry, OrderEntryKind, OrderRootType};

/// Effective SDK name supplied by the extension `extension_id`: the extension
/// must exist, be enabled and name an SDK.
pub(crate) fn extension_sdk_name<'a>(
    extensions: &'a [ModuleExtension],
    extension_id: &str,
) -> Option<&'a str> {
    extensions
        .iter()
        .find(|extension| extension.id() == extension_id && extension.is_enabled())
        .and_then(ModuleExtension::sdk_name)
}

/// What an order entry needs from its model to be compared: the extension
/// states behind SDK entries and the source folders behind the module source.
pub(crate) struct RootsView<'a> {
    pub(crate) order: &'a [OrderEntry],
    extensions: &'a [ModuleExtension],
    source_folder_urls: Vec<String>,
}

impl<'a> RootsView<'a> {
    pub(crate) fn new(
        order: &'a [OrderEntry],
        extensions: &'a [ModuleExtension],
        content: &[ContentKey],
    ) -> Self {
        let mut source_folder_urls: Vec<String> = content
            .iter()
            .flat_map(|key| key.sources.iter().map(|folder| folder.url.clone()))
            .collect();
        source_folder_urls.sort();
        Self {
            order,
            extensions,
            source_folder_urls,
        }
    }

    pub(crate) fn sdk_name(&self, entry: &OrderEntry) -> Option<&'a str> {
        match entry.kind() {
            OrderEntryKind::ModuleExtensionSdk(sdk) => {
                extension_sdk_name(self.extensions, sdk.extension_id())
            }
            _ => None,
        }
    }

    /// Root URLs `entry` contributes for `root_type`.
    ///
    /// Module and SDK entries store no roots of their own; inside one project
    /// their roots follow from the name that is compared separately.
    pub(crate) fn urls(&self, entry: &OrderEntry, root_type: OrderRootType) -> Vec<String> {
        match entry.kind() {
            OrderEntryKind::Library(library) => library.urls(root_type).to_vec(),
            OrderEntryKind::ModuleSource if root_type == OrderRootType::Sources => {
                self.source_folder_urls.clone()
            }
            _ => Vec::new(),
        }
    }
}

pub(crate) fn order_entries_equal(
    left_view: &RootsView<'_>,
    left: &OrderEntry,
    right_view: &RootsView<'_>,
    right: &OrderEntry,
) -> bool {
    if left.entry_type() != right.entry_type() {
        return false;
    }
    let same_details = match (left.kind(), right.kind()) {
        // Only the effective SDK counts, not which extension supplies it.
        (OrderEntryKind::ModuleExtensionSdk(_), OrderEntryKind::ModuleExtensionSdk(_)) => {
            left_view.sdk_name(left) == right_view.sdk_name(right)
        }
        (OrderEntryKind::Library(l), OrderEntryKind::Library(r)) => {
            l.name() == r.name() && l.level() == r.level()
        }
        (OrderEntryKind::Module(l), OrderEntryKind::Module(r)) => {
            l.is_production_on_test() == r.is_production_on_test()
                && l.module_name() == r.module_name()
        }
        _ => true,
    };
    if !same_details
        || left.kind().exported() != right.kind().exported()
        || left.kind().scope() != right.kind().scope()
    {
        return false;
    }
    OrderRootType::ALL
        .into_iter()
        .all(|root_type| left_view.urls(left, root_type) == right_view.urls(right, root_type))
}

/// Slot-by-slot comparison: order matters.
pub(crate) fn order_changed(left: &RootsView<'_>, right: &RootsView<'_>) -> bool {
    left.order.len() != right.order.len()
        || left
            .order
            .iter()
            .zip(right.order)
            .any(|(l, r)| !order_entries_equal(left, l, right, r))
}

/// Both sides must already be sorted.
pub(crate) fn content_changed(left: &[ContentKey], right: &[ContentKey]) -> bool {
    left != right
}
