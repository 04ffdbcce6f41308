//! URL pointers that follow files as they move.
//!
//! Content roots and source folders hold a [`FilePointer`] instead of a raw URL
//! string. When the underlying directory is renamed the project calls
//! [`FilePointerManager::move_url`] and every pointer at or below the old URL
//! observes the new location. Dropping a pointer releases it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct PointerTable {
    next_id: u64,
    urls: HashMap<u64, String>,
}

/// Shared registry of live [`FilePointer`]s. Cloning yields another handle to
/// the same registry.
#[derive(Debug, Clone, Default)]
pub struct FilePointerManager {
    table: Arc<Mutex<PointerTable>>,
}

impl FilePointerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, url: impl Into<String>) -> FilePointer {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.urls.insert(id, url.into());
        FilePointer {
            id,
            manager: self.clone(),
        }
    }

    /// Number of pointers that have not been released yet.
    pub fn live_pointers(&self) -> usize {
        self.table.lock().urls.len()
    }

    /// Moves every pointer at `old_url` or below it to `new_url`.
    ///
    /// Returns the number of pointers that moved.
    pub fn move_url(&self, old_url: &str, new_url: &str) -> usize {
        let old_url = old_url.trim_end_matches('/');
        let new_url = new_url.trim_end_matches('/');
        let mut moved = 0;
        for url in self.table.lock().urls.values_mut() {
            let rest = match url.strip_prefix(old_url) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.to_owned(),
                _ => continue,
            };
            *url = format!("{new_url}{rest}");
            moved += 1;
        }
        if moved > 0 {
            tracing::debug!(target: "taproot.roots", old_url, new_url, moved, "moved file pointers");
        }
        moved
    }

    fn url(&self, id: u64) -> String {
        self.table.lock().urls.get(&id).cloned().unwrap_or_default()
    }

    fn release(&self, id: u64) {
        self.table.lock().urls.remove(&id);
    }
}

/// A tracked URL. Cloning registers a new pointer at the same location.
pub struct FilePointer {
    id: u64,
    manager: FilePointerManager,
}

impl FilePointer {
    pub fn url(&self) -> String {
        self.manager.url(self.id)
    }

    pub(crate) fn manager(&self) -> &FilePointerManager {
        &self.manager
    }
}

impl Clone for FilePointer {
    fn clone(&self) -> Self {
        self.manager.create(self.url())
    }
}

impl Drop for FilePointer {
    fn drop(&mut self) {
        self.manager.release(self.id);
    }
}

impl fmt::Debug for FilePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FilePointer").field(&self.url()).finish()
    }
}
