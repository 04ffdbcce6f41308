use std::cmp::Ordering;

use taproot_xml::Element;

use crate::pointers::{FilePointer, FilePointerManager};

pub(crate) const CONTENT_ELEMENT: &str = "content";
const SOURCE_FOLDER_ELEMENT: &str = "sourceFolder";
const EXCLUDE_FOLDER_ELEMENT: &str = "excludeFolder";
const URL_ATTR: &str = "url";
const IS_TEST_SOURCE_ATTR: &str = "isTestSource";
const PACKAGE_PREFIX_ATTR: &str = "packagePrefix";

#[derive(Debug, Clone)]
pub struct SourceFolder {
    pointer: FilePointer,
    is_test: bool,
    package_prefix: String,
}

impl SourceFolder {
    pub fn url(&self) -> String {
        self.pointer.url()
    }

    pub fn is_test_source(&self) -> bool {
        self.is_test
    }

    pub fn package_prefix(&self) -> &str {
        &self.package_prefix
    }

    pub fn set_package_prefix(&mut self, prefix: impl Into<String>) {
        self.package_prefix = prefix.into();
    }
}

/// A directory that belongs to a module, with its source and excluded sub-folders.
///
/// Entries are identified by their root URL.
#[derive(Debug, Clone)]
pub struct ContentEntry {
    root: FilePointer,
    source_folders: Vec<SourceFolder>,
    exclude_folders: Vec<FilePointer>,
}

impl ContentEntry {
    pub(crate) fn new(pointers: &FilePointerManager, url: impl Into<String>) -> Self {
        Self {
            root: pointers.create(url),
            source_folders: Vec::new(),
            exclude_folders: Vec::new(),
        }
    }

    pub fn url(&self) -> String {
        self.root.url()
    }

    pub fn source_folders(&self) -> &[SourceFolder] {
        &self.source_folders
    }

    pub fn source_folder_urls(&self) -> Vec<String> {
        self.source_folders.iter().map(SourceFolder::url).collect()
    }

    pub fn exclude_folder_urls(&self) -> Vec<String> {
        self.exclude_folders.iter().map(FilePointer::url).collect()
    }

    /// Adds a source folder, or returns the existing one with the same URL.
    pub fn add_source_folder(&mut self, url: &str, is_test: bool) -> &mut SourceFolder {
        let position = match self.source_folders.iter().position(|folder| folder.url() == url) {
            Some(position) => position,
            None => {
                let pointer = self.root.manager().create(url);
                self.source_folders.push(SourceFolder {
                    pointer,
                    is_test,
                    package_prefix: String::new(),
                });
                self.source_folders.len() - 1
            }
        };
        &mut self.source_folders[position]
    }

    pub fn remove_source_folder(&mut self, url: &str) -> bool {
        let before = self.source_folders.len();
        self.source_folders.retain(|folder| folder.url() != url);
        self.source_folders.len() != before
    }

    pub fn add_exclude_folder(&mut self, url: &str) {
        if self.exclude_folders.iter().any(|folder| folder.url() == url) {
            return;
        }
        let pointer = self.root.manager().create(url);
        self.exclude_folders.push(pointer);
    }

    pub fn remove_exclude_folder(&mut self, url: &str) -> bool {
        let before = self.exclude_folders.len();
        self.exclude_folders.retain(|folder| folder.url() != url);
        self.exclude_folders.len() != before
    }

    pub fn clear_source_folders(&mut self) {
        self.source_folders.clear();
    }

    pub fn clear_exclude_folders(&mut self) {
        self.exclude_folders.clear();
    }

    /// Plain-data view used for ordering and change detection.
    pub(crate) fn key(&self) -> ContentKey {
        let mut sources: Vec<_> = self
            .source_folders
            .iter()
            .map(|folder| SourceFolderKey {
                url: folder.url(),
                is_test: folder.is_test,
                package_prefix: folder.package_prefix.clone(),
            })
            .collect();
        sources.sort();
        let mut excludes = self.exclude_folder_urls();
        excludes.sort();
        ContentKey {
            url: self.url(),
            sources,
            excludes,
        }
    }

    pub(crate) fn write_external(&self) -> Element {
        let mut element = Element::new(CONTENT_ELEMENT).with_attribute(URL_ATTR, self.url());
        let key = self.key();
        for folder in &key.sources {
            let mut child = Element::new(SOURCE_FOLDER_ELEMENT)
                .with_attribute(URL_ATTR, folder.url.as_str())
                .with_attribute(IS_TEST_SOURCE_ATTR, folder.is_test.to_string());
            if !folder.package_prefix.is_empty() {
                child.set_attribute(PACKAGE_PREFIX_ATTR, folder.package_prefix.as_str());
            }
            element.add_child(child);
        }
        for url in &key.excludes {
            element.add_child(Element::new(EXCLUDE_FOLDER_ELEMENT).with_attribute(URL_ATTR, url.as_str()));
        }
        element
    }

    /// Returns `None` for an element without a root URL.
    pub(crate) fn read_external(element: &Element, pointers: &FilePointerManager) -> Option<Self> {
        let url = element.attribute(URL_ATTR)?;
        let mut entry = ContentEntry::new(pointers, url);
        for folder in element.children_named(SOURCE_FOLDER_ELEMENT) {
            let Some(url) = folder.attribute(URL_ATTR) else {
                continue;
            };
            let is_test = folder
                .attribute(IS_TEST_SOURCE_ATTR)
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
            let source = entry.add_source_folder(url, is_test);
            if let Some(prefix) = folder.attribute(PACKAGE_PREFIX_ATTR) {
                source.set_package_prefix(prefix);
            }
        }
        for folder in element.children_named(EXCLUDE_FOLDER_ELEMENT) {
            if let Some(url) = folder.attribute(URL_ATTR) {
                entry.add_exclude_folder(url);
            }
        }
        Some(entry)
    }
}

impl PartialEq for ContentEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ContentEntry {}

impl PartialOrd for ContentEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// URL first, then source folders, then excluded folders.
impl Ord for ContentEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SourceFolderKey {
    pub(crate) url: String,
    pub(crate) is_test: bool,
    pub(crate) package_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ContentKey {
    pub(crate) url: String,
    pub(crate) sources: Vec<SourceFolderKey>,
    pub(crate) excludes: Vec<String>,
}
