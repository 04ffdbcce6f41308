use std::collections::BTreeMap;
use std::fmt;

use taproot_xml::Element;

use crate::order::{OrderRootType, RootUrls};

pub(crate) const LIBRARY_ELEMENT: &str = "library";
const ROOT_ELEMENT: &str = "root";

/// Where a library is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LibraryLevel {
    /// Stored inline with a single module's roots.
    Module,
    /// Shared by every module of a project.
    Project,
    /// Shared across projects.
    Application,
}

impl LibraryLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LibraryLevel::Module => "module",
            LibraryLevel::Project => "project",
            LibraryLevel::Application => "application",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "module" => Some(LibraryLevel::Module),
            "project" => Some(LibraryLevel::Project),
            "application" => Some(LibraryLevel::Application),
            _ => None,
        }
    }
}

impl fmt::Display for LibraryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of root URLs (jars, source archives, docs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    name: String,
    level: LibraryLevel,
    roots: RootUrls,
}

impl Library {
    pub fn new(name: impl Into<String>, level: LibraryLevel) -> Self {
        Self {
            name: name.into(),
            level,
            roots: BTreeMap::new(),
        }
    }

    pub fn with_root(mut self, root_type: OrderRootType, url: impl Into<String>) -> Self {
        self.add_root(root_type, url);
        self
    }

    pub fn add_root(&mut self, root_type: OrderRootType, url: impl Into<String>) {
        self.roots.entry(root_type).or_default().push(url.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LibraryLevel {
        self.level
    }

    pub fn urls(&self, root_type: OrderRootType) -> &[String] {
        self.roots.get(&root_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn roots(&self) -> &RootUrls {
        &self.roots
    }

    /// `<library name="..."><CLASSES><root url="..."/></CLASSES>...</library>`.
    /// An unnamed library writes no `name`.
    pub fn write_external(&self) -> Element {
        let mut element = Element::new(LIBRARY_ELEMENT);
        if !self.name.is_empty() {
            element.set_attribute("name", self.name.as_str());
        }
        for root_type in OrderRootType::ALL {
            let mut roots = Element::new(root_type.element_name());
            for url in self.urls(root_type) {
                roots.add_child(Element::new(ROOT_ELEMENT).with_attribute("url", url.as_str()));
            }
            element.add_child(roots);
        }
        element
    }

    /// Returns `None` when the element carries no library name. Module
    /// libraries may be unnamed.
    pub fn read_external(element: &Element, level: LibraryLevel) -> Option<Library> {
        let name = match element.attribute("name").filter(|name| !name.trim().is_empty()) {
            Some(name) => name,
            None if level == LibraryLevel::Module => "",
            None => return None,
        };
        let mut library = Library::new(name, level);
        for root_type in OrderRootType::ALL {
            let Some(roots) = element.child(root_type.element_name()) else {
                continue;
            };
            for url in roots
                .children_named(ROOT_ELEMENT)
                .filter_map(|root| root.attribute("url"))
            {
                library.add_root(root_type, url);
            }
        }
        Some(library)
    }
}

/// Libraries visible to a project, keyed by level and name.
#[derive(Debug, Clone, Default)]
pub struct LibraryTable {
    libraries: BTreeMap<(LibraryLevel, String), Library>,
}

impl LibraryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a library with the same level and name.
    pub fn add(&mut self, library: Library) -> Option<Library> {
        self.libraries
            .insert((library.level, library.name.clone()), library)
    }

    pub fn remove(&mut self, level: LibraryLevel, name: &str) -> Option<Library> {
        self.libraries.remove(&(level, name.to_owned()))
    }

    pub fn get(&self, level: LibraryLevel, name: &str) -> Option<&Library> {
        self.libraries.get(&(level, name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Library> {
        self.libraries.values()
    }
}
