use std::fmt;

/// Identifies a [`crate::Project`] for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectId(pub u32);

/// Identifies a module within its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub u32);

/// Identifies an order entry within a root model.
///
/// Ids survive [`crate::RootModel::modifiable_copy`] and commit, so an entry
/// can be addressed the same way in the source model and in its editable copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderEntryId(pub u32);

impl fmt::Display for OrderEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A module handle: which project it belongs to, its id and its (unique) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    pub project: ProjectId,
    pub id: ModuleId,
    pub name: String,
}
