//! Core domain entities, rules, and traits for pathed.

use std::path::{Path, PathBuf};

use thiserror::Error;

mod browser;
mod controller;
mod help;
mod prompt;
mod store;
mod viewport;

#[cfg(test)]
mod testing;

pub use browser::{BrowseTarget, Browser, BrowserOutcome, PARENT_ENTRY};
pub use controller::{Command, Controller, Event, ExitChoice, HostConfig, Key, Mode};
pub use help::HELP_LINES;
pub use prompt::{Prompt, PromptOutcome};
pub use store::PathStore;
pub use viewport::{Direction, Viewport};

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by core collaborators.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Returned when repository operations fail.
    #[error("storage error: {0}")]
    Storage(String),
    /// Returned when the host refuses a write.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Returned when a directory cannot be listed.
    #[error("unreadable directory {path}: {reason}")]
    Unreadable {
        /// Directory that failed to list.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },
}

/// Section a path entry belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    /// Host does not distinguish sections.
    #[default]
    None,
    /// System-wide section, always ordered before the user section.
    System,
    /// Per-user section.
    User,
}

/// Mutation provenance of an entry, as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryState {
    /// Unchanged since load.
    Clean,
    /// Edited or moved.
    Modified,
    /// Created in this session.
    Added,
    /// Marked for removal; still present in the list.
    Deleted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Change {
    #[default]
    Clean,
    Modified,
    Added,
}

/// A single entry of a PATH-like list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathEntry {
    /// Directory as written in the variable.
    pub path: String,
    /// Section this entry belongs to.
    pub source: Source,
    /// Cached result of the last existence check.
    pub exists: bool,
    change: Change,
    deleted: bool,
}

impl PathEntry {
    /// Create an unmodified entry as loaded from the host.
    pub fn new(path: impl Into<String>, source: Source, exists: bool) -> Self {
        Self {
            path: path.into(),
            source,
            exists,
            change: Change::Clean,
            deleted: false,
        }
    }

    /// Create an entry the user added during this session.
    pub fn added(path: impl Into<String>, source: Source, exists: bool) -> Self {
        Self {
            change: Change::Added,
            ..Self::new(path, source, exists)
        }
    }

    /// Display state; deletion takes priority over the change provenance.
    pub fn state(&self) -> EntryState {
        if self.deleted {
            return EntryState::Deleted;
        }
        match self.change {
            Change::Clean => EntryState::Clean,
            Change::Modified => EntryState::Modified,
            Change::Added => EntryState::Added,
        }
    }

    /// True when marked for deletion.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// True when the entry was edited, moved, or cleaned (added entries count too).
    pub fn is_modified(&self) -> bool {
        self.change != Change::Clean
    }

    pub(crate) fn mark_modified(&mut self) {
        if self.change != Change::Added {
            self.change = Change::Modified;
        }
    }

    pub(crate) fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }
}

/// Path normalization used for duplicate detection.
pub type NormalizeFn = fn(&str) -> String;

/// Filesystem collaborator used by the browser and existence checks.
pub trait Directories {
    /// Names of the child directories of `path`, unsorted.
    fn list_children(&self, path: &Path) -> CoreResult<Vec<String>>;
    /// Whether `path` is an existing directory.
    fn exists(&self, path: &Path) -> bool;
    /// Available filesystem roots, in preference order.
    fn roots(&self) -> Vec<PathBuf>;
}

/// Repository abstraction for loading and persisting entries.
pub trait PathRepository {
    /// Load all entries in display order.
    fn load(&self, dirs: &dyn Directories) -> CoreResult<Vec<PathEntry>>;
    /// Persist the live entries of each section.
    fn persist(&self, store: &PathStore) -> CoreResult<()>;
}
