//! Ordered path entries and the mutations the editor applies to them.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::viewport::Direction;
use crate::{Directories, NormalizeFn, PathEntry, Source};

/// The list being edited.
///
/// System entries always form a contiguous prefix ahead of user entries;
/// every mutation preserves that layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathStore {
    entries: Vec<PathEntry>,
}

impl PathStore {
    /// Wrap loaded entries in display order.
    pub fn new(entries: Vec<PathEntry>) -> Self {
        Self { entries }
    }

    /// All entries, deleted ones included.
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Entry at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&PathEntry> {
        self.entries.get(index)
    }

    /// Number of entries, deleted ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the store and return its entries.
    pub fn into_entries(self) -> Vec<PathEntry> {
        self.entries
    }

    /// Swap the entry with its neighbour in the same section.
    ///
    /// Returns the entry's new index, or `None` when the move is blocked by
    /// the end of the list or a section boundary.
    pub fn move_entry(&mut self, index: usize, direction: Direction) -> Option<usize> {
        let source = self.entries.get(index)?.source;
        let target = match direction {
            Direction::Backward => index.checked_sub(1)?,
            Direction::Forward => index + 1,
        };
        if self.entries.get(target)?.source != source {
            return None;
        }
        self.entries.swap(index, target);
        self.entries[target].mark_modified();
        Some(target)
    }

    /// Flip the deletion mark; the entry stays in the list.
    pub fn toggle_delete(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            let deleted = !entry.is_deleted();
            entry.set_deleted(deleted);
        }
    }

    /// Insert an added entry at the end of its section and return its index.
    pub fn insert_new(&mut self, path: &str, source: Source, dirs: &dyn Directories) -> usize {
        let index = match source {
            Source::System => self
                .entries
                .iter()
                .position(|entry| entry.source == Source::User)
                .unwrap_or(self.entries.len()),
            Source::User | Source::None => self.entries.len(),
        };
        let exists = dirs.exists(Path::new(path));
        self.entries
            .insert(index, PathEntry::added(path, source, exists));
        index
    }

    /// Replace the path of an entry, clearing any deletion mark.
    pub fn edit_path(&mut self, index: usize, new_path: &str, dirs: &dyn Directories) {
        let Some(entry) = self.entries.get_mut(index) else {
            return;
        };
        if entry.path == new_path {
            return;
        }
        entry.path = new_path.to_string();
        entry.mark_modified();
        entry.set_deleted(false);
        entry.exists = dirs.exists(Path::new(new_path));
    }

    /// Mark missing directories and later duplicates within each section for
    /// deletion. Every entry, deleted or not, claims its path for its section.
    /// Returns how many entries were newly marked.
    pub fn clean(&mut self, normalize: NormalizeFn) -> usize {
        let mut seen: HashSet<(Source, String)> = HashSet::new();
        let mut marked = 0;
        for entry in &mut self.entries {
            let duplicate = !seen.insert((entry.source, normalize(&entry.path)));
            if !entry.exists || duplicate {
                if !entry.is_deleted() {
                    marked += 1;
                }
                entry.set_deleted(true);
                entry.mark_modified();
            }
        }
        debug!(marked, "clean pass finished");
        marked
    }

    /// True when anything differs from the loaded state.
    pub fn has_modifications(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.is_modified() || entry.is_deleted())
    }

    /// Join the paths of all entries that are not marked deleted.
    pub fn build_output_string(&self, separator: char) -> String {
        let mut buf = [0u8; 4];
        let separator: &str = separator.encode_utf8(&mut buf);
        self.live()
            .map(|entry| entry.path.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Paths of one section that are not marked deleted, in order.
    pub fn section_paths(&self, source: Source) -> Vec<&str> {
        self.live()
            .filter(|entry| entry.source == source)
            .map(|entry| entry.path.as_str())
            .collect()
    }

    /// True when system entries form a contiguous prefix ahead of user entries.
    pub fn sections_contiguous(&self) -> bool {
        let first_user = self
            .entries
            .iter()
            .position(|entry| entry.source == Source::User)
            .unwrap_or(self.entries.len());
        self.entries[first_user..]
            .iter()
            .all(|entry| entry.source != Source::System)
    }

    fn live(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter().filter(|entry| !entry.is_deleted())
    }
}
