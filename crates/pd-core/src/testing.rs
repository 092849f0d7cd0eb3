use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::{CoreError, CoreResult, Directories};

/// In-memory directory tree keyed by absolute path.
#[derive(Debug, Default)]
pub struct FakeDirs {
    tree: BTreeMap<PathBuf, BTreeSet<String>>,
    unreadable: BTreeSet<PathBuf>,
    roots: Vec<PathBuf>,
}

impl FakeDirs {
    pub fn with_dirs(paths: &[&str]) -> Self {
        let mut dirs = Self {
            roots: vec![PathBuf::from("/")],
            ..Self::default()
        };
        dirs.tree.entry(PathBuf::from("/")).or_default();
        for path in paths {
            dirs.add(path);
        }
        dirs
    }

    pub fn add(&mut self, path: &str) {
        let mut current = PathBuf::from(path);
        self.tree.entry(current.clone()).or_default();
        while let Some(parent) = current.parent() {
            let Some(name) = current.file_name() else {
                break;
            };
            self.tree
                .entry(parent.to_path_buf())
                .or_default()
                .insert(name.to_string_lossy().into_owned());
            current = parent.to_path_buf();
        }
    }

    pub fn deny(&mut self, path: &str) {
        self.unreadable.insert(PathBuf::from(path));
    }

    pub fn set_roots(&mut self, roots: &[&str]) {
        self.roots = roots.iter().map(PathBuf::from).collect();
        for root in &self.roots {
            self.tree.entry(root.clone()).or_default();
        }
    }
}

impl Directories for FakeDirs {
    fn list_children(&self, path: &Path) -> CoreResult<Vec<String>> {
        if self.unreadable.contains(path) {
            return Err(CoreError::Unreadable {
                path: path.to_path_buf(),
                reason: "permission denied".into(),
            });
        }
        self.tree
            .get(path)
            .map(|children| children.iter().rev().cloned().collect())
            .ok_or_else(|| CoreError::Unreadable {
                path: path.to_path_buf(),
                reason: "not found".into(),
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.tree.contains_key(path)
    }

    fn roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }
}
