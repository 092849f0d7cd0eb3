//! Directory browser used to pick a path for an edited or added entry.

use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use tracing::{debug, warn};

use crate::controller::Key;
use crate::viewport::{Direction, Viewport};
use crate::{Directories, Source};

/// Pseudo entry that navigates to the parent directory.
pub const PARENT_ENTRY: &str = "..";

/// What the browser session will do with the chosen directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrowseTarget {
    /// Replace the path of the entry at this index.
    Edit(usize),
    /// Insert a new entry into this section.
    Add(Source),
}

/// Result of feeding a key to the browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowserOutcome {
    /// Still browsing.
    Pending,
    /// The user picked this directory.
    Selected(String),
    /// The user backed out.
    Cancelled,
}

/// One browsing session.
#[derive(Clone, Debug)]
pub struct Browser {
    current_dir: PathBuf,
    children: Vec<String>,
    list: Viewport,
    target: BrowseTarget,
    on_drive_root: bool,
}

impl Browser {
    /// Start browsing at `start_path`, or its nearest existing ancestor.
    pub fn open(
        start_path: &str,
        target: BrowseTarget,
        total_height: usize,
        dirs: &dyn Directories,
    ) -> Self {
        let mut browser = Self {
            current_dir: resolve_start_dir(start_path, dirs),
            children: Vec::new(),
            list: Viewport::new(1),
            target,
            on_drive_root: false,
        };
        browser.load(dirs);
        browser.list.resize(total_height, browser.children.len());
        debug!(dir = %browser.current_dir.display(), ?target, "browser opened");
        browser
    }

    /// Directory being listed, or the one left for the root selector.
    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    /// Listed names, parent entry first when present.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Cursor and scroll state of the listing.
    pub fn viewport(&self) -> &Viewport {
        &self.list
    }

    /// What a confirmed selection will do.
    pub fn target(&self) -> BrowseTarget {
        self.target
    }

    /// True while the root selector is shown instead of a directory.
    pub fn on_drive_root(&self) -> bool {
        self.on_drive_root
    }

    /// Fit the listing to a new content height.
    pub fn resize(&mut self, total_height: usize) {
        self.list.resize(total_height, self.children.len());
    }

    /// Apply one key. `Selected` and `Cancelled` end the browser.
    pub fn handle_key(&mut self, key: Key, dirs: &dyn Directories) -> BrowserOutcome {
        let count = self.children.len();
        match key {
            Key::Up => self.list.move_cursor(-1, count),
            Key::Down => self.list.move_cursor(1, count),
            Key::PageUp | Key::Ctrl('u') => self.list.page_move(Direction::Backward, count),
            Key::PageDown | Key::Ctrl('d') => self.list.page_move(Direction::Forward, count),
            Key::Home => self.list.jump_home(),
            Key::End => self.list.jump_end(count),
            Key::Enter => {
                if let Some(name) = self.selected_name().map(str::to_owned) {
                    self.descend(&name, dirs);
                }
            }
            Key::Tab => return BrowserOutcome::Selected(self.confirm()),
            Key::Esc => return BrowserOutcome::Cancelled,
            Key::Char(c) if !c.is_control() => self.jump_to_letter(c),
            _ => {}
        }
        BrowserOutcome::Pending
    }

    /// Enter a child, go up on the parent entry, or pick a root in the selector.
    pub fn descend(&mut self, name: &str, dirs: &dyn Directories) {
        if self.on_drive_root {
            self.current_dir = PathBuf::from(name);
            self.on_drive_root = false;
            self.load(dirs);
            return;
        }
        if name != PARENT_ENTRY {
            self.current_dir = self.current_dir.join(name);
            self.load(dirs);
            return;
        }

        let exited = match parent_of(&self.current_dir) {
            Some(parent) => {
                let exited = self
                    .current_dir
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                self.current_dir = parent.to_path_buf();
                exited
            }
            None => {
                self.on_drive_root = true;
                Some(display(&self.current_dir))
            }
        };
        self.load(dirs);
        if let Some(exited) = exited {
            self.select_named(&exited);
        }
    }

    /// The directory being shown, or the highlighted root in the selector.
    pub fn confirm(&self) -> String {
        if self.on_drive_root {
            if let Some(root) = self.selected_name() {
                return root.to_string();
            }
        }
        display(&self.current_dir)
    }

    /// Move to the next child after the cursor starting with `ch`, ignoring
    /// case and wrapping around. The parent entry is never a target.
    pub fn jump_to_letter(&mut self, ch: char) {
        let matches: Vec<usize> = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() != PARENT_ENTRY && starts_with_folded(name, ch))
            .map(|(index, _)| index)
            .collect();
        let cursor = self.list.cursor();
        let next = matches
            .iter()
            .find(|&&index| index > cursor)
            .or_else(|| matches.first());
        if let Some(&index) = next {
            self.list.set_cursor(index, self.children.len());
        }
    }

    fn selected_name(&self) -> Option<&str> {
        self.list
            .selected(self.children.len())
            .map(|index| self.children[index].as_str())
    }

    fn select_named(&mut self, name: &str) {
        if let Some(index) = self.children.iter().position(|child| child == name) {
            self.list.set_cursor(index, self.children.len());
        }
    }

    fn load(&mut self, dirs: &dyn Directories) {
        self.children.clear();
        self.list.reset();

        if self.on_drive_root {
            self.children = dirs.roots().iter().map(|root| display(root)).collect();
            return;
        }

        if parent_of(&self.current_dir).is_some() || dirs.roots().len() > 1 {
            self.children.push(PARENT_ENTRY.to_string());
        }
        match dirs.list_children(&self.current_dir) {
            Ok(mut names) => {
                names.sort_by_cached_key(|name| name.to_lowercase());
                self.children.extend(names);
            }
            Err(err) => warn!(%err, "showing empty directory"),
        }
        self.list.ensure_visible(self.children.len());
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn starts_with_folded(name: &str, ch: char) -> bool {
    name.chars()
        .next()
        .is_some_and(|first| first.to_lowercase().eq(ch.to_lowercase()))
}

fn resolve_start_dir(start_path: &str, dirs: &dyn Directories) -> PathBuf {
    let mut candidate = Some(Path::new(start_path));
    while let Some(path) = candidate {
        if !path.as_os_str().is_empty() && dirs.exists(path) {
            return path.to_path_buf();
        }
        candidate = path.parent();
    }
    dirs.roots()
        .into_iter()
        .next()
        .unwrap_or_else(|| PathBuf::from(MAIN_SEPARATOR_STR))
}
