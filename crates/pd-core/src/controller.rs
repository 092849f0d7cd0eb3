//! Top-level state machine: routes input to the list, the browser, or the
//! quit prompt, and folds their results back into the store.

use tracing::{debug, info};

use crate::browser::{BrowseTarget, Browser, BrowserOutcome};
use crate::help::HELP_LINES;
use crate::prompt::{Prompt, PromptOutcome};
use crate::store::PathStore;
use crate::viewport::{Direction, Viewport};
use crate::{Directories, NormalizeFn, PathEntry, Source};

/// Keys the editor understands, independent of the terminal backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Enter,
    Esc,
    Tab,
    Delete,
    ShiftUp,
    ShiftDown,
    Char(char),
    Ctrl(char),
}

/// Input delivered by the event loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Key(Key),
    Resize { width: u16, height: u16 },
}

/// How the session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitChoice {
    /// Persist, or print the edited value.
    Save,
    /// Leave the host untouched, or print the original value.
    Discard,
}

/// Side effects requested by [`Controller::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Exit(ExitChoice),
}

/// Host facts the editor needs at startup.
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Whether entries are split into system and user sections.
    pub sectioned: bool,
    /// Separator used to join entries.
    pub separator: char,
    /// Normalization applied before duplicate comparison.
    pub normalize: NormalizeFn,
    /// Non-fatal warning shown above the help bar.
    pub warning: Option<String>,
    /// Directory the browser starts in when adding.
    pub add_start: Option<String>,
}

impl HostConfig {
    /// Rows below the list taken by the help bar and the warning line.
    pub fn reserved_rows(&self) -> usize {
        1 + usize::from(self.warning.is_some())
    }

    fn quit_prompt(&self) -> Prompt {
        if self.sectioned {
            Prompt::new("Persist changes?", &["Persist", "Don't persist"])
        } else {
            Prompt::new("Output edited PATH?", &["Edited", "Original"])
        }
    }
}

/// The active input mode. Only one exists at a time.
#[derive(Clone, Debug)]
pub enum Mode {
    Main,
    Browsing(Browser),
    Prompting(Prompt),
    /// Scrollable key reference over [`HELP_LINES`].
    Help(Viewport),
}

/// Editor state.
#[derive(Clone, Debug)]
pub struct Controller {
    store: PathStore,
    list: Viewport,
    mode: Mode,
    host: HostConfig,
    width: usize,
}

impl Controller {
    /// Start in the main view sized to a `width` by `height` terminal.
    pub fn new(entries: Vec<PathEntry>, host: HostConfig, width: u16, height: u16) -> Self {
        let mut controller = Self {
            store: PathStore::new(entries),
            list: Viewport::new(0),
            mode: Mode::Main,
            host,
            width: 0,
        };
        controller.resize(width, height);
        controller
    }

    /// Entries being edited.
    pub fn store(&self) -> &PathStore {
        &self.store
    }

    /// Viewport of the main list.
    pub fn list(&self) -> &Viewport {
        &self.list
    }

    /// Active input mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Host facts given at startup.
    pub fn host(&self) -> &HostConfig {
        &self.host
    }

    /// Terminal width in columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Consume the controller, keeping the edited entries.
    pub fn into_store(self) -> PathStore {
        self.store
    }

    /// Apply one event and return the next state with any requested effects.
    pub fn update(mut self, event: Event, dirs: &dyn Directories) -> (Self, Vec<Command>) {
        let commands = match event {
            Event::Resize { width, height } => {
                self.resize(width, height);
                Vec::new()
            }
            Event::Key(Key::Ctrl('c')) => vec![Command::Exit(ExitChoice::Discard)],
            Event::Key(key) => match std::mem::replace(&mut self.mode, Mode::Main) {
                Mode::Main => self.update_main(key, dirs),
                Mode::Browsing(browser) => self.update_browser(browser, key, dirs),
                Mode::Prompting(prompt) => self.update_prompt(prompt, key),
                Mode::Help(view) => self.update_help(view, key),
            },
        };
        (self, commands)
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = usize::from(width);
        let height = usize::from(height)
            .saturating_sub(self.host.reserved_rows())
            .max(1);
        self.list.resize(height, self.store.len());
        match &mut self.mode {
            Mode::Browsing(browser) => browser.resize(height),
            Mode::Help(view) => view.resize(height, HELP_LINES.len()),
            Mode::Main | Mode::Prompting(_) => {}
        }
    }

    fn update_main(&mut self, key: Key, dirs: &dyn Directories) -> Vec<Command> {
        let count = self.store.len();
        let selected = self.list.selected(count);
        match key {
            Key::Char('q') => {
                if !self.store.has_modifications() {
                    return vec![Command::Exit(ExitChoice::Discard)];
                }
                self.mode = Mode::Prompting(self.host.quit_prompt());
            }
            Key::Up | Key::Char('k') => self.list.move_cursor(-1, count),
            Key::Down | Key::Char('j') => self.list.move_cursor(1, count),
            Key::Left => self.list.scroll_horizontal(
                Direction::Backward,
                self.max_path_width(),
                self.width,
            ),
            Key::Right => self.list.scroll_horizontal(
                Direction::Forward,
                self.max_path_width(),
                self.width,
            ),
            Key::PageUp | Key::Ctrl('u') => self.list.page_move(Direction::Backward, count),
            Key::PageDown | Key::Ctrl('d') => self.list.page_move(Direction::Forward, count),
            Key::Home | Key::Char('g') => self.list.jump_home(),
            Key::End | Key::Char('G') => self.list.jump_end(count),
            Key::ShiftUp | Key::Char('K') => self.move_selected(selected, Direction::Backward),
            Key::ShiftDown | Key::Char('J') => self.move_selected(selected, Direction::Forward),
            Key::Delete => {
                if let Some(index) = selected {
                    self.store.toggle_delete(index);
                }
            }
            Key::Tab | Key::Enter => {
                if let Some(index) = selected {
                    let browser = Browser::open(
                        &self.store.entries()[index].path,
                        BrowseTarget::Edit(index),
                        self.list.total_height(),
                        dirs,
                    );
                    self.mode = Mode::Browsing(browser);
                }
            }
            Key::Char('a') => {
                let source = if self.host.sectioned {
                    Source::User
                } else {
                    Source::None
                };
                self.open_add(source, dirs);
            }
            Key::Char('A') if self.host.sectioned => self.open_add(Source::System, dirs),
            Key::Char('c') => {
                let marked = self.store.clean(self.host.normalize);
                info!(marked, "marked duplicate and missing entries");
            }
            Key::Char('?') => {
                let mut view = Viewport::new(0);
                view.resize(self.list.total_height(), HELP_LINES.len());
                self.mode = Mode::Help(view);
            }
            _ => {}
        }
        Vec::new()
    }

    fn update_browser(
        &mut self,
        mut browser: Browser,
        key: Key,
        dirs: &dyn Directories,
    ) -> Vec<Command> {
        match browser.handle_key(key, dirs) {
            BrowserOutcome::Pending => self.mode = Mode::Browsing(browser),
            BrowserOutcome::Cancelled => debug!("browser cancelled"),
            BrowserOutcome::Selected(path) => match browser.target() {
                BrowseTarget::Edit(index) => {
                    debug!(index, %path, "editing entry");
                    self.store.edit_path(index, &path, dirs);
                }
                BrowseTarget::Add(source) => {
                    debug!(?source, %path, "adding entry");
                    let index = self.store.insert_new(&path, source, dirs);
                    self.list.set_cursor(index, self.store.len());
                }
            },
        }
        Vec::new()
    }

    fn update_prompt(&mut self, mut prompt: Prompt, key: Key) -> Vec<Command> {
        match prompt.handle_key(key) {
            PromptOutcome::Pending => self.mode = Mode::Prompting(prompt),
            PromptOutcome::Cancelled => {}
            PromptOutcome::Confirmed(0) => return vec![Command::Exit(ExitChoice::Save)],
            PromptOutcome::Confirmed(_) => return vec![Command::Exit(ExitChoice::Discard)],
        }
        Vec::new()
    }

    fn update_help(&mut self, mut view: Viewport, key: Key) -> Vec<Command> {
        let count = HELP_LINES.len();
        let page = isize::try_from(view.visible_height()).unwrap_or(isize::MAX);
        match key {
            Key::Esc | Key::Char('?' | 'h') => return Vec::new(),
            Key::Up | Key::Char('k') => view.scroll_by(-1, count),
            Key::Down | Key::Char('j') => view.scroll_by(1, count),
            Key::PageUp | Key::Ctrl('u') => view.scroll_by(-page, count),
            Key::PageDown | Key::Ctrl('d') => view.scroll_by(page, count),
            Key::Home | Key::Char('g') => view.jump_home(),
            Key::End | Key::Char('G') => view.scroll_by(isize::MAX, count),
            _ => {}
        }
        self.mode = Mode::Help(view);
        Vec::new()
    }

    fn open_add(&mut self, source: Source, dirs: &dyn Directories) {
        let start = self.host.add_start.clone().unwrap_or_default();
        let browser = Browser::open(
            &start,
            BrowseTarget::Add(source),
            self.list.total_height(),
            dirs,
        );
        self.mode = Mode::Browsing(browser);
    }

    fn move_selected(&mut self, selected: Option<usize>, direction: Direction) {
        let Some(index) = selected else {
            return;
        };
        if let Some(moved) = self.store.move_entry(index, direction) {
            self.list.set_cursor(moved, self.store.len());
        }
    }

    fn max_path_width(&self) -> usize {
        self.store
            .entries()
            .iter()
            .map(|entry| entry.path.chars().count())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirs;
    use crate::EntryState;

    fn host(sectioned: bool) -> HostConfig {
        HostConfig {
            sectioned,
            separator: ':',
            normalize: |path: &str| path.to_string(),
            warning: None,
            add_start: None,
        }
    }

    fn env_controller(paths: &[&str]) -> Controller {
        let entries = paths
            .iter()
            .map(|path| PathEntry::new(*path, Source::None, true))
            .collect();
        Controller::new(entries, host(false), 80, 12)
    }

    fn press(controller: Controller, keys: &[Key], dirs: &FakeDirs) -> (Controller, Vec<Command>) {
        let mut controller = controller;
        let mut commands = Vec::new();
        for key in keys {
            let (next, mut issued) = controller.update(Event::Key(*key), dirs);
            controller = next;
            assert!(controller.store().sections_contiguous());
            commands.append(&mut issued);
        }
        (controller, commands)
    }

    #[test]
    fn empty_store_survives_every_key() {
        let dirs = FakeDirs::with_dirs(&["/usr/bin"]);
        let keys = [
            Key::Up,
            Key::Down,
            Key::Left,
            Key::Right,
            Key::PageUp,
            Key::PageDown,
            Key::Home,
            Key::End,
            Key::Enter,
            Key::Esc,
            Key::Tab,
            Key::Delete,
            Key::ShiftUp,
            Key::ShiftDown,
            Key::Char('J'),
            Key::Char('K'),
            Key::Char('c'),
            Key::Char('q'),
            Key::Char('A'),
            Key::Char('a'),
            Key::Char('?'),
        ];
        for key in keys {
            let (controller, _) = press(env_controller(&[]), &[key], &dirs);
            assert!(controller.store().is_empty(), "{key:?}");
            assert!(!controller.store().has_modifications());
        }
    }

    #[test]
    fn quit_without_changes_exits_immediately() {
        let dirs = FakeDirs::default();
        let (controller, commands) = press(env_controller(&["/bin"]), &[Key::Char('q')], &dirs);
        assert_eq!(commands, vec![Command::Exit(ExitChoice::Discard)]);
        assert!(matches!(controller.mode(), Mode::Main));
    }

    #[test]
    fn quit_with_changes_prompts_and_escape_returns_to_main() {
        let dirs = FakeDirs::default();
        let (controller, commands) = press(
            env_controller(&["/bin", "/usr/bin"]),
            &[Key::Delete, Key::Char('q')],
            &dirs,
        );
        assert!(commands.is_empty());
        let Mode::Prompting(prompt) = controller.mode() else {
            panic!("expected prompt");
        };
        assert_eq!(prompt.options(), ["Edited", "Original"]);

        let (controller, commands) = press(controller, &[Key::Esc], &dirs);
        assert!(commands.is_empty());
        assert!(matches!(controller.mode(), Mode::Main));

        let (_, commands) = press(controller, &[Key::Char('q'), Key::Enter], &dirs);
        assert_eq!(commands, vec![Command::Exit(ExitChoice::Save)]);
    }

    #[test]
    fn sectioned_quit_prompt_offers_persist() {
        let dirs = FakeDirs::default();
        let entries = vec![PathEntry::new("/sys", Source::System, true)];
        let controller = Controller::new(entries, host(true), 80, 12);
        let (controller, _) = press(controller, &[Key::Delete, Key::Char('q')], &dirs);
        let Mode::Prompting(prompt) = controller.mode() else {
            panic!("expected prompt");
        };
        assert_eq!(prompt.question(), "Persist changes?");
        let (_, commands) = press(controller, &[Key::Char('d')], &dirs);
        assert_eq!(commands, vec![Command::Exit(ExitChoice::Discard)]);
    }

    #[test]
    fn add_inserts_selected_directory_and_moves_cursor() {
        let dirs = FakeDirs::with_dirs(&["/opt/tools", "/usr/bin"]);
        let (controller, _) = press(
            env_controller(&["/bin", "/usr/bin"]),
            &[Key::Char('a'), Key::Char('o'), Key::Enter, Key::Down, Key::Enter, Key::Tab],
            &dirs,
        );
        assert!(matches!(controller.mode(), Mode::Main));
        let entry = &controller.store().entries()[2];
        assert_eq!(entry.path, "/opt/tools");
        assert_eq!(entry.state(), EntryState::Added);
        assert!(entry.exists);
        assert_eq!(controller.list().cursor(), 2);
        assert_eq!(
            controller.store().build_output_string(':'),
            "/bin:/usr/bin:/opt/tools"
        );
    }

    #[test]
    fn add_system_entry_lands_before_user_section() {
        let dirs = FakeDirs::with_dirs(&["/sys/extra"]);
        let entries = vec![
            PathEntry::new("/sys", Source::System, true),
            PathEntry::new("/home/me/bin", Source::User, true),
        ];
        let controller = Controller::new(entries, host(true), 80, 12);
        let (controller, _) = press(
            controller,
            &[Key::Char('A'), Key::Enter, Key::Char('e'), Key::Enter, Key::Tab],
            &dirs,
        );
        let entry = &controller.store().entries()[1];
        assert_eq!(entry.path, "/sys/extra");
        assert_eq!(entry.source, Source::System);
        assert_eq!(controller.list().cursor(), 1);
    }

    #[test]
    fn add_system_is_ignored_without_sections() {
        let dirs = FakeDirs::default();
        let (controller, _) = press(env_controller(&["/bin"]), &[Key::Char('A')], &dirs);
        assert!(matches!(controller.mode(), Mode::Main));
    }

    #[test]
    fn edit_replaces_path_of_current_entry() {
        let dirs = FakeDirs::with_dirs(&["/usr/bin", "/usr/lib"]);
        let (controller, _) = press(
            env_controller(&["/usr/bin"]),
            &[Key::Tab, Key::Enter, Key::Char('l'), Key::Enter, Key::Tab],
            &dirs,
        );
        let entry = &controller.store().entries()[0];
        assert_eq!(entry.path, "/usr/lib");
        assert_eq!(entry.state(), EntryState::Modified);
    }

    #[test]
    fn cancelled_browser_leaves_store_untouched() {
        let dirs = FakeDirs::with_dirs(&["/usr/bin"]);
        let (controller, _) = press(
            env_controller(&["/usr/bin"]),
            &[Key::Enter, Key::Enter, Key::Esc],
            &dirs,
        );
        assert!(matches!(controller.mode(), Mode::Main));
        assert!(!controller.store().has_modifications());
    }

    #[test]
    fn force_quit_works_inside_browser() {
        let dirs = FakeDirs::with_dirs(&["/usr/bin"]);
        let (_, commands) = press(env_controller(&["/usr/bin"]), &[Key::Tab, Key::Ctrl('c')], &dirs);
        assert_eq!(commands, vec![Command::Exit(ExitChoice::Discard)]);
    }

    #[test]
    fn moving_entries_carries_cursor_and_respects_sections() {
        let dirs = FakeDirs::default();
        let entries = vec![
            PathEntry::new("/sys1", Source::System, true),
            PathEntry::new("/sys2", Source::System, true),
            PathEntry::new("/user1", Source::User, true),
        ];
        let controller = Controller::new(entries, host(true), 80, 12);
        let (controller, _) = press(controller, &[Key::Char('J')], &dirs);
        assert_eq!(controller.list().cursor(), 1);
        assert_eq!(controller.store().entries()[1].path, "/sys1");

        let (controller, _) = press(controller, &[Key::ShiftDown], &dirs);
        assert_eq!(controller.list().cursor(), 1);
        assert_eq!(controller.store().entries()[2].path, "/user1");
    }

    #[test]
    fn clean_key_marks_duplicates() {
        let dirs = FakeDirs::default();
        let (controller, _) = press(
            env_controller(&["/usr/bin", "/usr/bin"]),
            &[Key::Char('c')],
            &dirs,
        );
        assert!(controller.store().entries()[1].is_deleted());
        assert_eq!(controller.store().build_output_string(':'), "/usr/bin");
    }

    #[test]
    fn help_opens_scrolls_and_closes() {
        let dirs = FakeDirs::default();
        let (controller, _) = press(
            env_controller(&["/bin"]),
            &[Key::Char('?'), Key::Char('j'), Key::Down],
            &dirs,
        );
        let Mode::Help(view) = controller.mode() else {
            panic!("expected help");
        };
        assert_eq!(view.visible_height(), 11);
        assert_eq!(view.offset(), 2);

        let (controller, _) = press(controller, &[Key::End, Key::Char('k')], &dirs);
        let Mode::Help(view) = controller.mode() else {
            panic!("expected help");
        };
        assert_eq!(view.offset(), HELP_LINES.len() - 12);

        let (controller, commands) =
            press(controller, &[Key::Delete, Key::Char('q'), Key::Esc], &dirs);
        assert!(commands.is_empty());
        assert!(matches!(controller.mode(), Mode::Main));
        assert!(!controller.store().has_modifications());

        for close in [Key::Char('?'), Key::Char('h')] {
            let (controller, _) = press(env_controller(&["/bin"]), &[Key::Char('?'), close], &dirs);
            assert!(matches!(controller.mode(), Mode::Main), "{close:?}");
        }
    }

    #[test]
    fn help_view_follows_resize() {
        let dirs = FakeDirs::default();
        let (controller, _) = press(env_controller(&["/bin"]), &[Key::Char('?'), Key::End], &dirs);
        let (controller, _) = controller.update(Event::Resize { width: 80, height: 24 }, &dirs);
        let Mode::Help(view) = controller.mode() else {
            panic!("expected help");
        };
        assert_eq!(view.visible_height(), 23);
        assert_eq!(view.offset(), HELP_LINES.len() - 23);
    }

    #[test]
    fn resize_reserves_rows_for_help_and_warning() {
        let dirs = FakeDirs::with_dirs(&["/usr/bin"]);
        let mut host = host(true);
        host.warning = Some("profile is read-only".into());
        let entries = vec![PathEntry::new("/usr/bin", Source::User, true)];
        let controller = Controller::new(entries, host, 80, 24);
        assert_eq!(controller.list().visible_height(), 22);

        let (controller, _) = press(controller, &[Key::Tab], &dirs);
        let (controller, _) = controller.update(Event::Resize { width: 40, height: 10 }, &dirs);
        assert_eq!(controller.list().visible_height(), 8);
        assert_eq!(controller.width(), 40);
        let Mode::Browsing(browser) = controller.mode() else {
            panic!("expected browser");
        };
        assert_eq!(browser.viewport().visible_height(), 7);
    }
}
