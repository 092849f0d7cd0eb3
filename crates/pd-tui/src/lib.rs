use anyhow::{Context, Result};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use std::io::{self, Stderr};
use tracing::{debug, warn};

use pd_core::{
    Browser, Command, Controller, Directories, EntryState, Event, ExitChoice, Key, Mode,
    PathEntry, PathStore, Prompt, Source, Viewport, HELP_LINES,
};
use pd_utils::{clip_columns, text_width, truncate_with_ellipsis};

const BROWSER_HELP: &str = " Enter: open | a-z: jump | Tab: select | Esc: cancel";
const HELP_VIEW_BAR: &str = " j/k: scroll | PgUp/PgDn: page | Esc: close";

/// Run the editor until it asks to exit.
///
/// The terminal UI is drawn on stderr so that stdout stays free for the
/// edited value.
pub fn run(controller: Controller, dirs: &dyn Directories) -> Result<(PathStore, ExitChoice)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut terminal = undo_on_error(enter_screen, leave_screen)?;

    let outcome = event_loop(&mut terminal, controller, dirs);
    restore_terminal(terminal)?;
    outcome
}

fn enter_screen() -> Result<Terminal<CrosstermBackend<Stderr>>> {
    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen).context("failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stderr)).context("failed to create terminal")
}

/// Best-effort teardown for a session that never started.
fn leave_screen() {
    if let Err(err) = execute!(io::stderr(), LeaveAlternateScreen) {
        warn!(%err, "failed to leave alternate screen");
    }
    if let Err(err) = disable_raw_mode() {
        warn!(%err, "failed to disable raw mode");
    }
}

/// Run `setup`, calling `undo` before returning its error.
fn undo_on_error<T>(setup: impl FnOnce() -> Result<T>, undo: impl FnOnce()) -> Result<T> {
    setup().map_err(|err| {
        undo();
        err
    })
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: Controller,
    dirs: &dyn Directories,
) -> Result<(PathStore, ExitChoice)> {
    let (width, height) = terminal::size().context("failed to read terminal size")?;
    let (mut controller, _) = controller.update(Event::Resize { width, height }, dirs);

    loop {
        terminal.draw(|frame| render_app(frame, &controller))?;

        let Some(event) = map_event(event::read()?) else {
            continue;
        };
        let (next, commands) = controller.update(event, dirs);
        controller = next;
        if let Some(Command::Exit(choice)) = commands.into_iter().next() {
            debug!(?choice, "editor exiting");
            return Ok((controller.into_store(), choice));
        }
    }
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stderr>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn map_event(event: TermEvent) -> Option<Event> {
    match event {
        TermEvent::Key(key) => map_key(key).map(Event::Key),
        TermEvent::Resize(width, height) => Some(Event::Resize { width, height }),
        _ => None,
    }
}

/// Translate a terminal key press into an editor key.
pub fn map_key(key: KeyEvent) -> Option<Key> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let mapped = match key.code {
        KeyCode::Up if shift => Key::ShiftUp,
        KeyCode::Down if shift => Key::ShiftDown,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Tab => Key::Tab,
        KeyCode::Delete => Key::Delete,
        KeyCode::Char(c) if ctrl => Key::Ctrl(c.to_ascii_lowercase()),
        KeyCode::Char(c) => Key::Char(c),
        _ => return None,
    };
    Some(mapped)
}

fn render_app(frame: &mut Frame, controller: &Controller) {
    let size = frame.size();
    let warning_rows = u16::from(controller.host().warning.is_some());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(warning_rows),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(size);

    match controller.mode() {
        Mode::Browsing(browser) => render_browser(frame, chunks[0], browser),
        Mode::Help(view) => render_help(frame, chunks[0], view),
        Mode::Main | Mode::Prompting(_) => render_list(frame, chunks[0], controller),
    }

    if let Some(warning) = &controller.host().warning {
        let line = Line::from(Span::styled(
            format!(" Warning: {warning}"),
            Style::default().fg(Color::Yellow),
        ));
        frame.render_widget(Paragraph::new(line), chunks[1]);
    }

    let width = usize::from(size.width);
    let bar = match controller.mode() {
        Mode::Prompting(prompt) => prompt_line(prompt),
        Mode::Browsing(_) => Line::from(truncate_with_ellipsis(BROWSER_HELP, width)),
        Mode::Help(_) => Line::from(truncate_with_ellipsis(HELP_VIEW_BAR, width)),
        Mode::Main => Line::from(truncate_with_ellipsis(
            &help_bar(controller.host().sectioned),
            width,
        )),
    };
    frame.render_widget(Paragraph::new(bar), chunks[2]);
}

fn help_bar(sectioned: bool) -> String {
    let add = if sectioned {
        "a/A: add user/system"
    } else {
        "a: add"
    };
    format!(" Tab: edit | {add} | c: clean | Del: delete | ?: help | q: quit")
}

fn render_list(frame: &mut Frame, area: Rect, controller: &Controller) {
    let entries = controller.store().entries();
    let view = controller.list();
    let width = usize::from(area.width);
    let scrollbar = scrollbar_cells(view, entries.len());

    let mut lines: Vec<Line> = view
        .visible_range(entries.len())
        .zip(scrollbar.iter().cloned())
        .map(|(index, scroll)| {
            let entry = &entries[index];
            entry_line(entry, index == view.cursor(), view.h_offset(), width, scroll)
        })
        .collect();
    for scroll in scrollbar.into_iter().skip(lines.len()) {
        lines.push(blank_row(width, scroll));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn entry_line(
    entry: &PathEntry,
    is_cursor: bool,
    h_offset: usize,
    width: usize,
    scroll: Span<'static>,
) -> Line<'static> {
    let state = match entry.state() {
        EntryState::Deleted => Span::styled("-", Style::default().fg(Color::Red)),
        EntryState::Added => Span::styled("+", Style::default().fg(Color::Green)),
        EntryState::Modified => Span::styled("*", Style::default().fg(Color::Red)),
        EntryState::Clean => Span::raw(" "),
    };
    let missing = Style::default().fg(Color::Blue);
    let marker = match (is_cursor, entry.exists) {
        (true, true) => Span::raw(">"),
        (true, false) => Span::styled(">", missing),
        (false, false) => Span::styled("?", missing),
        (false, true) => Span::raw(" "),
    };

    // Two columns of markers on the left, a gap and the scrollbar on the right.
    let content_width = width.saturating_sub(4);
    let remaining = text_width(&entry.path).saturating_sub(h_offset);
    let has_left = h_offset > 0 && !entry.path.is_empty();
    let mut display_width = content_width.saturating_sub(usize::from(has_left));
    let has_right = remaining > display_width;
    if has_right {
        display_width = display_width.saturating_sub(1);
    }
    let shown = clip_columns(&entry.path, h_offset, display_width);

    let current = 2 + usize::from(has_left) + text_width(&shown);
    let target = width.saturating_sub(2 + usize::from(has_right));
    let overflow = Style::default().fg(Color::Green);

    let mut spans = vec![state, marker];
    if has_left {
        spans.push(Span::styled("<", overflow));
    }
    spans.push(Span::styled(shown, path_style(entry)));
    spans.push(Span::raw(" ".repeat(target.saturating_sub(current))));
    if has_right {
        spans.push(Span::styled(">", overflow));
    }
    spans.push(Span::raw(" "));
    spans.push(scroll);
    Line::from(spans)
}

fn path_style(entry: &PathEntry) -> Style {
    let style = match entry.state() {
        EntryState::Deleted => Style::default().fg(Color::Red),
        EntryState::Added => Style::default().fg(Color::Green),
        EntryState::Modified | EntryState::Clean => Style::default(),
    };
    if entry.source == Source::System {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

fn render_browser(frame: &mut Frame, area: Rect, browser: &Browser) {
    let width = usize::from(area.width);
    let children = browser.children();
    let view = browser.viewport();

    let header = if browser.on_drive_root() {
        "Select drive:".to_string()
    } else {
        format!("Select directory: {}", browser.current_dir().display())
    };
    let mut lines = vec![Line::from(Span::styled(
        truncate_with_ellipsis(&header, width.saturating_sub(1)),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    let scrollbar = scrollbar_cells(view, children.len());
    for (index, scroll) in view
        .visible_range(children.len())
        .zip(scrollbar.iter().cloned())
    {
        let prefix = if index == view.cursor() { ">" } else { " " };
        lines.push(text_row(&format!("{prefix} {}", children[index]), width, scroll));
    }
    let drawn = lines.len() - 1;
    for scroll in scrollbar.into_iter().skip(drawn) {
        lines.push(blank_row(width, scroll));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_help(frame: &mut Frame, area: Rect, view: &Viewport) {
    let width = usize::from(area.width);
    let scrollbar = scrollbar_cells(view, HELP_LINES.len());
    let mut lines: Vec<Line> = view
        .visible_range(HELP_LINES.len())
        .zip(scrollbar.iter().cloned())
        .map(|(index, scroll)| text_row(HELP_LINES[index], width, scroll))
        .collect();
    for scroll in scrollbar.into_iter().skip(lines.len()) {
        lines.push(blank_row(width, scroll));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

/// Plain text cut to fit, padded so the scrollbar lands in the last column.
fn text_row(text: &str, width: usize, scroll: Span<'static>) -> Line<'static> {
    let row_width = width.saturating_sub(2);
    let text = truncate_with_ellipsis(text, row_width);
    let padding = " ".repeat(row_width.saturating_sub(text_width(&text)) + 1);
    Line::from(vec![Span::raw(text), Span::raw(padding), scroll])
}

fn prompt_line(prompt: &Prompt) -> Line<'static> {
    let mut spans = vec![Span::raw(format!("{}  ", prompt.question()))];
    for (index, option) in prompt.options().iter().enumerate() {
        let (open, close) = if index == prompt.selected() {
            ("[", "]")
        } else {
            (" ", " ")
        };
        let mut chars = option.chars();
        let first = chars.next().map(String::from).unwrap_or_default();
        spans.push(Span::raw(open));
        spans.push(Span::styled(
            first,
            Style::default().add_modifier(Modifier::UNDERLINED),
        ));
        spans.push(Span::raw(format!("{}{close}  ", chars.as_str())));
    }
    spans.push(Span::raw("(Esc to cancel)"));
    Line::from(spans)
}

fn scrollbar_cells(view: &Viewport, item_count: usize) -> Vec<Span<'static>> {
    let height = view.visible_height();
    if !view.is_scrollable(item_count) {
        return vec![Span::raw(" "); height];
    }
    let (start, len) = view.scrollbar(item_count);
    (0..height)
        .map(|row| {
            let color = if (start..start + len).contains(&row) {
                Color::White
            } else {
                Color::DarkGray
            };
            Span::styled(" ", Style::default().bg(color))
        })
        .collect()
}

fn blank_row(width: usize, scroll: Span<'static>) -> Line<'static> {
    Line::from(vec![Span::raw(" ".repeat(width.saturating_sub(1))), scroll])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pd_core::{CoreResult, HostConfig};
    use ratatui::backend::TestBackend;
    use std::path::{Path, PathBuf};

    /// Every path exists and every directory holds `bin` and `lib`.
    struct StubDirs;

    impl Directories for StubDirs {
        fn list_children(&self, _path: &Path) -> CoreResult<Vec<String>> {
            Ok(vec!["lib".into(), "bin".into()])
        }

        fn exists(&self, _path: &Path) -> bool {
            true
        }

        fn roots(&self) -> Vec<PathBuf> {
            vec![PathBuf::from("/")]
        }
    }

    fn host() -> HostConfig {
        HostConfig {
            sectioned: false,
            separator: ':',
            normalize: |path: &str| path.to_string(),
            warning: None,
            add_start: None,
        }
    }

    fn press(controller: Controller, keys: &[Key]) -> Controller {
        keys.iter().fold(controller, |controller, key| {
            controller.update(Event::Key(*key), &StubDirs).0
        })
    }

    fn draw(controller: &Controller, width: u16, height: u16) -> Vec<String> {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|frame| render_app(frame, controller))
            .expect("render");
        buffer_lines(terminal.backend().buffer())
    }

    fn buffer_lines(buffer: &ratatui::buffer::Buffer) -> Vec<String> {
        let mut lines = Vec::new();
        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer.get(x, y).symbol());
            }
            lines.push(line.trim_end().to_string());
        }
        lines
    }

    #[test]
    fn render_snapshot() {
        let entries = vec![
            PathEntry::new("/usr/bin", Source::None, true),
            PathEntry::new("/gone", Source::None, false),
            PathEntry::new("/opt/a/very/long/directory/name", Source::None, true),
        ];
        let controller = press(Controller::new(entries, host(), 30, 5), &[Key::Delete]);

        let snapshot = draw(&controller, 30, 5).join("\n");
        insta::assert_snapshot!(snapshot, @r###"
->/usr/bin
 ?/gone
  /opt/a/very/long/director>

 Tab: edit | a: add | c: cl...
"###);
    }

    #[test]
    fn horizontal_scroll_shows_left_marker() {
        let entries = vec![PathEntry::new("/opt/a/very/long/directory/name", Source::None, true)];
        let controller = press(Controller::new(entries, host(), 30, 3), &[Key::Right, Key::Right]);
        assert_eq!(controller.list().h_offset(), 2);

        let lines = draw(&controller, 30, 3);
        assert_eq!(lines[0], " ><pt/a/very/long/directory>");
    }

    #[test]
    fn browser_shows_header_and_children() {
        let entries = vec![PathEntry::new("/usr", Source::None, true)];
        let controller = press(Controller::new(entries, host(), 40, 6), &[Key::Tab]);
        assert!(matches!(controller.mode(), Mode::Browsing(_)));

        let lines = draw(&controller, 40, 6);
        assert_eq!(lines[0], "Select directory: /usr");
        assert_eq!(lines[1], "> ..");
        assert_eq!(lines[2], "  bin");
        assert_eq!(lines[3], "  lib");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], " Enter: open | a-z: jump | Tab: selec...");
    }

    #[test]
    fn help_view_scrolls_through_key_reference() {
        let entries = vec![PathEntry::new("/usr/bin", Source::None, true)];
        let controller = press(Controller::new(entries, host(), 40, 6), &[Key::Char('?')]);

        let backend = TestBackend::new(40, 6);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|frame| render_app(frame, &controller))
            .expect("render");
        let lines = buffer_lines(terminal.backend().buffer());
        assert_eq!(lines[0], "pathed key bindings");
        assert_eq!(lines[2], "List");
        assert_eq!(lines[3], "  Up/Down, j/k          move cursor");
        assert!(lines[5].starts_with(" j/k: scroll"));
        assert_eq!(terminal.backend().buffer().get(39, 0).bg, Color::White);

        let controller = press(controller, &[Key::Char('j')]);
        let lines = draw(&controller, 40, 6);
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "List");

        let controller = press(controller, &[Key::Esc]);
        assert_eq!(draw(&controller, 40, 6)[0], " >/usr/bin");
    }

    #[test]
    fn failed_setup_runs_undo() {
        let undone = std::cell::Cell::new(false);
        let result: Result<()> =
            undo_on_error(|| Err(anyhow::anyhow!("no terminal")), || undone.set(true));
        assert!(result.is_err());
        assert!(undone.get());

        let undone = std::cell::Cell::new(false);
        let value = undo_on_error(|| Ok(7), || undone.set(true)).expect("setup");
        assert_eq!(value, 7);
        assert!(!undone.get());
    }

    #[test]
    fn prompt_and_warning_replace_bottom_rows() {
        let mut host = host();
        host.warning = Some("profile is read-only".into());
        let entries = vec![PathEntry::new("/usr/bin", Source::None, true)];
        let controller = press(
            Controller::new(entries, host, 60, 5),
            &[Key::Delete, Key::Char('q')],
        );

        let lines = draw(&controller, 60, 5);
        assert_eq!(lines[3], " Warning: profile is read-only");
        assert_eq!(
            lines[4],
            "Output edited PATH?  [Edited]   Original   (Esc to cancel)"
        );
    }

    #[test]
    fn scrollbar_marks_thumb_when_list_overflows() {
        let entries = (0..20)
            .map(|index| PathEntry::new(format!("/p{index}"), Source::None, true))
            .collect();
        let controller = Controller::new(entries, host(), 20, 6);
        let backend = TestBackend::new(20, 6);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|frame| render_app(frame, &controller))
            .expect("render");
        let buffer = terminal.backend().buffer();
        assert_eq!(buffer.get(19, 0).bg, Color::White);
        assert_eq!(buffer.get(19, 4).bg, Color::DarkGray);
    }

    #[test]
    fn key_mapping_handles_modifiers_and_releases() {
        let shift_up = KeyEvent::new(KeyCode::Up, KeyModifiers::SHIFT);
        assert_eq!(map_key(shift_up), Some(Key::ShiftUp));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), Some(Key::Ctrl('c')));

        let upper = KeyEvent::new(KeyCode::Char('J'), KeyModifiers::SHIFT);
        assert_eq!(map_key(upper), Some(Key::Char('J')));

        let mut release = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_key(release), None);

        assert_eq!(map_key(KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE)), None);
        assert_eq!(
            map_event(TermEvent::Resize(100, 30)),
            Some(Event::Resize {
                width: 100,
                height: 30
            })
        );
    }
}
