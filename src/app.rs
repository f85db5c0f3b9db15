use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::sync::mpsc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme as SyntectTheme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use treeshelf::model::config::AppConfig;
use treeshelf::model::mode::{Mode, NamePurpose};
use treeshelf::model::node::{Node, NodeId};
use treeshelf::model::note_editor::Direction as MoveDir;
use treeshelf::model::view::ViewMode;
use treeshelf::preview::docx::{BlockStyle, DocxDocument};
use treeshelf::preview::worker::spawn_decode;
use treeshelf::preview::{PreviewBody, PreviewKind, PreviewTicket, classify};
use treeshelf::session::{Opened, Session};

use crate::msg::Msg;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const HELP: &[&str] = &[
    "j/k move  l/Enter open  h back  0-9 jump to breadcrumb",
    "f new folder  n new note  r rename  R rename current folder  d delete",
    "b bookmark  B bookmark view  / search  t theme  q quit",
    ":import <path>  :export <path>  :html <path>  :theme  :bookmarks  :root",
];

#[derive(Debug, Clone, Copy)]
struct Palette {
    bg: Color,
    surface: Color,
    fg: Color,
    muted: Color,
    accent: Color,
    selection_fg: Color,
    selection_bg: Color,
    bookmark: Color,
    error: Color,
}

const DARK: Palette = Palette {
    bg: Color::Rgb(12, 12, 18),
    surface: Color::Rgb(20, 20, 30),
    fg: Color::Rgb(200, 200, 210),
    muted: Color::DarkGray,
    accent: Color::Cyan,
    selection_fg: Color::Black,
    selection_bg: Color::Cyan,
    bookmark: Color::Yellow,
    error: Color::LightRed,
};

const LIGHT: Palette = Palette {
    bg: Color::Rgb(250, 250, 246),
    surface: Color::Rgb(234, 234, 228),
    fg: Color::Rgb(40, 40, 48),
    muted: Color::Gray,
    accent: Color::Blue,
    selection_fg: Color::White,
    selection_bg: Color::Blue,
    bookmark: Color::Rgb(180, 120, 0),
    error: Color::Red,
};

/// Highlighted lines of the open text preview.
struct HighlightCache {
    ticket: PreviewTicket,
    dark: bool,
    lines: Vec<Line<'static>>,
}

pub struct App {
    pub mode: Mode,
    pub session: Session,
    pub config: AppConfig,
    pub should_quit: bool,
    event_tx: mpsc::Sender<Msg>,
    selected: usize,
    list_offset: usize,
    input: String,
    notifications: VecDeque<String>,
    preview_scroll: u16,
    highlight_cache: Option<HighlightCache>,
    show_help: bool,
}

impl App {
    pub fn new(config: AppConfig, session: Session, event_tx: mpsc::Sender<Msg>) -> Self {
        Self {
            mode: Mode::Browse,
            session,
            config,
            should_quit: false,
            event_tx,
            selected: 0,
            list_offset: 0,
            input: String::new(),
            notifications: VecDeque::new(),
            preview_scroll: 0,
            highlight_cache: None,
            show_help: false,
        }
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) {
        match msg {
            Msg::Key(key) => self.handle_key(key),
            Msg::Resize(_w, _h) => {}
            Msg::PreviewDecoded(outcome) => {
                if self.session.apply_decoded(outcome) {
                    self.highlight_cache = None;
                    self.preview_scroll = 0;
                }
            }
            Msg::Quit => self.should_quit = true,
        }

        if let Some(warning) = self.session.take_storage_warning() {
            self.push_notification(warning);
        }
        self.clamp_selection();
    }

    /// Saves an open note draft before exit.
    pub fn shutdown(&mut self) {
        self.session.close_preview();
    }

    fn push_notification(&mut self, message: impl Into<String>) {
        self.notifications.push_back(message.into());
        while self.notifications.len() > 8 {
            self.notifications.pop_front();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.show_help {
            self.show_help = false;
            return;
        }

        match self.mode.clone() {
            Mode::Browse => self.handle_key_browse(key),
            Mode::Search => self.handle_key_search(key),
            Mode::NameInput(purpose) => self.handle_key_name(key, purpose),
            Mode::ConfirmDelete(id) => self.handle_key_confirm_delete(key, id),
            Mode::Preview => self.handle_key_preview(key),
            Mode::NoteEdit => self.handle_key_note_edit(key),
            Mode::Command => self.handle_key_command(key),
        }
    }

    fn handle_key_browse(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                let _ = self.event_tx.send(Msg::Quit);
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => self.open_selected(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => self.go_up(),
            KeyCode::Char(digit @ '0'..='9') => {
                let index = digit as usize - '0' as usize;
                self.jump_to_crumb(index);
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
            }
            KeyCode::Esc => {
                self.session.set_search("");
            }
            KeyCode::Char('f') => self.begin_name_input(NamePurpose::NewFolder, String::new()),
            KeyCode::Char('n') => self.begin_name_input(NamePurpose::NewNote, String::new()),
            KeyCode::Char('r') => {
                let target = self
                    .selected_node()
                    .map(|node| (node.id().clone(), node.name().to_string()));
                if let Some((id, name)) = target {
                    self.begin_name_input(NamePurpose::Rename(id), name);
                }
            }
            KeyCode::Char('R') => {
                let id = self.session.current_folder_id().clone();
                let name = self
                    .session
                    .tree()
                    .find_folder(id.as_str())
                    .map(|folder| folder.name().to_string())
                    .unwrap_or_default();
                self.begin_name_input(NamePurpose::Rename(id), name);
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_node().map(|node| node.id().clone()) {
                    self.mode = Mode::ConfirmDelete(id);
                }
            }
            KeyCode::Char('b') => self.toggle_selected_bookmark(),
            KeyCode::Char('B') | KeyCode::Tab => self.toggle_bookmark_view(),
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char(':') => {
                self.input.clear();
                self.mode = Mode::Command;
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_key_search(&mut self, key: KeyEvent) {
        let mut term = self.session.search_term().to_string();
        match key.code {
            KeyCode::Esc => {
                term.clear();
                self.mode = Mode::Browse;
            }
            KeyCode::Enter | KeyCode::Down => self.mode = Mode::Browse,
            KeyCode::Backspace => {
                term.pop();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                term.push(ch);
            }
            _ => return,
        }
        self.session.set_search(term);
        self.selected = 0;
    }

    fn handle_key_name(&mut self, key: KeyEvent, purpose: NamePurpose) {
        match key.code {
            KeyCode::Esc => {
                self.input.clear();
                self.mode = Mode::Browse;
            }
            KeyCode::Enter => self.commit_name(purpose),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.input.push(ch);
            }
            _ => {}
        }
    }

    fn handle_key_confirm_delete(&mut self, key: KeyEvent, id: NodeId) {
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            let name = self
                .session
                .tree()
                .find_node(id.as_str())
                .map(|node| node.name().to_string())
                .unwrap_or_default();
            if self.session.delete(id.as_str()) {
                self.push_notification(format!("deleted {name}"));
            } else {
                self.push_notification("nothing deleted");
            }
        }
        self.mode = self.resting_mode();
    }

    fn handle_key_preview(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            self.save_note();
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.close_preview(),
            KeyCode::Char('j') | KeyCode::Down => {
                self.preview_scroll = self.preview_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.preview_scroll = self.preview_scroll.saturating_sub(1);
            }
            KeyCode::PageDown => self.preview_scroll = self.preview_scroll.saturating_add(20),
            KeyCode::PageUp => self.preview_scroll = self.preview_scroll.saturating_sub(20),
            KeyCode::Char('e') | KeyCode::Char('i') => {
                if self.session.note_draft_mut().is_some() {
                    self.mode = Mode::NoteEdit;
                }
            }
            KeyCode::Char('x') => {
                self.input = "export ".to_string();
                self.mode = Mode::Command;
            }
            KeyCode::Char(':') => {
                self.input.clear();
                self.mode = Mode::Command;
            }
            _ => {}
        }
    }

    fn handle_key_note_edit(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            self.save_note();
            return;
        }

        let Some(draft) = self.session.note_draft_mut() else {
            self.mode = self.resting_mode();
            return;
        };

        match key.code {
            KeyCode::Esc => self.mode = Mode::Preview,
            KeyCode::Enter => draft.insert_newline(),
            KeyCode::Backspace => draft.delete_char_before(),
            KeyCode::Left => draft.move_cursor(MoveDir::Left),
            KeyCode::Right => draft.move_cursor(MoveDir::Right),
            KeyCode::Up => draft.move_cursor(MoveDir::Up),
            KeyCode::Down => draft.move_cursor(MoveDir::Down),
            KeyCode::Home => draft.move_cursor(MoveDir::LineStart),
            KeyCode::End => draft.move_cursor(MoveDir::LineEnd),
            KeyCode::Tab => draft.insert_char('\t'),
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                draft.insert_char(ch);
            }
            _ => {}
        }
    }

    fn handle_key_command(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input.clear();
                self.mode = self.resting_mode();
            }
            KeyCode::Enter => {
                let command = std::mem::take(&mut self.input);
                self.mode = self.resting_mode();
                self.run_command(command.trim());
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.input.push(ch);
            }
            _ => {}
        }
    }

    fn run_command(&mut self, command: &str) {
        if command.is_empty() {
            return;
        }
        let (name, arg) = command
            .split_once(' ')
            .map_or((command, ""), |(name, arg)| (name, arg.trim()));

        match name {
            "import" | "i" => {
                if arg.is_empty() {
                    self.push_notification("usage: import <path>");
                    return;
                }
                let source = expand_home(arg);
                match self.session.import(&source) {
                    Ok(summary) => self.push_notification(format!(
                        "imported {} files, {} folders ({} skipped)",
                        summary.files, summary.folders, summary.skipped
                    )),
                    Err(err) => self.push_notification(format!("import failed: {err}")),
                }
            }
            "export" | "x" => self.export_target(arg),
            "html" => self.export_html(arg),
            "theme" => self.toggle_theme(),
            "bookmarks" | "bm" => self.toggle_bookmark_view(),
            "root" => self.jump_to_crumb(0),
            "help" => self.show_help = true,
            "q" | "quit" => {
                let _ = self.event_tx.send(Msg::Quit);
            }
            other => self.push_notification(format!("unknown command: {other}")),
        }
    }

    /// Item a command acts on: the open preview, else the selection.
    fn command_target(&self) -> Option<NodeId> {
        match self.session.preview() {
            Some(preview) => Some(preview.node_id.clone()),
            None => self.selected_node().map(|node| node.id().clone()),
        }
    }

    fn export_target(&mut self, arg: &str) {
        if arg.is_empty() {
            self.push_notification("usage: export <path>");
            return;
        }
        let Some(id) = self.command_target() else {
            self.push_notification("nothing selected");
            return;
        };

        let mut dest = expand_home(arg);
        if dest.is_dir()
            && let Ok(node) = self.session.tree().find_node(id.as_str())
        {
            dest = dest.join(node.name());
        }

        match self.session.export(id.as_str(), &dest) {
            Ok(bytes) => self.push_notification(format!(
                "exported {} to {}",
                human_size(bytes),
                dest.display()
            )),
            Err(err) => self.push_notification(format!("export failed: {err}")),
        }
    }

    fn export_html(&mut self, arg: &str) {
        let html = match self.session.preview().map(|preview| &preview.body) {
            Some(PreviewBody::Document(document)) => document.to_html(),
            _ => {
                self.push_notification("html export needs an open .docx preview");
                return;
            }
        };
        if arg.is_empty() {
            self.push_notification("usage: html <path>");
            return;
        }

        let dest = expand_home(arg);
        match std::fs::write(&dest, html) {
            Ok(()) => self.push_notification(format!("wrote {}", dest.display())),
            Err(err) => {
                tracing::warn!(dest = %dest.display(), "html export failed: {err}");
                self.push_notification(format!("html export failed: {err}"));
            }
        }
    }

    fn begin_name_input(&mut self, purpose: NamePurpose, initial: String) {
        self.input = initial;
        self.mode = Mode::NameInput(purpose);
    }

    fn commit_name(&mut self, purpose: NamePurpose) {
        let name = std::mem::take(&mut self.input);
        self.mode = Mode::Browse;

        let result = match &purpose {
            NamePurpose::NewFolder => self.session.add_folder(&name),
            NamePurpose::NewNote => self.session.add_note(&name),
            NamePurpose::Rename(id) => self.session.rename(id.as_str(), &name).map(|()| id.clone()),
        };

        match result {
            Ok(id) => self.select_id(&id),
            Err(err) => self.push_notification(err.to_string()),
        }
    }

    fn open_selected(&mut self) {
        let Some(id) = self.selected_node().map(|node| node.id().clone()) else {
            return;
        };

        match self.session.open(id.as_str()) {
            Ok(Opened::Folder) => {
                self.selected = 0;
                self.list_offset = 0;
            }
            Ok(Opened::Preview) => self.enter_preview(),
            Ok(Opened::Decode(job)) => {
                let tx = self.event_tx.clone();
                spawn_decode(job, move |outcome| {
                    let _ = tx.send(Msg::PreviewDecoded(outcome));
                });
                self.enter_preview();
            }
            Err(err) => self.push_notification(err.to_string()),
        }
    }

    fn enter_preview(&mut self) {
        self.mode = Mode::Preview;
        self.preview_scroll = 0;
        self.highlight_cache = None;
    }

    fn close_preview(&mut self) {
        self.session.close_preview();
        self.highlight_cache = None;
        self.mode = Mode::Browse;
    }

    fn save_note(&mut self) {
        if self.session.save_note() {
            self.push_notification("note saved");
        }
    }

    fn go_up(&mut self) {
        if self.session.view_mode() == ViewMode::Bookmarks {
            self.toggle_bookmark_view();
            return;
        }
        let depth = self.session.breadcrumb().depth();
        if depth > 0 {
            let left = self.session.current_folder_id().clone();
            self.jump_to_crumb(depth - 1);
            self.select_id(&left);
        }
    }

    fn jump_to_crumb(&mut self, index: usize) {
        match self.session.go_back(index) {
            Ok(()) => {
                self.selected = 0;
                self.list_offset = 0;
            }
            Err(err) => self.push_notification(err.to_string()),
        }
    }

    fn toggle_bookmark_view(&mut self) {
        let view = self.session.toggle_bookmark_view();
        self.selected = 0;
        self.list_offset = 0;
        tracing::debug!(view = view.label(), "view switched");
    }

    fn toggle_selected_bookmark(&mut self) {
        let Some(id) = self.selected_node().map(|node| node.id().clone()) else {
            return;
        };
        match self.session.toggle_bookmark(id.as_str()) {
            Ok(true) => self.push_notification("bookmarked"),
            Ok(false) => self.push_notification("bookmark removed"),
            Err(err) => self.push_notification(err.to_string()),
        }
    }

    fn toggle_theme(&mut self) {
        let dark = self.session.toggle_theme();
        self.highlight_cache = None;
        self.push_notification(if dark { "dark theme" } else { "light theme" });
    }

    /// Where text entry returns to.
    fn resting_mode(&self) -> Mode {
        if self.session.preview().is_some() {
            Mode::Preview
        } else {
            Mode::Browse
        }
    }

    fn selected_node(&self) -> Option<&Node> {
        self.session.visible_items().get(self.selected).copied()
    }

    fn select_id(&mut self, id: &NodeId) {
        if let Some(idx) = self
            .session
            .visible_items()
            .iter()
            .position(|node| node.id() == id)
        {
            self.selected = idx;
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.session.visible_items().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
    }

    fn clamp_selection(&mut self) {
        let len = self.session.visible_items().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn palette(&self) -> Palette {
        if self.session.dark_mode() { DARK } else { LIGHT }
    }

    fn syntax_theme(&self) -> Option<&'static SyntectTheme> {
        let name = if self.session.dark_mode() {
            &self.config.preview.syntax_theme
        } else {
            &self.config.preview.light_syntax_theme
        };
        THEME_SET
            .themes
            .get(name)
            .or_else(|| THEME_SET.themes.values().next())
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&mut self, frame: &mut Frame) {
        let palette = self.palette();
        frame.render_widget(
            Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
            frame.area(),
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Length(1), // breadcrumb
                Constraint::Min(1),    // list
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0], palette);
        self.render_breadcrumb(frame, chunks[1], palette);
        self.render_list(frame, chunks[2], palette);
        self.render_status_bar(frame, chunks[3], palette);

        if self.session.preview().is_some() {
            self.render_preview_overlay(frame, palette);
        }

        match &self.mode {
            Mode::Command => {
                let text = format!(":{}", self.input);
                render_input_overlay(frame, " Command ", &text, palette);
            }
            Mode::NameInput(purpose) => {
                let title = match purpose {
                    NamePurpose::NewFolder => " New folder ",
                    NamePurpose::NewNote => " New note ",
                    NamePurpose::Rename(_) => " Rename ",
                };
                let text = self.input.clone();
                render_input_overlay(frame, title, &text, palette);
            }
            _ => {}
        }

        if self.show_help {
            render_help_overlay(frame, palette);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, palette: Palette) {
        let spans = vec![
            Span::styled(
                " treeshelf ",
                Style::default()
                    .fg(palette.selection_fg)
                    .bg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {} ", self.session.view_mode().label()),
                Style::default().fg(palette.accent).bg(palette.surface),
            ),
            Span::styled(
                "  f folder  n note  b bookmark  B bookmarks  / search  : command  ? help ",
                Style::default().fg(palette.muted).bg(palette.surface),
            ),
        ];

        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.surface)),
            area,
        );
    }

    fn render_breadcrumb(&self, frame: &mut Frame, area: Rect, palette: Palette) {
        let mut spans = Vec::new();
        match self.session.view_mode() {
            ViewMode::Bookmarks => spans.push(Span::styled(
                " ★ Bookmarks",
                Style::default()
                    .fg(palette.bookmark)
                    .add_modifier(Modifier::BOLD),
            )),
            ViewMode::Folder => {
                for (idx, (_, name)) in self.session.breadcrumb_labels().into_iter().enumerate() {
                    spans.push(Span::styled(
                        if idx == 0 { " ".to_string() } else { " › ".to_string() },
                        Style::default().fg(palette.muted),
                    ));
                    spans.push(Span::styled(
                        format!("{idx}:"),
                        Style::default().fg(palette.muted),
                    ));
                    spans.push(Span::styled(
                        name.to_string(),
                        Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
                    ));
                }
            }
        }

        let term = self.session.search_term();
        if !term.is_empty() || self.mode == Mode::Search {
            spans.push(Span::styled(
                format!("   /{term}"),
                Style::default().fg(palette.accent),
            ));
        }

        let line = Line::from(spans);
        let width = line.width() as u16;
        frame.render_widget(Paragraph::new(line), area);
        if self.mode == Mode::Search {
            frame.set_cursor_position((area.x + width.min(area.width), area.y));
        }
    }

    fn render_list(&mut self, frame: &mut Frame, area: Rect, palette: Palette) {
        let height = area.height as usize;
        if self.selected < self.list_offset {
            self.list_offset = self.selected;
        } else if height > 0 && self.selected >= self.list_offset + height {
            self.list_offset = self.selected + 1 - height;
        }

        let items = self.session.visible_items();
        if items.is_empty() {
            let empty = if !self.session.search_term().trim().is_empty() {
                "No matches"
            } else if self.session.view_mode() == ViewMode::Bookmarks {
                "No bookmarks yet. Press b on an item to add one."
            } else {
                "Empty folder. Press f, n or :import <path>."
            };
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("  {empty}"),
                    Style::default().fg(palette.muted),
                )),
                area,
            );
            return;
        }

        let lines: Vec<Line> = items
            .iter()
            .enumerate()
            .skip(self.list_offset)
            .take(height)
            .map(|(idx, node)| {
                let starred = self.session.is_bookmarked(node.id().as_str());
                let (icon, detail) = match node {
                    Node::Folder(folder) => ("▸", format!("{} items", folder.child_count())),
                    Node::Note(note) => (
                        "✎",
                        note.updated_at().format("%Y-%m-%d %H:%M").to_string(),
                    ),
                    Node::File(file) => {
                        let icon = match classify(file) {
                            PreviewKind::Image => "▣",
                            PreviewKind::Pdf | PreviewKind::Docx => "▤",
                            PreviewKind::Text => "≡",
                            PreviewKind::Unsupported => "·",
                        };
                        let detail = match file.payload() {
                            Some(_) => human_size(file.size()),
                            None => format!("{} (unavailable)", human_size(file.size())),
                        };
                        (icon, detail)
                    }
                };

                let mut spans = vec![
                    Span::raw(format!(" {icon} ")),
                    Span::raw(node.name().to_string()),
                    Span::styled(
                        if starred { " ★" } else { "" },
                        Style::default().fg(palette.bookmark),
                    ),
                    Span::styled(format!("  {detail}"), Style::default().fg(palette.muted)),
                ];

                if idx == self.selected {
                    let style = Style::default()
                        .fg(palette.selection_fg)
                        .bg(palette.selection_bg);
                    for span in &mut spans {
                        span.style = style;
                    }
                    Line::from(spans).style(style)
                } else {
                    Line::from(spans)
                }
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, palette: Palette) {
        let mode_style = match self.mode {
            Mode::Browse => Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Mode::NoteEdit => Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            Mode::ConfirmDelete(_) => Style::default()
                .fg(Color::Black)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
            _ => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        };

        let mode_span = Span::styled(format!(" {} ", self.mode.label()), mode_style);

        let suffix = match &self.mode {
            Mode::ConfirmDelete(id) => {
                let name = self
                    .session
                    .tree()
                    .find_node(id.as_str())
                    .map(|node| node.name().to_string())
                    .unwrap_or_default();
                format!(" | delete {name} and everything in it? (y/n)")
            }
            _ => match self.notifications.back() {
                Some(note) => format!(" | {note}"),
                None => String::new(),
            },
        };

        let info = Span::styled(
            format!(
                " {} items  {} ★  {} in payloads{} ",
                self.session.visible_items().len(),
                self.session.bookmarks().len(),
                human_size(self.session.payloads().total_bytes() as u64),
                suffix
            ),
            Style::default().fg(palette.fg).bg(palette.surface),
        );

        let bar = Line::from(vec![mode_span, info]);
        let status = Paragraph::new(bar).style(Style::default().bg(palette.surface));
        frame.render_widget(status, area);
    }

    fn render_preview_overlay(&mut self, frame: &mut Frame, palette: Palette) {
        let area = centered_rect(80, 80, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default().bg(palette.surface).fg(palette.fg));
        let inner = block.inner(area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);
        let body_area = chunks[0];

        if let Some(draft) = self.session.note_draft_mut() {
            draft.scroll_to_cursor(body_area.height as usize);
        }

        let highlight = self.config.preview.highlight;
        let dark = self.session.dark_mode();
        let theme = self.syntax_theme();
        let editing = self.mode == Mode::NoteEdit;

        let Some(preview) = self.session.preview() else {
            return;
        };
        let title = self
            .session
            .tree()
            .find_node(preview.node_id.as_str())
            .map(|node| node.name().to_string())
            .unwrap_or_else(|_| "preview".to_string());
        frame.render_widget(block.title(format!(" {title} ")), area);

        let muted = Style::default().fg(palette.muted);
        let mut cursor = None;
        let (lines, footer): (Vec<Line>, &str) = match &preview.body {
            PreviewBody::Loading => (
                vec![Line::from(Span::styled("Loading…", muted))],
                " Esc: close ",
            ),
            PreviewBody::Image(handle) => (
                vec![
                    Line::from(format!("Image ({})", handle.media_type)),
                    Line::from(Span::styled(
                        "The terminal cannot draw it. Export it to view elsewhere.",
                        muted,
                    )),
                ],
                " x: export  Esc: close ",
            ),
            PreviewBody::Pdf { size } => (
                vec![
                    Line::from(format!("PDF document, {}", human_size(*size))),
                    Line::from(Span::styled("Export it to open in a PDF viewer.", muted)),
                ],
                " x: export  Esc: close ",
            ),
            PreviewBody::Unsupported => (
                vec![Line::from(Span::styled(
                    "No preview for this kind of file.",
                    muted,
                ))],
                " x: export  Esc: close ",
            ),
            PreviewBody::Failed(message) => (
                vec![Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(palette.error),
                ))],
                " Esc: close ",
            ),
            PreviewBody::Text {
                text,
                truncated,
                extension,
            } => {
                let fresh = self
                    .highlight_cache
                    .as_ref()
                    .is_some_and(|cache| cache.ticket == preview.ticket && cache.dark == dark);
                if !fresh {
                    let lines = match theme {
                        Some(theme) if highlight => highlight_text(text, extension, theme),
                        _ => text.lines().map(|line| Line::from(line.to_string())).collect(),
                    };
                    self.highlight_cache = Some(HighlightCache {
                        ticket: preview.ticket,
                        dark,
                        lines,
                    });
                }
                let mut lines = self
                    .highlight_cache
                    .as_ref()
                    .map(|cache| cache.lines.clone())
                    .unwrap_or_default();
                if *truncated {
                    lines.push(Line::from(Span::styled("… preview truncated", muted)));
                }
                (lines, " j/k: scroll  x: export  Esc: close ")
            }
            PreviewBody::Document(document) => (
                document_lines(document, palette),
                " j/k: scroll  :html <path>  x: export  Esc: close ",
            ),
            PreviewBody::Note(draft) => {
                let top = draft.top_line;
                let bottom = (top + body_area.height as usize).min(draft.line_count());
                let lines = (top..bottom)
                    .map(|i| Line::from(draft.line_text(i).unwrap_or_default()))
                    .collect();
                if editing {
                    let line = draft.line_text(draft.cursor.row).unwrap_or_default();
                    let col = line
                        .get(..draft.cursor.col)
                        .map_or(0, |head| head.chars().count());
                    cursor = Some((
                        body_area.x + col as u16,
                        body_area.y + (draft.cursor.row - top) as u16,
                    ));
                }
                let footer = if editing {
                    " Esc: stop editing  Ctrl+S: save "
                } else {
                    " e: edit  Ctrl+S: save  Esc: close (saves) "
                };
                (lines, footer)
            }
        };

        let scroll = if matches!(preview.body, PreviewBody::Note(_)) {
            0
        } else {
            self.preview_scroll
        };
        frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), body_area);
        frame.render_widget(Paragraph::new(Span::styled(footer, muted)), chunks[1]);

        if let Some(position) = cursor {
            frame.set_cursor_position(position);
        }
    }
}

fn render_help_overlay(frame: &mut Frame, palette: Palette) {
    let area = centered_rect(80, 40, frame.area());
    frame.render_widget(Clear, area);

    let lines: Vec<Line> = HELP
        .iter()
        .map(|line| Line::from(format!(" {line}")))
        .collect();
    let help = Paragraph::new(lines).block(
        Block::default()
            .title(" Keys (any key closes) ")
            .borders(Borders::ALL)
            .style(Style::default().bg(palette.surface).fg(palette.fg)),
    );
    frame.render_widget(help, area);
}

fn render_input_overlay(frame: &mut Frame, title: &str, text: &str, palette: Palette) {
    let area = centered_rect(70, 20, frame.area());
    let area = Rect {
        height: area.height.min(3),
        ..area
    };
    frame.render_widget(Clear, area);

    let prompt = Paragraph::new(text.to_string()).block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .style(Style::default().bg(palette.surface).fg(palette.fg)),
    );
    frame.render_widget(prompt, area);

    let cursor_x = area.x + 1 + text.chars().count() as u16;
    let cursor_y = area.y + 1;
    frame.set_cursor_position((cursor_x, cursor_y));
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn highlight_text(text: &str, extension: &str, theme: &SyntectTheme) -> Vec<Line<'static>> {
    let syntax = SYNTAX_SET
        .find_syntax_by_extension(extension)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, theme);

    LinesWithEndings::from(text)
        .map(|line| match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(tokens) => Line::from(
                tokens
                    .into_iter()
                    .map(|(style, segment)| {
                        Span::styled(
                            segment.trim_end_matches(['\n', '\r']).to_string(),
                            syntect_to_ratatui(style),
                        )
                    })
                    .collect::<Vec<_>>(),
            ),
            Err(_) => Line::from(line.trim_end_matches(['\n', '\r']).to_string()),
        })
        .collect()
}

fn document_lines(document: &DocxDocument, palette: Palette) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for block in &document.blocks {
        let (prefix, base) = match block.style {
            BlockStyle::Heading(_) => (
                "",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            BlockStyle::ListItem => ("  • ", Style::default().fg(palette.fg)),
            BlockStyle::Paragraph => ("", Style::default().fg(palette.fg)),
        };

        let mut spans = vec![Span::styled(prefix, base)];
        for run in &block.runs {
            let mut style = base;
            if run.bold {
                style = style.add_modifier(Modifier::BOLD);
            }
            if run.italic {
                style = style.add_modifier(Modifier::ITALIC);
            }
            if run.underline {
                style = style.add_modifier(Modifier::UNDERLINED);
            }

            let mut parts = run.text.split('\n');
            if let Some(first) = parts.next() {
                spans.push(Span::styled(first.to_string(), style));
            }
            for part in parts {
                lines.push(Line::from(std::mem::take(&mut spans)));
                spans.push(Span::styled(part.to_string(), style));
            }
        }
        lines.push(Line::from(spans));

        if block.style != BlockStyle::ListItem {
            lines.push(Line::default());
        }
    }

    lines
}

fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(dirs) = directories::BaseDirs::new()
    {
        return dirs.home_dir().join(rest);
    }
    PathBuf::from(raw)
}

fn syntect_to_ratatui(style: syntect::highlighting::Style) -> Style {
    let mut rat_style = Style::default()
        .fg(Color::Rgb(
            style.foreground.r,
            style.foreground.g,
            style.foreground.b,
        ))
        .bg(Color::Rgb(
            style.background.r,
            style.background.g,
            style.background.b,
        ));

    if style.font_style.contains(FontStyle::BOLD) {
        rat_style = rat_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        rat_style = rat_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        rat_style = rat_style.add_modifier(Modifier::UNDERLINED);
    }

    rat_style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn document_breaks_split_lines() {
        let document = DocxDocument {
            blocks: vec![treeshelf::preview::docx::Block {
                style: BlockStyle::Paragraph,
                runs: vec![treeshelf::preview::docx::Run {
                    text: "one\ntwo".to_string(),
                    ..Default::default()
                }],
            }],
        };
        let lines = document_lines(&document, DARK);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].to_string(), "two");
    }

    #[test]
    fn plain_paths_are_kept() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(expand_home("notes.txt"), PathBuf::from("notes.txt"));
    }
}
