//! ratatui-based UI.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use catalog_api::ApiWorker;
use catalog_application::{
    AuthMode, CallTag, EditorMode, Panel, ProfilePanel, Search, SearchBy, Shell, View,
};
use catalog_core::{Level, Notice, Relations, Route, Settings, Theme};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Row,
    Table, TableState, Tabs, Wrap,
};
use tracing::{info, warn};
use unicode_width::UnicodeWidthStr;

mod form;
use form::{FormAction, FormCursor, focused_options, form_lines, handle_form_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
    /// The API URL changed; the caller rebuilds the client and the shell.
    Reconnect,
}

#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub settings: Settings,
    pub route: Route,
    pub exit: UiExit,
}

pub struct Ui {
    shell: Shell,
    worker: ApiWorker<CallTag>,
    settings_panel: SettingsPanel,
    search_panel: SearchPanel,
    goto_panel: GotoPanel,
    help_open: bool,
    /// Keys go to the profile form only after `e`; otherwise the profile view navigates.
    profile_editing: bool,
    /// Highlighted choice inside the focused multi-select of whichever form is open.
    option_cursor: usize,
}

const TABS: [(&str, &str); 4] = [
    ("1", "Books"),
    ("2", "Authors"),
    ("3", "Categories"),
    ("4", "Users"),
];

const SETTINGS_MENU_API_URL: usize = 0;
const SETTINGS_MENU_ATTACH_TOKEN: usize = 1;
const SETTINGS_MENU_THEME: usize = 2;
const SETTINGS_MENU_ITEM_COUNT: usize = 3;

const MAX_VISIBLE_NOTICES: usize = 4;

impl Ui {
    pub fn new(shell: Shell, worker: ApiWorker<CallTag>) -> Self {
        let settings_panel = SettingsPanel::new(&shell.settings().api_url);
        Self {
            shell,
            worker,
            settings_panel,
            search_panel: SearchPanel::default(),
            goto_panel: GotoPanel::default(),
            help_open: false,
            profile_editing: false,
            option_cursor: 0,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<UiOutcome> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(outcome)), Ok(())) => Ok(outcome),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), Ok(())) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn outcome(&self, exit: UiExit) -> UiOutcome {
        UiOutcome {
            settings: self.shell.settings().clone(),
            route: self.shell.route(),
            exit,
        }
    }

    fn accent_color(&self) -> Color {
        match self.shell.settings().theme {
            Theme::Light => Color::Blue,
            Theme::Dark => Color::Yellow,
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiOutcome> {
        let tick_rate = Duration::from_millis(100);
        let mut needs_redraw = true;

        loop {
            needs_redraw |= self.pump(Instant::now());

            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => needs_redraw = true,
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    if let Some(exit) = self.handle_key(key)? {
                        info!(?exit, "leaving console");
                        return Ok(self.outcome(exit));
                    }
                }
                _ => {}
            }
        }
    }

    /// Sends queued requests, applies finished ones and expires notices.
    /// Returns whether anything visible changed.
    fn pump(&mut self, now: Instant) -> bool {
        let mut changed = false;

        for (tag, request) in self.shell.take_outbox() {
            changed = true;
            if let Err(err) = self.worker.submit(tag, request) {
                warn!(error = %err, "request worker unavailable");
                self.shell.notify(Notice::error(
                    "The request worker stopped; restart the console",
                ));
                break;
            }
        }

        for (tag, result) in self.worker.poll() {
            changed = true;
            self.shell.handle_result(tag, result);
        }

        let before = self.shell.notices().len();
        self.shell.prune_notices(now);
        changed || before != self.shell.notices().len()
    }

    fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        let on_profile = matches!(self.shell.view(), View::Profile(_));
        if !on_profile {
            self.profile_editing = false;
        }
        if self.settings_panel.open {
            return self.handle_settings_panel_key(key);
        }
        if self.help_open {
            self.help_open = false;
            return Ok(None);
        }
        if self.goto_panel.open {
            return self.handle_goto_panel_key(key);
        }
        if self.search_panel.open {
            return self.handle_search_panel_key(key);
        }
        if self.shell.auth().is_some() {
            return self.handle_auth_key(key);
        }
        if let Some(panel) = self.shell.panel() {
            if panel.pending_delete().is_some() {
                return self.handle_confirm_key(key);
            }
            if panel.editor().is_some() {
                return self.handle_editor_key(key);
            }
        }
        if on_profile && self.profile_editing {
            return self.handle_profile_key(key);
        }
        self.handle_main_key(key)
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(UiExit::Quit)),
            KeyCode::Char('?') => self.help_open = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Home => self.select_row(0),
            KeyCode::End => self.select_row(usize::MAX),
            KeyCode::Char('n') => {
                self.option_cursor = 0;
                self.shell.open_editor(None);
            }
            KeyCode::Char('e') | KeyCode::Enter if self.profile_usable() => {
                self.option_cursor = 0;
                self.profile_editing = true;
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                let selected = self.shell.panel().filter(|p| !p.is_empty()).map(|p| p.selected());
                if let Some(selected) = selected {
                    self.option_cursor = 0;
                    self.shell.open_editor(Some(selected));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => self.shell.request_delete(),
            KeyCode::Char('r') => self.shell.drill_down(),
            KeyCode::Char('/') => self.open_search_panel(),
            KeyCode::Char('g') => self.goto_panel.open_at(self.shell.route()),
            KeyCode::Char('s') => {
                self.settings_panel = SettingsPanel::new(&self.shell.settings().api_url);
                self.settings_panel.open = true;
            }
            KeyCode::Char('p') => self.open_profile(),
            KeyCode::Char('L') => self.open_auth(AuthMode::Login),
            KeyCode::Char('R') => self.open_auth(AuthMode::Register),
            KeyCode::Char('O') => self.shell.logout(),
            KeyCode::F(5) => self.shell.refresh(),
            KeyCode::Char(ch) => {
                if let Some(route) = tab_route(ch) {
                    self.shell.navigate(route);
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn move_selection(&mut self, delta: isize) {
        let Some(panel) = self.shell.panel_mut() else {
            return;
        };
        let next = panel.selected().saturating_add_signed(delta);
        panel.select(next);
    }

    fn select_row(&mut self, idx: usize) {
        if let Some(panel) = self.shell.panel_mut() {
            panel.select(idx);
        }
    }

    fn open_search_panel(&mut self) {
        let current = self
            .shell
            .panel()
            .filter(|panel| panel.searchable())
            .map(|panel| panel.query().search.clone());
        match current {
            Some(search) => self.search_panel.open_with(search),
            // the shell explains where search is available
            None => self.shell.search(None),
        }
    }

    /// True on a profile view the signed-in user may edit.
    fn profile_usable(&self) -> bool {
        match self.shell.view() {
            View::Profile(profile) => profile.hint(self.shell.session()).is_none(),
            View::Panel(_) => false,
        }
    }

    fn open_profile(&mut self) {
        self.option_cursor = 0;
        self.profile_editing = false;
        self.shell.open_profile();
    }

    fn open_auth(&mut self, mode: AuthMode) {
        if self.shell.session().is_some() && mode == AuthMode::Login {
            self.shell.notify(Notice::info("Already logged in"));
            return;
        }
        self.option_cursor = 0;
        self.shell.open_auth(mode);
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        let Some(panel) = self.shell.panel_mut() else {
            return Ok(None);
        };
        let Some(editor) = panel.editor() else {
            return Ok(None);
        };
        let mut cursor = FormCursor {
            focus: editor.focus,
            option: self.option_cursor,
        };
        let options = focused_options(&editor.form, cursor, panel.relations()).to_vec();
        let Some(editor) = panel.editor_mut() else {
            return Ok(None);
        };
        let action = handle_form_key(&mut editor.form, &mut cursor, &options, key);
        editor.focus = cursor.focus;
        self.option_cursor = cursor.option;

        match action {
            FormAction::Submit => self.shell.submit(),
            FormAction::Cancel => self.shell.close_editor(),
            FormAction::None => {}
        }
        Ok(None)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.shell.confirm_delete()
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.shell.cancel_delete(),
            _ => {}
        }
        Ok(None)
    }

    fn handle_auth_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        let Some(modal) = self.shell.auth_mut() else {
            return Ok(None);
        };
        if key.code == KeyCode::F(2) {
            if !modal.submitting {
                modal.toggle_mode();
            }
            return Ok(None);
        }

        let mut cursor = FormCursor {
            focus: modal.focus,
            option: self.option_cursor,
        };
        let action = handle_form_key(&mut modal.form, &mut cursor, &[], key);
        modal.focus = cursor.focus;
        self.option_cursor = cursor.option;

        match action {
            FormAction::Submit => self.shell.submit_auth(),
            FormAction::Cancel => self.shell.close_auth(),
            FormAction::None => {}
        }
        Ok(None)
    }

    fn handle_profile_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        let View::Profile(profile) = self.shell.view_mut() else {
            return Ok(None);
        };

        let mut cursor = FormCursor {
            focus: profile.focus,
            option: self.option_cursor,
        };
        let action = handle_form_key(&mut profile.form, &mut cursor, &[], key);
        profile.focus = cursor.focus;
        self.option_cursor = cursor.option;

        match action {
            FormAction::Submit => self.shell.submit(),
            FormAction::Cancel => self.profile_editing = false,
            FormAction::None => {}
        }
        Ok(None)
    }

    fn handle_search_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc => self.search_panel.open = false,
            KeyCode::Tab => self.search_panel.by = self.search_panel.by.next(),
            KeyCode::Enter => {
                self.search_panel.open = false;
                let search = self.search_panel.search();
                self.shell.search(search);
            }
            KeyCode::Backspace => {
                self.search_panel.input.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search_panel.input.clear();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search_panel.input.push(ch);
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_goto_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc => {
                self.goto_panel.open = false;
                self.goto_panel.error = None;
            }
            KeyCode::Enter => {
                let input = self.goto_panel.input.trim();
                match Route::parse(input) {
                    Some(route) => {
                        self.goto_panel.open = false;
                        self.goto_panel.error = None;
                        if matches!(route, Route::Profile { .. }) {
                            self.option_cursor = 0;
                            self.profile_editing = false;
                        }
                        self.shell.navigate(route);
                    }
                    None => {
                        self.goto_panel.error = Some(format!("No page at {input}"));
                    }
                }
            }
            KeyCode::Backspace => {
                self.goto_panel.input.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.goto_panel.input.clear();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.goto_panel.input.push(ch);
                self.goto_panel.error = None;
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_settings_panel_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        if self.settings_panel.editing_url {
            match key.code {
                KeyCode::Esc => {
                    self.settings_panel.editing_url = false;
                    self.settings_panel.url_input = self.shell.settings().api_url.clone();
                }
                KeyCode::Enter => {
                    self.settings_panel.editing_url = false;
                    let previous = self.shell.settings().api_url.clone();
                    let settings = self.shell.settings_mut();
                    settings.api_url = self.settings_panel.url_input.clone();
                    settings.normalize();
                    self.settings_panel.url_input = settings.api_url.clone();
                    if settings.api_url != previous {
                        info!(api_url = %settings.api_url, "api url changed");
                        return Ok(Some(UiExit::Reconnect));
                    }
                }
                KeyCode::Backspace => {
                    self.settings_panel.url_input.pop();
                }
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.settings_panel.url_input.clear();
                }
                KeyCode::Char(ch) => self.settings_panel.url_input.push(ch),
                _ => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('s') => self.settings_panel.open = false,
            KeyCode::Up | KeyCode::Char('k') => {
                self.settings_panel.selected = self.settings_panel.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.settings_panel.selected =
                    (self.settings_panel.selected + 1).min(SETTINGS_MENU_ITEM_COUNT - 1);
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => {
                match self.settings_panel.selected {
                    SETTINGS_MENU_API_URL => self.settings_panel.editing_url = true,
                    SETTINGS_MENU_ATTACH_TOKEN => {
                        let settings = self.shell.settings_mut();
                        settings.attach_token = !settings.attach_token;
                    }
                    SETTINGS_MENU_THEME => self.shell.settings_mut().cycle_theme(),
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&self, area: Rect, frame: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        self.draw_header(chunks[0], frame);
        match self.shell.view() {
            View::Panel(panel) => self.draw_panel(panel.as_ref(), chunks[1], frame),
            View::Profile(profile) => self.draw_profile(profile, chunks[1], frame),
        }

        let footer = Paragraph::new(Text::from(self.footer_lines()))
            .block(Block::default().borders(Borders::TOP))
            .alignment(Alignment::Center);
        frame.render_widget(footer, chunks[2]);

        if let Some(panel) = self.shell.panel() {
            if panel.editor().is_some() {
                self.draw_editor_panel(panel, area, frame);
            }
            if let Some(pending) = panel.pending_delete() {
                self.draw_confirm_panel(panel.noun(), &pending.label, area, frame);
            }
        }
        if self.shell.auth().is_some() {
            self.draw_auth_panel(area, frame);
        }
        if self.search_panel.open {
            self.draw_search_panel(area, frame);
        }
        if self.goto_panel.open {
            self.draw_goto_panel(area, frame);
        }
        if self.settings_panel.open {
            self.draw_settings_panel(area, frame);
        }
        if self.help_open {
            self.draw_help_panel(area, frame);
        }
        self.draw_notices(area, frame);
    }

    fn draw_header(&self, area: Rect, frame: &mut ratatui::Frame) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(36)])
            .split(area);

        let titles = TABS
            .iter()
            .map(|(key, title)| Line::from(format!("{key} {title}")))
            .collect::<Vec<_>>();
        let tabs = Tabs::new(titles)
            .select(tab_index(self.shell.route()))
            .highlight_style(
                Style::default()
                    .fg(self.accent_color())
                    .add_modifier(Modifier::BOLD),
            )
            .divider(" ")
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(tabs, columns[0]);

        let who = match self.shell.session() {
            Some(session) => Line::from(vec![
                Span::raw("signed in as "),
                Span::styled(
                    session.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]),
            None => Line::from(Span::styled(
                "not signed in",
                Style::default().fg(Color::DarkGray),
            )),
        };
        let status = Paragraph::new(who)
            .alignment(Alignment::Right)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(status, columns[1]);
    }

    fn footer_lines(&self) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let keys: &[(&str, &str)] = match self.shell.view() {
            View::Profile(_) if self.profile_editing => &[
                ("Tab", " field  "),
                ("Enter", " save  "),
                ("Esc", " stop editing"),
            ],
            View::Profile(_) => &[
                ("e", " edit  "),
                ("F5", " reset  "),
                ("O", " log out  "),
                ("1-4", " lists  "),
                ("g", " go to  "),
                ("q", " quit"),
            ],
            View::Panel(panel) => {
                if panel.drill_down().is_some() && panel.noun() == "book" {
                    &[
                        ("n", " new  "),
                        ("e", " edit  "),
                        ("d", " delete  "),
                        ("r", " reviews  "),
                        ("/", " search  "),
                        ("g", " go to  "),
                        ("?", " help  "),
                        ("q", " quit"),
                    ]
                } else if panel.drill_down().is_some() {
                    &[
                        ("n", " new  "),
                        ("e", " edit  "),
                        ("d", " delete  "),
                        ("r", " books  "),
                        ("g", " go to  "),
                        ("?", " help  "),
                        ("q", " quit"),
                    ]
                } else {
                    &[
                        ("n", " new  "),
                        ("e", " edit  "),
                        ("d", " delete  "),
                        ("g", " go to  "),
                        ("?", " help  "),
                        ("q", " quit"),
                    ]
                }
            }
        };
        let spans = keys
            .iter()
            .flat_map(|(key, action)| {
                [
                    Span::styled(key.to_string(), bold),
                    Span::raw(action.to_string()),
                ]
            })
            .collect::<Vec<_>>();
        vec![Line::from(spans)]
    }

    fn draw_panel(&self, panel: &dyn Panel, area: Rect, frame: &mut ratatui::Frame) {
        let mut title = vec![Span::styled(
            panel.title(),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        if let Some(search) = &panel.query().search {
            title.push(Span::raw(format!(
                "  {}: \"{}\"",
                search.by.as_str(),
                search.text.trim()
            )));
        }
        if panel.is_loading() {
            title.push(Span::styled(
                "  loading...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        let block = Block::default().borders(Borders::ALL).title(Line::from(title));

        if panel.is_empty() {
            let message = if panel.is_loading() {
                "Loading..."
            } else {
                "Nothing here yet. Press n to add one."
            };
            let empty = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let header = Row::new(
            panel
                .columns()
                .iter()
                .map(|column| Cell::from(column.title)),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));
        let widths = panel
            .columns()
            .iter()
            .map(|column| Constraint::Percentage(column.width))
            .collect::<Vec<_>>();
        let rows = panel.rows().into_iter().map(Row::new).collect::<Vec<_>>();

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(self.accent_color())
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = TableState::default();
        state.select(Some(panel.selected()));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_profile(&self, profile: &ProfilePanel, area: Rect, frame: &mut ratatui::Frame) {
        let mut title = vec![Span::styled(
            "Profile",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        if profile.is_submitting() {
            title.push(Span::styled(
                "  saving...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        let block = Block::default().borders(Borders::ALL).title(Line::from(title));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let session = self.shell.session();
        let lines = match profile.hint(session) {
            Some(hint) => vec![Line::from(Span::styled(
                hint,
                Style::default().fg(Color::DarkGray),
            ))],
            None => {
                let focus = if self.profile_editing {
                    profile.focus
                } else {
                    usize::MAX
                };
                let cursor = FormCursor {
                    focus,
                    option: self.option_cursor,
                };
                form_lines(
                    &profile.form,
                    cursor,
                    &Relations::default(),
                    self.accent_color(),
                )
            }
        };
        let body = centered_rect(70, 90, inner);
        frame.render_widget(Paragraph::new(Text::from(lines)), body);
    }

    fn draw_editor_panel(&self, panel: &dyn Panel, area: Rect, frame: &mut ratatui::Frame) {
        let Some(editor) = panel.editor() else {
            return;
        };
        let title = match editor.mode {
            EditorMode::Create => format!("New {}", panel.noun()),
            EditorMode::Edit(id) => format!("Edit {} #{id}", panel.noun()),
        };
        let cursor = FormCursor {
            focus: editor.focus,
            option: self.option_cursor,
        };
        let lines = form_lines(
            &editor.form,
            cursor,
            panel.relations(),
            self.accent_color(),
        );
        let help = editor_help_line(panel.is_submitting());
        self.draw_form_popup(&title, lines, help, area, frame);
    }

    fn draw_auth_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(modal) = self.shell.auth() else {
            return;
        };
        let cursor = FormCursor {
            focus: modal.focus,
            option: self.option_cursor,
        };
        let lines = form_lines(
            &modal.form,
            cursor,
            &Relations::default(),
            self.accent_color(),
        );
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let switch_to = match modal.mode.toggle() {
            AuthMode::Login => " log in instead  ",
            AuthMode::Register => " register instead  ",
        };
        let help = if modal.submitting {
            Line::from(Span::styled("Working...", Style::default().fg(Color::DarkGray)))
        } else {
            Line::from(vec![
                Span::styled("Enter", bold),
                Span::raw(" submit  "),
                Span::styled("F2", bold),
                Span::raw(switch_to),
                Span::styled("Esc", bold),
                Span::raw(" close"),
            ])
        };
        self.draw_form_popup(modal.mode.title(), lines, help, area, frame);
    }

    fn draw_form_popup(
        &self,
        title: &str,
        lines: Vec<Line<'static>>,
        help: Line<'static>,
        area: Rect,
        frame: &mut ratatui::Frame,
    ) {
        let popup_area = centered_rect(70, 80, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let body = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
        frame.render_widget(body, sections[0]);
        frame.render_widget(
            Paragraph::new(help).alignment(Alignment::Center),
            sections[1],
        );
    }

    fn draw_confirm_panel(&self, noun: &str, label: &str, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            format!("Delete {noun}"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let lines = vec![
            Line::from(format!("Delete \"{label}\"?")),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", bold),
                Span::raw(" delete  "),
                Span::styled("n", bold),
                Span::raw(" keep"),
            ]),
        ];
        let body = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(body, popup_area);
    }

    fn draw_search_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Search books",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let chips = [SearchBy::Name, SearchBy::Author, SearchBy::Category]
            .into_iter()
            .flat_map(|by| {
                [
                    option_chip(by.as_str(), by == self.search_panel.by, false),
                    Span::raw(" "),
                ]
            })
            .collect::<Vec<_>>();
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let lines = vec![
            Line::from(chips),
            Line::from(""),
            Line::from(format!("{}▏", self.search_panel.input)),
            Line::from(""),
            Line::from(vec![
                Span::styled("Tab", bold),
                Span::raw(" search by  "),
                Span::styled("Enter", bold),
                Span::raw(" apply (empty clears)  "),
                Span::styled("Esc", bold),
                Span::raw(" cancel"),
            ]),
        ];
        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_goto_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Go to",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let mut lines = vec![
            Line::from(format!("{}▏", self.goto_panel.input)),
            Line::from(Span::styled(
                "/books  /authors  /categories  /users  /books/<id>/reviews  /users/<id>/profile",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        if let Some(error) = &self.goto_panel.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        let body = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
        frame.render_widget(body, inner);
    }

    fn draw_settings_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Settings",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(2)])
            .split(inner);

        let settings = self.shell.settings();
        let url = if self.settings_panel.editing_url {
            format!("{}▏", self.settings_panel.url_input)
        } else {
            settings.api_url.clone()
        };
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let items = vec![
            ListItem::new(Line::from(vec![
                Span::styled("API URL        ", bold),
                Span::raw(url),
            ])),
            ListItem::new(Line::from(vec![
                Span::styled("Send token     ", bold),
                option_chip("on", settings.attach_token, false),
                Span::raw(" "),
                option_chip("off", !settings.attach_token, false),
            ])),
            ListItem::new(Line::from(vec![
                Span::styled("Theme          ", bold),
                option_chip("dark", settings.theme == Theme::Dark, false),
                Span::raw(" "),
                option_chip("light", settings.theme == Theme::Light, false),
            ])),
        ];

        let list = List::new(items)
            .highlight_style(Style::default().fg(self.accent_color()))
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        state.select(Some(self.settings_panel.selected));
        frame.render_stateful_widget(list, sections[0], &mut state);

        let help = if self.settings_panel.editing_url {
            Line::from(vec![
                Span::styled("Enter", bold),
                Span::raw(" save and reconnect  "),
                Span::styled("Ctrl+U", bold),
                Span::raw(" clear  "),
                Span::styled("Esc", bold),
                Span::raw(" discard"),
            ])
        } else {
            Line::from(vec![
                Span::styled("↑↓", bold),
                Span::raw(" select  "),
                Span::styled("Enter", bold),
                Span::raw(" change  "),
                Span::styled("Esc", bold),
                Span::raw(" close"),
            ])
        };
        frame.render_widget(
            Paragraph::new(help)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::TOP)),
            sections[1],
        );
    }

    fn draw_help_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(60, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Keys",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let lines = HELP_KEYS
            .iter()
            .map(|(key, action)| {
                Line::from(vec![
                    Span::styled(format!("{key:<10}"), bold),
                    Span::raw(action.to_string()),
                ])
            })
            .collect::<Vec<_>>();
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), popup_area);
    }

    fn draw_notices(&self, area: Rect, frame: &mut ratatui::Frame) {
        let notices = self.shell.notices();
        let visible = notices.iter().rev().take(MAX_VISIBLE_NOTICES);

        let mut bottom = area.bottom().saturating_sub(3);
        for active in visible {
            let text = &active.notice.text;
            let (width, height) = toast_size(text, area.width.saturating_sub(4));
            if bottom < area.y.saturating_add(height) {
                break;
            }
            let rect = Rect {
                x: area.right().saturating_sub(width.saturating_add(1)),
                y: bottom - height,
                width,
                height,
            };
            bottom = rect.y;

            let color = level_color(active.notice.level);
            frame.render_widget(Clear, rect);
            let toast = Paragraph::new(text.clone())
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                );
            frame.render_widget(toast, rect);
        }
    }
}

const HELP_KEYS: [(&str, &str); 20] = [
    ("1-4", "books, authors, categories, users"),
    ("↑↓ j k", "move"),
    ("n", "new record"),
    ("e Enter", "edit selected, or start editing your profile"),
    ("d Del", "delete selected"),
    ("r", "reviews of a book / books of an author"),
    ("/", "search books"),
    ("g", "go to a route"),
    ("p", "your profile"),
    ("L", "log in"),
    ("R", "register"),
    ("O", "log out"),
    ("F5", "reload"),
    ("s", "settings"),
    ("Tab", "next field"),
    ("Space", "toggle option in a list field"),
    ("← →", "move between options"),
    ("Ctrl+U", "clear field"),
    ("Esc", "close or go back"),
    ("q", "quit"),
];

#[derive(Debug, Default, Clone)]
struct SettingsPanel {
    open: bool,
    selected: usize,
    editing_url: bool,
    url_input: String,
}

impl SettingsPanel {
    fn new(api_url: &str) -> Self {
        Self {
            url_input: api_url.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct SearchPanel {
    open: bool,
    by: SearchBy,
    input: String,
}

impl Default for SearchPanel {
    fn default() -> Self {
        Self {
            open: false,
            by: SearchBy::Name,
            input: String::new(),
        }
    }
}

impl SearchPanel {
    fn open_with(&mut self, current: Option<Search>) {
        let current = current.unwrap_or(Search {
            by: self.by,
            text: String::new(),
        });
        self.by = current.by;
        self.input = current.text;
        self.open = true;
    }

    /// `None` clears the search and lists every book.
    fn search(&self) -> Option<Search> {
        let text = self.input.trim();
        (!text.is_empty()).then(|| Search {
            by: self.by,
            text: text.to_string(),
        })
    }
}

#[derive(Debug, Default, Clone)]
struct GotoPanel {
    open: bool,
    input: String,
    error: Option<String>,
}

impl GotoPanel {
    fn open_at(&mut self, route: Route) {
        self.input = route.path();
        self.error = None;
        self.open = true;
    }
}

fn tab_route(ch: char) -> Option<Route> {
    match ch {
        '1' => Some(Route::books()),
        '2' => Some(Route::Authors),
        '3' => Some(Route::Categories),
        '4' => Some(Route::Users),
        _ => None,
    }
}

fn tab_index(route: Route) -> Option<usize> {
    match route {
        Route::Books { .. } | Route::Reviews { .. } => Some(0),
        Route::Authors => Some(1),
        Route::Categories => Some(2),
        Route::Users | Route::Profile { .. } => Some(3),
    }
}

fn editor_help_line(submitting: bool) -> Line<'static> {
    if submitting {
        return Line::from(Span::styled(
            "Saving...",
            Style::default().fg(Color::DarkGray),
        ));
    }
    let bold = Style::default().add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::styled("Tab", bold),
        Span::raw(" field  "),
        Span::styled("Space", bold),
        Span::raw(" toggle  "),
        Span::styled("Enter", bold),
        Span::raw(" save  "),
        Span::styled("Esc", bold),
        Span::raw(" cancel"),
    ])
}

/// Width and height of a bordered toast for `text`; every line wraps on its own.
fn toast_size(text: &str, max_width: u16) -> (u16, u16) {
    let widest = text.lines().map(UnicodeWidthStr::width).max().unwrap_or(0);
    let width = u16::try_from(widest)
        .unwrap_or(u16::MAX)
        .saturating_add(4)
        .max(20)
        .min(max_width.max(10));
    let inner_width = usize::from(width.saturating_sub(2).max(1));
    let rows = text
        .lines()
        .map(|line| line.width().div_ceil(inner_width).max(1))
        .sum::<usize>()
        .max(1);
    let height = u16::try_from(rows).unwrap_or(u16::MAX).saturating_add(2);
    (width, height)
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Success => Color::Green,
        Level::Info => Color::Cyan,
        Level::Warning => Color::Yellow,
        Level::Error => Color::Red,
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    terminal.show_cursor().context("show cursor")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
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

fn option_chip(label: &str, selected: bool, row_selected: bool) -> Span<'static> {
    let base = if selected && row_selected {
        Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
    } else if row_selected {
        Style::default().add_modifier(Modifier::UNDERLINED)
    } else if selected {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    Span::styled(label.to_string(), base)
}
