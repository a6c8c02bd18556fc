use std::mem;
use std::time::Instant;

use anyhow::Result;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Wrap,
};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::{
    count_song_views, create_song_with_tags, delete_song, fetch_artists, fetch_song,
    log_song_view, update_song_with_tags,
};
use crate::filter::{HistoryLocation, Timings};
use crate::models::{Role, Song, Tag};

use super::forms::{ConfirmSongDelete, SongField, SongForm, LABEL_WIDTH};
use super::helpers::{centered_rect, cursor_column, filter_badge, or_dash, surface_error};
use super::screens::{FilterMenuState, SongDetailScreen, SongListScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown in the song table.
const PAGE_SIZE: isize = 10;
const NO_MATCHES: &str = "Hmm, no songs found. Maybe try a different search?";

/// High-level navigation states.
enum Screen {
    SongList(SongListScreen),
    SongDetail(SongDetailScreen),
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    /// Keystrokes go to the search box on the song list.
    Searching,
    FilterMenu(FilterMenuState),
    CreatingSong(SongForm),
    EditingSong {
        song_id: i64,
        form: SongForm,
    },
    ConfirmSongDelete(ConfirmSongDelete),
}

/// What a keystroke did to an open song form.
enum FormOutcome {
    Open,
    Cancelled,
    Submitted,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    role: Role,
    location: HistoryLocation,
    timings: Timings,
    tags: Vec<Tag>,
    artists: Vec<String>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
    /// Return to the search box once the song form opened with Ctrl-E closes.
    resume_search: bool,
}

impl App {
    /// Load the catalog and mount the song list from `location`.
    pub fn new(
        conn: Connection,
        role: Role,
        location: HistoryLocation,
        timings: Timings,
    ) -> Result<Self> {
        let list = SongListScreen::load(&conn, &location, timings)?;
        let tags = list.tags.clone();
        let artists = fetch_artists(&conn)?;
        info!(songs = list.songs.len(), ?role, "mounted song list");

        Ok(Self {
            conn,
            role,
            location,
            timings,
            tags,
            artists,
            screen: Screen::SongList(list),
            mode: Mode::Normal,
            status: None,
            resume_search: false,
        })
    }

    /// The query history backing the song list filters.
    pub fn location(&self) -> &HistoryLocation {
        &self.location
    }

    /// Advance the search debounce. Returns `true` when the search was
    /// committed to the location or re-read from it.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        let Screen::SongList(list) = &mut self.screen else {
            return false;
        };
        let changed = list.controller.poll(now, &mut self.location);
        if changed {
            list.refresh_view();
        }
        changed
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Searching => self.handle_search(code)?,
            Mode::FilterMenu(menu) => self.handle_filter_menu(code, menu)?,
            Mode::CreatingSong(form) => self.handle_create_song(code, form)?,
            Mode::EditingSong { song_id, form } => self.handle_edit_song(code, song_id, form)?,
            Mode::ConfirmSongDelete(confirm) => self.handle_confirm_song_delete(code, confirm)?,
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::SongList(_) => self.handle_list_key(code, exit),
            Screen::SongDetail(_) => self.handle_detail_key(code, exit),
        }
    }

    fn handle_list_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::SongList(list) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Up => list.move_selection(-1),
            KeyCode::Down => list.move_selection(1),
            KeyCode::PageUp => list.move_selection(-PAGE_SIZE),
            KeyCode::PageDown => list.move_selection(PAGE_SIZE),
            KeyCode::Home => list.select_first(),
            KeyCode::End => list.select_last(),
            KeyCode::Char('/') | KeyCode::Char('f') => return Ok(Mode::Searching),
            KeyCode::Char('t') => return Ok(Mode::FilterMenu(FilterMenuState::default())),
            KeyCode::Char('x') => {
                list.controller.clear_search(&mut self.location);
                list.refresh_view();
                if list.controller.take_focus_request() {
                    return Ok(Mode::Searching);
                }
            }
            KeyCode::Char('[') => self.navigate_history(false),
            KeyCode::Char(']') => self.navigate_history(true),
            KeyCode::Enter => match list.current_song().map(|song| song.id) {
                Some(song_id) => self.open_detail(song_id)?,
                None => self.set_status("No song selected.", StatusKind::Error),
            },
            KeyCode::Char('+') | KeyCode::Char('n') => return Ok(self.begin_create()),
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(song_id) = list.current_song().map(|song| song.id) {
                    return self.begin_edit(song_id);
                }
                self.set_status("No song selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') => {
                if let Some(song_id) = list.current_song().map(|song| song.id) {
                    return self.begin_delete(song_id);
                }
                self.set_status("No song selected to delete.", StatusKind::Error);
            }
            KeyCode::Char('r') => {
                list.reload(&self.conn)?;
                self.artists = fetch_artists(&self.conn)?;
                self.set_status("Song list reloaded.", StatusKind::Info);
            }
            _ => {}
        }

        Ok(Mode::Normal)
    }

    fn handle_detail_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::SongDetail(detail) = &self.screen else {
            return Ok(Mode::Normal);
        };
        let song = detail.song.clone();

        match code {
            KeyCode::Char('q') => {
                *exit = true;
            }
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => {
                self.clear_status();
                self.open_list(Some(song.id))?;
            }
            KeyCode::Char('o') | KeyCode::Enter => {
                self.open_song_link("instructions", song.dance_instructions_link.as_deref())
            }
            KeyCode::Char('w') => {
                self.open_song_link("step sheet", song.step_sheet_link.as_deref())
            }
            KeyCode::Char('s') => self.open_song_link("song", song.song_link.as_deref()),
            KeyCode::Char('p') => self.open_song_link("Spotify", song.spotify_link.as_deref()),
            KeyCode::Char('e') | KeyCode::Char('E') => return self.begin_edit(song.id),
            KeyCode::Char('-') => return self.begin_delete(song.id),
            _ => {}
        }

        Ok(Mode::Normal)
    }

    fn handle_search(&mut self, code: KeyCode) -> Result<Mode> {
        let Screen::SongList(list) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        let mut text = list.controller.state().search_text.clone();
        match code {
            KeyCode::Esc | KeyCode::Enter => return Ok(Mode::Normal),
            KeyCode::Up => {
                list.move_selection(-1);
                return Ok(Mode::Searching);
            }
            KeyCode::Down => {
                list.move_selection(1);
                return Ok(Mode::Searching);
            }
            KeyCode::Backspace => {
                if text.pop().is_none() {
                    return Ok(Mode::Searching);
                }
            }
            KeyCode::Char(ch) if !ch.is_control() => text.push(ch),
            _ => return Ok(Mode::Searching),
        }

        list.controller.set_search_text(text, Instant::now());
        list.refresh_view();
        Ok(Mode::Searching)
    }

    fn handle_filter_menu(&mut self, code: KeyCode, mut menu: FilterMenuState) -> Result<Mode> {
        let Screen::SongList(list) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Esc | KeyCode::Char('t') | KeyCode::Char('q') => return Ok(Mode::Normal),
            KeyCode::Up => menu.move_cursor(-1, list.tags.len()),
            KeyCode::Down => menu.move_cursor(1, list.tags.len()),
            KeyCode::Char(' ') | KeyCode::Enter => {
                match menu.selected_tag(&list.tags).map(|tag| tag.name.clone()) {
                    Some(tag) => {
                        list.controller.toggle_tag(&tag, &mut self.location);
                    }
                    None => {
                        list.controller.toggle_incomplete(&mut self.location);
                    }
                }
                list.refresh_view();
            }
            _ => {}
        }

        Ok(Mode::FilterMenu(menu))
    }

    /// Shared key handling for the create and edit forms.
    fn drive_song_form(&self, code: KeyCode, form: &mut SongForm) -> FormOutcome {
        let on_tags = form.active == SongField::Tags;
        match code {
            KeyCode::Esc => {
                if !form.cancel_autocomplete() {
                    return FormOutcome::Cancelled;
                }
            }
            KeyCode::Tab => {
                let consumed = form.has_active_suggestion() && form.accept_suggestion();
                if !consumed {
                    form.toggle_field();
                }
                form.update_suggestion(&self.artists);
            }
            KeyCode::Down => {
                form.toggle_field();
                form.update_suggestion(&self.artists);
            }
            KeyCode::BackTab | KeyCode::Up => {
                form.previous_field();
                form.update_suggestion(&self.artists);
            }
            KeyCode::Left if on_tags => form.move_tag_cursor(-1),
            KeyCode::Right if on_tags => form.move_tag_cursor(1),
            KeyCode::Char(' ') if on_tags => {
                form.toggle_tag_at_cursor();
            }
            KeyCode::Backspace => {
                form.backspace();
                form.update_suggestion(&self.artists);
            }
            KeyCode::Enter => return FormOutcome::Submitted,
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                    form.update_suggestion(&self.artists);
                }
            }
            _ => {}
        }
        FormOutcome::Open
    }

    fn handle_create_song(&mut self, code: KeyCode, mut form: SongForm) -> Result<Mode> {
        match self.drive_song_form(code, &mut form) {
            FormOutcome::Open => Ok(Mode::CreatingSong(form)),
            FormOutcome::Cancelled => {
                self.set_status("Song creation cancelled.", StatusKind::Info);
                Ok(self.close_form())
            }
            FormOutcome::Submitted => match self.save_new_song(&form) {
                Ok(song) => {
                    self.set_status(
                        format!("Created {}.", song.display_title()),
                        StatusKind::Info,
                    );
                    Ok(self.close_form())
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::CreatingSong(form))
                }
            },
        }
    }

    fn handle_edit_song(&mut self, code: KeyCode, song_id: i64, mut form: SongForm) -> Result<Mode> {
        match self.drive_song_form(code, &mut form) {
            FormOutcome::Open => Ok(Mode::EditingSong { song_id, form }),
            FormOutcome::Cancelled => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                Ok(self.close_form())
            }
            FormOutcome::Submitted => match self.save_existing_song(song_id, &form) {
                Ok(()) => {
                    self.set_status("Song updated.", StatusKind::Info);
                    Ok(self.close_form())
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Ok(Mode::EditingSong { song_id, form })
                }
            },
        }
    }

    fn handle_confirm_song_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmSongDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match delete_song(&self.conn, confirm.id) {
                    Ok(()) => {
                        if matches!(self.screen, Screen::SongDetail(_)) {
                            self.open_list(None)?;
                        } else {
                            self.reload_after_change(None)?;
                        }
                        self.set_status(format!("Deleted {}.", confirm.title), StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmSongDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmSongDelete(confirm)),
        }
    }

    /// Ctrl-E edits the highlighted song without leaving the search box.
    pub(crate) fn handle_ctrl_e(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal | Mode::Searching) {
            return Ok(());
        }

        let song_id = match &self.screen {
            Screen::SongList(list) => list.current_song().map(|song| song.id),
            Screen::SongDetail(detail) => Some(detail.song.id),
        };
        let Some(song_id) = song_id else {
            self.set_status("No song selected to edit.", StatusKind::Error);
            return Ok(());
        };

        let searching = matches!(self.mode, Mode::Searching);
        let mode = self.begin_edit(song_id)?;
        if matches!(mode, Mode::EditingSong { .. }) {
            self.resume_search = searching;
            self.mode = mode;
        }
        Ok(())
    }

    /// Ctrl-L flips the "incomplete only" filter from anywhere on the list.
    pub(crate) fn handle_ctrl_l(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal | Mode::Searching) {
            return Ok(());
        }
        if let Screen::SongList(list) = &mut self.screen {
            let active = list.controller.toggle_incomplete(&mut self.location);
            list.refresh_view();
            let message = if active {
                "Showing songs without dance instructions."
            } else {
                "Showing all songs."
            };
            self.set_status(message, StatusKind::Info);
        }
        Ok(())
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::SongList(list) => self.draw_song_list(frame, content_area, list),
            Screen::SongDetail(detail) => self.draw_song_detail(frame, content_area, detail),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::FilterMenu(menu) => self.draw_filter_menu(frame, area, *menu),
            Mode::CreatingSong(form) => self.draw_song_form(frame, area, "New Song", form),
            Mode::EditingSong { form, .. } => self.draw_song_form(frame, area, "Edit Song", form),
            Mode::ConfirmSongDelete(confirm) => self.draw_confirm_song_delete(frame, area, confirm),
            Mode::Normal | Mode::Searching => {}
        }
    }

    fn draw_song_list(&self, frame: &mut Frame, area: Rect, list: &SongListScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        self.draw_search_bar(frame, chunks[0], list);

        let table_area = chunks[1];
        if table_area.height == 0 {
            return;
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title(list.filter_summary());

        if list.view.is_empty() {
            let text = if list.songs.is_empty() {
                "No songs yet. Press '+' to add one."
            } else {
                NO_MATCHES
            };
            let message = Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, table_area);
            return;
        }

        let header = Row::new(["Title", "Artist", "Dance", "Choreographer"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows = list.view.iter().map(|song| {
            let title_style = if song.is_incomplete() {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(song.title.clone()).style(title_style),
                Cell::from(song.artist.clone()),
                Cell::from(or_dash(song.dance_name.as_deref())),
                Cell::from(or_dash(song.dance_choreographer.as_deref())),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(35),
                Constraint::Percentage(25),
                Constraint::Percentage(20),
                Constraint::Percentage(20),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(Some(list.selected));
        frame.render_stateful_widget(table, table_area, &mut state);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, list: &SongListScreen) {
        let state = list.controller.state();
        let searching = matches!(self.mode, Mode::Searching);

        let border_style = if searching {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(format!("Search · {}", filter_badge(state.active_filter_count())));

        let mut spans = vec![Span::raw("Search: ")];
        if state.search_text.is_empty() && !searching {
            spans.push(Span::styled(
                "press / to search",
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            spans.push(Span::raw(state.search_text.clone()));
        }
        if list.controller.has_pending_commit() {
            spans.push(Span::styled(" …", Style::default().fg(Color::DarkGray)));
        }

        let inner = block.inner(area);
        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);

        if searching {
            let offset = "Search: ".len() + state.search_text.chars().count();
            frame.set_cursor_position((cursor_column(inner, offset), inner.y));
        }
    }

    fn draw_song_detail(&self, frame: &mut Frame, area: Rect, detail: &SongDetailScreen) {
        let song = &detail.song;
        let label_style = Style::default().fg(Color::Cyan);
        let field = |name: &str, value: String| {
            Line::from(vec![
                Span::styled(
                    format!("{name:>width$}: ", width = LABEL_WIDTH as usize - 2),
                    label_style,
                ),
                Span::raw(value),
            ])
        };

        let tags = if song.tags.is_empty() {
            "-".to_string()
        } else {
            song.tags.join(", ")
        };
        let lines = vec![
            Line::from(Span::styled(
                song.display_title(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            field("Dance", or_dash(song.dance_name.as_deref())),
            field("Choreographer", or_dash(song.dance_choreographer.as_deref())),
            field(
                "Counts",
                or_dash(song.dance_counts.map(|c| c.to_string()).as_deref()),
            ),
            field("Walls", or_dash(Some(song.walls_label().as_str()))),
            field("Starting foot", or_dash(song.starting_weight_foot.as_deref())),
            field("Instructions", or_dash(song.dance_instructions_link.as_deref())),
            field("Step sheet", or_dash(song.step_sheet_link.as_deref())),
            field("Song link", or_dash(song.song_link.as_deref())),
            field("Spotify", or_dash(song.spotify_link.as_deref())),
            field("Tags", tags),
            Line::from(""),
            field("Views", detail.views.to_string()),
            field("Added", song.created_at.clone()),
            field("Updated", song.updated_at.clone()),
        ];

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Song"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_filter_menu(&self, frame: &mut Frame, area: Rect, menu: FilterMenuState) {
        let Screen::SongList(list) = &self.screen else {
            return;
        };
        let state = list.controller.state();
        let mark = |on: bool| if on { 'x' } else { ' ' };

        let mut items = vec![ListItem::new(format!(
            "[{}] Incomplete",
            mark(state.incomplete_only)
        ))];
        items.extend(list.tags.iter().map(|tag| {
            ListItem::new(format!(
                "[{}] {} ({})",
                mark(state.active_tags.contains(&tag.name)),
                tag.name,
                list.tag_index.song_count(&tag.name)
            ))
        }));

        let popup_area = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup_area);

        let widget = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(filter_badge(state.active_filter_count())),
            )
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        let mut list_state = ListState::default().with_selected(Some(menu.cursor));
        frame.render_stateful_widget(widget, popup_area, &mut list_state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::CreatingSong(_) | Mode::EditingSong { .. }) => &[
                ("[Enter]", " Save   "),
                ("[Tab/↑↓]", " Field   "),
                ("[←→ Space]", " Tags   "),
                ("[Esc]", " Cancel"),
            ],
            (_, Mode::ConfirmSongDelete(_)) => &[("[y]", " Delete   "), ("[n/Esc]", " Keep")],
            (_, Mode::FilterMenu(_)) => &[
                ("[↑↓]", " Move   "),
                ("[Space]", " Toggle   "),
                ("[Esc]", " Close"),
            ],
            (_, Mode::Searching) => &[
                ("[type]", " Search   "),
                ("[↑↓]", " Select   "),
                ("[Ctrl-E]", " Edit   "),
                ("[Ctrl-L]", " Incomplete   "),
                ("[Esc]", " Done"),
            ],
            (Screen::SongDetail(_), _) => &[
                ("[o]", " Instructions   "),
                ("[w]", " Step Sheet   "),
                ("[s]", " Song   "),
                ("[p]", " Spotify   "),
                ("[e]", " Edit   "),
                ("[-]", " Delete   "),
                ("[Esc]", " Back   "),
                ("[q]", " Quit"),
            ],
            (Screen::SongList(_), _) => &[
                ("[↑↓]", " Select   "),
                ("[Enter]", " Open   "),
                ("[/]", " Search   "),
                ("[x]", " Clear   "),
                ("[t]", " Filters   "),
                ("[[ ]]", " Back/Fwd   "),
                ("[+]", " Add   "),
                ("[e]", " Edit   "),
                ("[-]", " Delete   "),
                ("[q]", " Quit"),
            ],
        };

        Line::from(
            keys.iter()
                .flat_map(|(key, action)| {
                    [Span::styled(*key, key_style), Span::raw(*action)]
                })
                .collect::<Vec<_>>(),
        )
    }

    fn draw_song_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &SongForm) {
        let popup_area = centered_rect(80, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = SongField::ALL
            .iter()
            .map(|field| form.build_line(*field))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Space toggles tags • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);

        if form.active != SongField::Tags {
            let row = SongField::ALL
                .iter()
                .position(|field| *field == form.active)
                .unwrap_or(0) as u16;
            let offset = usize::from(LABEL_WIDTH) + form.value_len(form.active);
            let last_row = inner.bottom().saturating_sub(1).max(inner.y);
            let cursor_y = inner.y.saturating_add(row).min(last_row);
            frame.set_cursor_position((cursor_column(inner, offset), cursor_y));
        }
    }

    fn draw_confirm_song_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmSongDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Delete Song").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete '{}' permanently?", confirm.title)),
            Line::from("Its tags and view history go with it."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Viewers may browse but not change the catalog.
    fn require_admin(&mut self) -> bool {
        if self.role.is_admin() {
            return true;
        }
        self.set_status("Admin access required.", StatusKind::Error);
        false
    }

    fn begin_create(&mut self) -> Mode {
        if !self.require_admin() {
            return Mode::Normal;
        }
        self.clear_status();
        Mode::CreatingSong(SongForm::new(&self.tags))
    }

    fn begin_edit(&mut self, song_id: i64) -> Result<Mode> {
        if !self.require_admin() {
            return Ok(Mode::Normal);
        }
        match fetch_song(&self.conn, song_id)? {
            Some(song) => {
                self.clear_status();
                Ok(Mode::EditingSong {
                    song_id,
                    form: SongForm::from_song(&song, &self.tags),
                })
            }
            None => {
                self.set_status("Song not found", StatusKind::Error);
                Ok(Mode::Normal)
            }
        }
    }

    fn begin_delete(&mut self, song_id: i64) -> Result<Mode> {
        if !self.require_admin() {
            return Ok(Mode::Normal);
        }
        match fetch_song(&self.conn, song_id)? {
            Some(song) => {
                self.clear_status();
                Ok(Mode::ConfirmSongDelete(ConfirmSongDelete::from(&song)))
            }
            None => {
                self.set_status("Song not found", StatusKind::Error);
                Ok(Mode::Normal)
            }
        }
    }

    /// Mode to fall back to when a song form closes.
    fn close_form(&mut self) -> Mode {
        let resume = mem::take(&mut self.resume_search);
        if resume && matches!(self.screen, Screen::SongList(_)) {
            Mode::Searching
        } else {
            Mode::Normal
        }
    }

    fn save_new_song(&mut self, form: &SongForm) -> Result<Song> {
        let draft = form.parse_inputs()?;
        let song = create_song_with_tags(&self.conn, &draft, &form.selected_tags())?;
        self.reload_after_change(Some(song.id))?;
        Ok(song)
    }

    fn save_existing_song(&mut self, song_id: i64, form: &SongForm) -> Result<()> {
        let draft = form.parse_inputs()?;
        if update_song_with_tags(&self.conn, song_id, &draft, &form.selected_tags())? {
            debug!(song_id, "song tags changed");
        }
        self.reload_after_change(Some(song_id))
    }

    /// Refresh whatever the current screen shows after a write.
    fn reload_after_change(&mut self, focus: Option<i64>) -> Result<()> {
        self.artists = fetch_artists(&self.conn)?;
        match &mut self.screen {
            Screen::SongList(list) => {
                list.reload(&self.conn)?;
                if let Some(song_id) = focus {
                    list.select_song(song_id);
                }
            }
            Screen::SongDetail(detail) => {
                if let Some(song) = fetch_song(&self.conn, detail.song.id)? {
                    detail.song = song;
                }
            }
        }
        Ok(())
    }

    /// Step through the filter history and pull the result into the list.
    fn navigate_history(&mut self, forward: bool) {
        let moved = if forward {
            self.location.forward()
        } else {
            self.location.back()
        };
        if !moved {
            let edge = if forward { "newest" } else { "oldest" };
            self.set_status(format!("Already at the {edge} filters."), StatusKind::Info);
            return;
        }
        if let Screen::SongList(list) = &mut self.screen {
            list.sync(&self.location, Instant::now());
        }
        self.clear_status();
    }

    /// Leave the list for a song's detail screen, recording the view.
    fn open_detail(&mut self, song_id: i64) -> Result<()> {
        let Some(song) = fetch_song(&self.conn, song_id)? else {
            self.set_status("Song not found", StatusKind::Error);
            return Ok(());
        };
        log_song_view(&self.conn, song_id)?;
        let views = count_song_views(&self.conn, song_id)?;

        if let Screen::SongList(list) = &mut self.screen {
            list.controller.cancel_pending();
        }
        info!(song_id, "opened song");
        self.clear_status();
        self.screen = Screen::SongDetail(SongDetailScreen { song, views });
        Ok(())
    }

    /// Mount a fresh song list from the current location.
    fn open_list(&mut self, focus: Option<i64>) -> Result<()> {
        let mut list = SongListScreen::load(&self.conn, &self.location, self.timings)?;
        if let Some(song_id) = focus {
            list.select_song(song_id);
        }
        self.screen = Screen::SongList(list);
        Ok(())
    }

    fn open_song_link(&mut self, what: &str, link: Option<&str>) {
        match link.map(str::trim).filter(|link| !link.is_empty()) {
            None => self.set_status(
                format!("This song does not have a {what} link."),
                StatusKind::Error,
            ),
            Some(link) => match open_link(link) {
                Ok(()) => self.set_status(format!("Opened {what} link."), StatusKind::Info),
                Err(err) => {
                    warn!(%err, link, "failed to open link");
                    self.set_status(format!("Failed to open link: {err}"), StatusKind::Error);
                }
            },
        }
    }
}
