// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod columns;
pub mod detail_view;
pub mod list;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyModifiers,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use regdesk_app::display::{full_name, grant_option_label, telegram_handle};
use regdesk_app::{
    AppCommand, AppEvent, AppState, DELETE_CONFIRMATION, FileId, Job, JobOutput, JobResult,
    RequestId, Resource, TabKind, TemplateId, TemplateImage, Ticket, UserId,
};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

use crate::columns::{
    GRANT_PLACEHOLDER, admin_columns, request_columns, template_columns, user_columns,
};
use crate::detail_view::{detail_title, render_detail_text, render_lightbox_text};
use crate::list::{Activation, ColumnAction, ListBody, project};

const APP_TITLE: &str = "Яндекс GO Регистрация Автомобилей";
const LOADING: &str = "Загрузка...";

/// Executes backend jobs. Implementations must be callable from worker
/// threads; each job runs on its own thread.
pub trait AppRuntime: Send + Sync + 'static {
    fn run_job(&self, job: &Job) -> Result<JobOutput>;

    /// Server root shown in asset URLs.
    fn base_url(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    JobFinished(JobResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditTarget {
    TemplateName,
    TemplateDescription,
    TemplateImagePath,
}

impl EditTarget {
    const fn label(self) -> &'static str {
        match self {
            Self::TemplateName => "Название макета",
            Self::TemplateDescription => "Описание макета (необязательно)",
            Self::TemplateImagePath => "Путь к изображению",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ViewData {
    rows: BTreeMap<TabKind, usize>,
    column: usize,
    photo_cursor: usize,
    editing: Option<EditTarget>,
    edit_buffer: String,
    login_input: String,
    status_token: u64,
    help_visible: bool,
    base_url: String,
}

impl ViewData {
    fn row(&self, tab: TabKind) -> usize {
        self.rows.get(&tab).copied().unwrap_or(0)
    }

    fn set_row(&mut self, tab: TabKind, row: usize) {
        self.rows.insert(tab, row);
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: Arc<R>) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableBracketedPaste)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        base_url: runtime.base_url(),
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();
    dispatch(
        state,
        &runtime,
        &mut view_data,
        &internal_tx,
        AppCommand::Start,
    );

    let mut result = Ok(());
    loop {
        process_internal_events(state, &runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) => {
                if handle_key_event(state, &runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(Event::Paste(text)) => handle_paste(state, &mut view_data, &text),
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        DisableBracketedPaste,
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    result
}

fn dispatch<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    apply_events(state, runtime, view_data, internal_tx, events);
}

fn apply_events<R: AppRuntime>(
    state: &AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<AppEvent>,
) {
    for event in events {
        match event {
            AppEvent::JobQueued(ticket) => spawn_job(runtime, internal_tx, ticket),
            AppEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(internal_tx, view_data.status_token);
            }
            AppEvent::TabChanged(_) => {
                view_data.column = 0;
                view_data.editing = None;
                clamp_cursors(state, view_data);
            }
            AppEvent::CacheUpdated(_) | AppEvent::DetailUpdated => {
                clamp_cursors(state, view_data);
            }
            AppEvent::LoginMounted => view_data.login_input.clear(),
            AppEvent::SessionChanged => {
                view_data.editing = None;
                view_data.help_visible = false;
                view_data.login_input.clear();
            }
            AppEvent::AlertRaised(message) => debug!(%message, "alert raised"),
            AppEvent::AlertDismissed
            | AppEvent::ConfirmRequested(_)
            | AppEvent::StatusCleared
            | AppEvent::FormUpdated
            | AppEvent::LoadingChanged(_) => {}
        }
    }
}

fn spawn_job<R: AppRuntime>(runtime: &Arc<R>, internal_tx: &Sender<InternalEvent>, ticket: Ticket) {
    let runtime = Arc::clone(runtime);
    let sender = internal_tx.clone();
    thread::spawn(move || {
        let outcome = runtime.run_job(&ticket.job);
        if let Err(error) = &outcome {
            debug!(job = %ticket.job.describe(), error = %format!("{error:#}"), "job failed");
        }
        if sender
            .send(InternalEvent::JobFinished(JobResult::new(ticket.id, outcome)))
            .is_err()
        {
            error!(job = %ticket.job.describe(), "ui channel closed before job finished");
        }
    });
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        handle_internal_event(state, runtime, view_data, tx, event);
    }
}

fn handle_internal_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: InternalEvent,
) {
    match event {
        InternalEvent::ClearStatus { token } if token == view_data.status_token => {
            state.dispatch(AppCommand::ClearStatus);
        }
        InternalEvent::ClearStatus { .. } => {}
        InternalEvent::JobFinished(result) => {
            let events = state.complete(result);
            apply_events(state, runtime, view_data, tx, events);
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    dispatch(
        state,
        runtime,
        view_data,
        internal_tx,
        AppCommand::SetStatus(message.into()),
    );
}

fn handle_paste(state: &AppState, view_data: &mut ViewData, text: &str) {
    let text = text.trim_end_matches(['\r', '\n']);
    if view_data.editing.is_some() {
        view_data.edit_buffer.push_str(text);
    } else if state.session.is_anonymous() && state.login.is_mounted() {
        view_data.login_input.push_str(text);
    }
}

/// Returns true when the app should quit.
fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        return true;
    }

    // Nothing is interactive until the session probe settles.
    if state.session.is_checking() {
        return false;
    }

    if state.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            dispatch(state, runtime, view_data, internal_tx, AppCommand::DismissAlert);
        }
        return false;
    }

    if state.pending_delete.is_some() {
        let command = match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(AppCommand::ConfirmTemplateDelete),
            KeyCode::Char('n') | KeyCode::Esc => Some(AppCommand::CancelTemplateDelete),
            _ => None,
        };
        if let Some(command) = command {
            dispatch(state, runtime, view_data, internal_tx, command);
        }
        return false;
    }

    if state
        .detail
        .as_ref()
        .is_some_and(|detail| detail.lightbox().is_some())
    {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            dispatch(state, runtime, view_data, internal_tx, AppCommand::ClosePhoto);
        }
        return false;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if !state.session.is_authenticated() {
        handle_login_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if let Some(target) = view_data.editing {
        handle_edit_key(state, runtime, view_data, internal_tx, target, key);
        return false;
    }

    handle_nav_key(state, runtime, view_data, internal_tx, key)
}

fn handle_login_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if !state.login.is_mounted() {
        return;
    }
    match key.code {
        KeyCode::Char(ch) => view_data.login_input.push(ch),
        KeyCode::Backspace => {
            view_data.login_input.pop();
        }
        KeyCode::Esc => view_data.login_input.clear(),
        KeyCode::Enter => {
            let raw = view_data.login_input.clone();
            dispatch(
                state,
                runtime,
                view_data,
                internal_tx,
                AppCommand::SubmitTelegramAuth(raw),
            );
        }
        _ => {}
    }
}

fn handle_edit_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    target: EditTarget,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char(ch) => view_data.edit_buffer.push(ch),
        KeyCode::Backspace => {
            view_data.edit_buffer.pop();
        }
        KeyCode::Esc => {
            view_data.editing = None;
            view_data.edit_buffer.clear();
        }
        KeyCode::Enter => {
            let value = std::mem::take(&mut view_data.edit_buffer);
            view_data.editing = None;
            commit_edit(state, runtime, view_data, internal_tx, target, value);
        }
        _ => {}
    }
}

fn commit_edit<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    target: EditTarget,
    value: String,
) {
    let command = match target {
        EditTarget::TemplateName => AppCommand::SetTemplateName(value),
        EditTarget::TemplateDescription => AppCommand::SetTemplateDescription(value),
        EditTarget::TemplateImagePath => {
            let path = value.trim();
            if path.is_empty() {
                AppCommand::SetTemplateImage(None)
            } else {
                match TemplateImage::from_path(Path::new(path)) {
                    Ok(image) => AppCommand::SetTemplateImage(Some(image)),
                    Err(error) => {
                        emit_status(state, runtime, view_data, internal_tx, format!("{error:#}"));
                        return;
                    }
                }
            }
        }
    };
    dispatch(state, runtime, view_data, internal_tx, command);
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => Some(AppCommand::NextTab),
        KeyCode::BackTab => Some(AppCommand::PrevTab),
        KeyCode::Char(digit @ '1'..='5') => {
            let index = usize::from(digit as u8 - b'1');
            TabKind::ALL.get(index).copied().map(AppCommand::SelectTab)
        }
        KeyCode::Char('r') => Some(AppCommand::Refresh),
        KeyCode::Char('L') => Some(AppCommand::Logout),
        KeyCode::Char('?') => {
            view_data.help_visible = true;
            None
        }
        _ if detail_visible(state) => detail_command(state, view_data, key),
        _ => list_command(state, view_data, key),
    };
    if let Some(command) = command {
        dispatch(state, runtime, view_data, internal_tx, command);
    }
    false
}

fn detail_visible(state: &AppState) -> bool {
    state.active_tab == TabKind::Requests && state.selected_request.is_some()
}

fn detail_photos(state: &AppState) -> Vec<FileId> {
    state
        .detail
        .as_ref()
        .map(|detail| detail.photos().iter().map(|photo| photo.id).collect())
        .unwrap_or_default()
}

fn detail_command(state: &AppState, view_data: &mut ViewData, key: KeyEvent) -> Option<AppCommand> {
    let photos = detail_photos(state);
    match key.code {
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => Some(AppCommand::CloseRequest),
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('l') | KeyCode::Right => {
            view_data.photo_cursor = step(view_data.photo_cursor, 1, photos.len());
            None
        }
        KeyCode::Char('k') | KeyCode::Up | KeyCode::Char('h') | KeyCode::Left => {
            view_data.photo_cursor = step(view_data.photo_cursor, -1, photos.len());
            None
        }
        KeyCode::Enter => photos
            .get(view_data.photo_cursor)
            .copied()
            .map(AppCommand::OpenPhoto),
        _ => None,
    }
}

fn list_command(state: &AppState, view_data: &mut ViewData, key: KeyEvent) -> Option<AppCommand> {
    let tab = state.active_tab;
    let body = active_list(state, &view_data.base_url);
    let (rows, columns) = match &body {
        Some(ListBody::Table(table)) => (table.len(), table.headers.len()),
        Some(ListBody::Empty(_)) | None => (0, 0),
    };

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.set_row(tab, step(view_data.row(tab), 1, rows));
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.set_row(tab, step(view_data.row(tab), -1, rows));
            None
        }
        KeyCode::Char('h') | KeyCode::Left => {
            view_data.column = step(view_data.column, -1, columns);
            None
        }
        KeyCode::Char('l') | KeyCode::Right => {
            view_data.column = step(view_data.column, 1, columns);
            None
        }
        KeyCode::Enter => {
            let Some(ListBody::Table(table)) = &body else {
                return None;
            };
            match table.activate(view_data.row(tab), view_data.column)? {
                Activation::RowClicked(id) if tab == TabKind::Requests => {
                    view_data.photo_cursor = 0;
                    Some(AppCommand::OpenRequest(RequestId::new(id)))
                }
                Activation::RowClicked(_) => None,
                Activation::Action {
                    action: ColumnAction::DeleteTemplate,
                    row_id,
                } => Some(AppCommand::RequestTemplateDelete(TemplateId::new(row_id))),
            }
        }
        KeyCode::Char('d') if tab == TabKind::Templates => {
            let Some(ListBody::Table(table)) = &body else {
                return None;
            };
            let column = table.action_column()?;
            match table.activate(view_data.row(tab), column)? {
                Activation::Action { row_id, .. } => {
                    Some(AppCommand::RequestTemplateDelete(TemplateId::new(row_id)))
                }
                Activation::RowClicked(_) => None,
            }
        }
        KeyCode::Char('u') if tab == TabKind::Admins => {
            Some(AppCommand::SelectGrantUser(cycle_grant_user(state, 1)))
        }
        KeyCode::Char('U') if tab == TabKind::Admins => {
            Some(AppCommand::SelectGrantUser(cycle_grant_user(state, -1)))
        }
        KeyCode::Char('x') if tab == TabKind::Admins => Some(AppCommand::SelectGrantUser(None)),
        KeyCode::Char('a') if tab == TabKind::Admins => Some(AppCommand::GrantAdmin),
        KeyCode::Char('n') if tab == TabKind::Templates => {
            start_edit(view_data, EditTarget::TemplateName, &state.upload.name);
            None
        }
        KeyCode::Char('e') if tab == TabKind::Templates => {
            start_edit(
                view_data,
                EditTarget::TemplateDescription,
                &state.upload.description,
            );
            None
        }
        KeyCode::Char('f') if tab == TabKind::Templates => {
            start_edit(view_data, EditTarget::TemplateImagePath, "");
            None
        }
        KeyCode::Char('s') if tab == TabKind::Templates => Some(AppCommand::UploadTemplate),
        _ => None,
    }
}

fn start_edit(view_data: &mut ViewData, target: EditTarget, current: &str) {
    view_data.editing = Some(target);
    view_data.edit_buffer = current.to_owned();
}

/// Steps through the grant selector's options: the placeholder, then every
/// loaded user in list order.
fn cycle_grant_user(state: &AppState, delta: isize) -> Option<UserId> {
    let mut options = vec![None];
    if let Some(users) = &state.cache.users {
        options.extend(users.iter().map(|user| Some(user.id)));
    }
    let current = options
        .iter()
        .position(|option| *option == state.grant.selected_user)
        .unwrap_or(0) as isize;
    let len = options.len() as isize;
    options[(current + delta).rem_euclid(len) as usize]
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = current as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

fn clamp_cursors(state: &AppState, view_data: &mut ViewData) {
    let tab = state.active_tab;
    if let Some(ListBody::Table(table)) = active_list(state, &view_data.base_url) {
        let row = view_data.row(tab).min(table.len().saturating_sub(1));
        view_data.set_row(tab, row);
        view_data.column = view_data.column.min(table.headers.len().saturating_sub(1));
    } else {
        view_data.set_row(tab, 0);
    }
    let photos = detail_photos(state).len();
    view_data.photo_cursor = view_data.photo_cursor.min(photos.saturating_sub(1));
}

fn active_list(state: &AppState, base_url: &str) -> Option<ListBody> {
    let cache = &state.cache;
    match state.active_tab {
        TabKind::Dashboard => None,
        TabKind::Users => Some(project(cache.users.as_deref(), &user_columns(), false)),
        TabKind::Admins => Some(project(cache.admins.as_deref(), &admin_columns(), false)),
        TabKind::Requests => Some(project(
            cache.requests.as_deref(),
            &request_columns(),
            true,
        )),
        TabKind::Templates => Some(project(
            cache.templates.as_deref(),
            &template_columns(base_url),
            false,
        )),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    if state.session.is_checking() {
        let loading = Paragraph::new(LOADING).block(Block::default().borders(Borders::ALL));
        frame.render_widget(loading, centered_rect(30, 20, frame.area()));
        return;
    }

    if !state.session.is_authenticated() {
        render_login(frame, state, view_data);
        render_alert(frame, state);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(
        TabKind::ALL
            .iter()
            .map(|tab| tab.label())
            .collect::<Vec<_>>(),
    )
    .block(
        Block::default()
            .title(header_title(state))
            .borders(Borders::ALL),
    )
    .style(Style::default().fg(Color::White))
    .highlight_style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .select(selected);
    frame.render_widget(tabs, layout[0]);

    let body_area = if state.loading {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(layout[1]);
        frame.render_widget(
            Paragraph::new(LOADING).style(Style::default().fg(Color::Yellow)),
            split[0],
        );
        split[1]
    } else {
        layout[1]
    };
    render_body(frame, body_area, state, view_data);

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status_widget, layout[2]);

    if let Some(template_id) = state.pending_delete {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let confirm = Paragraph::new(format!("{DELETE_CONFIRMATION}\n\ny подтвердить | n отмена"))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(format!("макет #{template_id}"))
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(confirm, area);
    }

    if let Some(text) = state
        .detail
        .as_ref()
        .and_then(|detail| render_lightbox_text(detail, &view_data.base_url))
    {
        let area = centered_rect(70, 40, frame.area());
        frame.render_widget(Clear, area);
        let lightbox = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::default().title("фото").borders(Borders::ALL));
        frame.render_widget(lightbox, area);
    }

    if view_data.help_visible {
        let area = centered_rect(80, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }

    render_alert(frame, state);
}

fn render_alert(frame: &mut ratatui::Frame<'_>, state: &AppState) {
    let Some(message) = &state.alert else {
        return;
    };
    let area = centered_rect(60, 25, frame.area());
    frame.render_widget(Clear, area);
    let alert = Paragraph::new(format!("{message}\n\nenter OK"))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("ошибка")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(alert, area);
}

fn render_body(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    match state.active_tab {
        TabKind::Dashboard => {
            let body = Paragraph::new(render_dashboard_text(state))
                .block(Block::default().borders(Borders::ALL).title(TabKind::Dashboard.label()));
            frame.render_widget(body, area);
        }
        TabKind::Requests if state.selected_request.is_some() => {
            let title = state
                .detail
                .as_ref()
                .map_or_else(|| TabKind::Requests.label().to_owned(), detail_title);
            let text = state
                .detail
                .as_ref()
                .map(|detail| {
                    render_detail_text(detail, view_data.photo_cursor, &view_data.base_url)
                })
                .unwrap_or_default();
            let body = Paragraph::new(text)
                .wrap(Wrap { trim: false })
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(body, area);
        }
        TabKind::Admins => {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(1)])
                .split(area);
            let grant = Paragraph::new(render_grant_text(state))
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(grant, split[0]);
            render_list(frame, split[1], state, view_data);
        }
        TabKind::Templates => {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(7), Constraint::Min(1)])
                .split(area);
            let form = Paragraph::new(render_upload_text(state, view_data)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Загрузить новый макет"),
            );
            frame.render_widget(form, split[0]);
            render_list(frame, split[1], state, view_data);
        }
        TabKind::Users | TabKind::Requests => render_list(frame, area, state, view_data),
    }
}

fn render_list(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let title = state.active_tab.label();
    let Some(body) = active_list(state, &view_data.base_url) else {
        return;
    };
    let table = match body {
        ListBody::Empty(message) => {
            let empty = Paragraph::new(message)
                .block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(empty, area);
            return;
        }
        ListBody::Table(table) => table,
    };

    let selected_row = view_data.row(state.active_tab);
    let widths = vec![Constraint::Min(6); table.headers.len().max(1)];
    let header = Row::new(table.headers.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = table.rows.iter().enumerate().map(|(row_index, row)| {
        let cells = row
            .cells
            .iter()
            .enumerate()
            .map(|(column_index, text)| {
                let mut style = Style::default();
                if table.clickable {
                    style = style.fg(Color::LightBlue);
                }
                if table.actions.get(column_index).is_some_and(Option::is_some) {
                    style = style.fg(Color::Red);
                }
                if row_index == selected_row {
                    style = style.bg(Color::DarkGray);
                    if column_index == view_data.column {
                        style = Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD);
                    }
                }
                Cell::from(text.clone()).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let widget = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(format!("{title} ({})", table.len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(widget, area);
}

fn render_login(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let area = centered_rect(70, 60, frame.area());
    let login = Paragraph::new(render_login_text(state, view_data))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Панель Администратора")
                .borders(Borders::ALL),
        );
    frame.render_widget(login, area);

    if let Some(status) = &state.status_line {
        let footer = Rect {
            y: frame.area().bottom().saturating_sub(1),
            height: 1,
            ..frame.area()
        };
        frame.render_widget(
            Paragraph::new(status.as_str()).style(Style::default().fg(Color::Yellow)),
            footer,
        );
    }
}

fn render_login_text(state: &AppState, view_data: &ViewData) -> String {
    let mut lines = vec![
        APP_TITLE.to_owned(),
        String::new(),
        "Для доступа к панели администратора необходимо авторизоваться через Telegram".to_owned(),
        String::new(),
        format!(
            "Откройте виджет входа бота {} и вставьте сюда полученные данные (JSON или ссылку перенаправления), затем нажмите enter.",
            telegram_handle(&state.login.bot_username)
        ),
        String::new(),
        format!("> {}_", view_data.login_input),
    ];
    if state.login.submitting {
        lines.push("Проверка...".to_owned());
    }
    lines.push(String::new());
    lines.push("⚠️ Доступ разрешен только администраторам системы".to_owned());
    lines.join("\n")
}

fn header_title(state: &AppState) -> String {
    let Some(user) = state.session.user() else {
        return APP_TITLE.to_owned();
    };
    let mut title = format!(
        "{APP_TITLE} - Панель Администратора | {}",
        full_name(user.first_name.as_deref(), user.last_name.as_deref())
    );
    if let Some(username) = user.username.as_deref().filter(|name| !name.is_empty()) {
        title.push(' ');
        title.push_str(&telegram_handle(username));
    }
    title.push_str(" | L Выйти");
    title
}

fn render_dashboard_text(state: &AppState) -> String {
    let stats = [
        ("Пользователи", Resource::Users),
        ("Администраторы", Resource::Admins),
        ("Заявки", Resource::Requests),
        ("Устаревшие макеты", Resource::Templates),
    ];
    stats
        .iter()
        .map(|(label, resource)| format!("{label}: {}", state.cache.count(*resource)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_grant_text(state: &AppState) -> String {
    let selected = state
        .grant
        .selected_user
        .map(|user_id| match state.cache.user(user_id) {
            Some(user) => grant_option_label(
                user.first_name.as_deref(),
                user.last_name.as_deref(),
                user.username.as_deref(),
                user.tg_id,
            ),
            None => format!("#{user_id}"),
        })
        .unwrap_or_else(|| GRANT_PLACEHOLDER.to_owned());
    let button = if state.grant.submitting {
        "Добавление..."
    } else {
        "a Добавить администратора"
    };
    format!("u/U {selected} | {button}")
}

fn render_upload_text(state: &AppState, view_data: &ViewData) -> String {
    let form = &state.upload;
    let field = |target: EditTarget, value: &str| -> String {
        if view_data.editing == Some(target) {
            format!("{}: {}_", target.label(), view_data.edit_buffer)
        } else if value.is_empty() {
            format!("{}: —", target.label())
        } else {
            format!("{}: {value}", target.label())
        }
    };
    let image = form
        .image
        .as_ref()
        .map(|image| format!("{} ({})", image.file_name, image.mime_type))
        .unwrap_or_default();
    let button = if form.submitting {
        "Загрузка...".to_owned()
    } else if form.can_submit() {
        "s Загрузить макет".to_owned()
    } else {
        "Загрузить макет (нужны название и файл)".to_owned()
    };
    [
        format!("n {}", field(EditTarget::TemplateName, &form.name)),
        format!("e {}", field(EditTarget::TemplateDescription, &form.description)),
        format!("f {}", field(EditTarget::TemplateImagePath, &image)),
        String::new(),
        button,
    ]
    .join("\n")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | tab/shift+tab or 1-5 tabs | r refresh | L logout | ? help\n\
list: j/k rows | h/l columns | enter open request / run action\n\
requests detail: j/k photos | enter full-size photo | esc back\n\
admins: u/U pick user | x clear | a grant\n\
templates: n name | e description | f image path | s upload | d delete\n\
edit: type | enter save | esc cancel\n\
alerts: enter dismiss | confirm: y/n"
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }
    let hints = if view_data.editing.is_some() {
        "enter save | esc cancel"
    } else if detail_visible(state) {
        "j/k photo | enter open | esc back | ? help"
    } else {
        "tab/1-5 | j/k/h/l | enter | r refresh | ? help | ctrl+q"
    };
    match &state.status_line {
        Some(status) => format!("{status} | {hints}"),
        None => hints.to_owned(),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, ViewData, cycle_grant_user, handle_internal_event,
        handle_key_event, handle_paste, header_title, render_dashboard_text, render_grant_text,
        render_login_text, render_upload_text, status_text,
    };
    use crate::detail_view::render_lightbox_text;
    use anyhow::Result;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use regdesk_app::{
        AppCommand, AppState, DetailPhase, GRANT_FAILED, Job, JobOutput, RequestId, TabKind,
        TemplateId, UserId,
    };
    use regdesk_testkit::{DEMO_ACCESS_DENIED, DEMO_BOT_USERNAME, DemoService, fixture_png};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct TestRuntime {
        service: DemoService,
        jobs: Mutex<Vec<Job>>,
    }

    impl AppRuntime for TestRuntime {
        fn run_job(&self, job: &Job) -> Result<JobOutput> {
            if let Ok(mut jobs) = self.jobs.lock() {
                jobs.push(job.clone());
            }
            self.service.run(job)
        }

        fn base_url(&self) -> String {
            "http://demo".to_owned()
        }
    }

    struct Harness {
        state: AppState,
        runtime: Arc<TestRuntime>,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
    }

    impl Harness {
        fn start(service: DemoService) -> Self {
            let runtime = Arc::new(TestRuntime {
                service,
                jobs: Mutex::new(Vec::new()),
            });
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: AppState::new(TabKind::Dashboard, "fallback_bot"),
                view_data: ViewData {
                    base_url: runtime.base_url(),
                    ..ViewData::default()
                },
                runtime,
                tx,
                rx,
            };
            super::dispatch(
                &mut harness.state,
                &harness.runtime,
                &mut harness.view_data,
                &harness.tx,
                AppCommand::Start,
            );
            harness.settle();
            harness
        }

        fn settle(&mut self) {
            while self.state.has_pending_jobs() {
                let event = self
                    .rx
                    .recv_timeout(Duration::from_secs(5))
                    .expect("background jobs should settle");
                handle_internal_event(
                    &mut self.state,
                    &self.runtime,
                    &mut self.view_data,
                    &self.tx,
                    event,
                );
            }
        }

        fn press(&mut self, keys: &[KeyEvent]) -> bool {
            let mut quit = false;
            for key in keys {
                quit |= handle_key_event(
                    &mut self.state,
                    &self.runtime,
                    &mut self.view_data,
                    &self.tx,
                    *key,
                );
                self.settle();
            }
            quit
        }

        fn typed(&mut self, text: &str) {
            let keys = text.chars().map(|ch| key(KeyCode::Char(ch))).collect::<Vec<_>>();
            self.press(&keys);
        }

        fn take_jobs(&self) -> Vec<Job> {
            self.runtime
                .jobs
                .lock()
                .map(|mut jobs| std::mem::take(&mut *jobs))
                .unwrap_or_default()
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn nothing_is_interactive_while_the_probe_runs() {
        let runtime = Arc::new(TestRuntime {
            service: DemoService::new(1),
            jobs: Mutex::new(Vec::new()),
        });
        let (tx, _rx) = mpsc::channel();
        let mut state = AppState::default();
        let mut view_data = ViewData::default();

        assert!(!handle_key_event(
            &mut state,
            &runtime,
            &mut view_data,
            &tx,
            key(KeyCode::Char('2')),
        ));
        assert_eq!(state.active_tab, TabKind::Dashboard);
        assert!(handle_key_event(
            &mut state,
            &runtime,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        ));
    }

    #[test]
    fn restored_session_lands_on_dashboard_with_counts() {
        let harness = Harness::start(DemoService::new(1));
        assert!(harness.state.session.is_authenticated());
        assert!(!harness.state.loading);

        let text = render_dashboard_text(&harness.state);
        assert_eq!(
            text,
            "Пользователи: 14\nАдминистраторы: 2\nЗаявки: 16\nУстаревшие макеты: 4"
        );
        let title = header_title(&harness.state);
        assert!(title.contains("Иван Петров"), "{title}");
        assert!(title.contains("Выйти"));
    }

    #[test]
    fn pasted_widget_payload_signs_in_without_restart() -> Result<()> {
        let mut harness = Harness::start(DemoService::signed_out(1));
        assert!(harness.state.session.is_anonymous());
        assert_eq!(harness.state.login.bot_username, DEMO_BOT_USERNAME);
        let login = render_login_text(&harness.state, &harness.view_data);
        assert!(login.contains("@regdesk_demo_bot"));
        assert!(login.contains("Доступ разрешен только администраторам системы"));

        let admin_id = harness.runtime.service.snapshot()?.session_user().id;
        handle_paste(
            &harness.state,
            &mut harness.view_data,
            &format!(r#"{{"id":{admin_id},"auth_date":1700000000,"hash":"abc"}}"#),
        );
        harness.press(&[key(KeyCode::Enter)]);

        assert!(harness.state.session.is_authenticated());
        assert!(!harness.state.login.is_mounted());
        assert_eq!(harness.state.cache.count(regdesk_app::Resource::Users), 14);
        Ok(())
    }

    #[test]
    fn rejected_login_alerts_and_stays_on_login() {
        let mut harness = Harness::start(DemoService::signed_out(1));
        harness.typed(r#"{"id":5,"auth_date":1700000000,"hash":"abc"}"#);
        harness.press(&[key(KeyCode::Enter)]);

        assert_eq!(harness.state.alert.as_deref(), Some(DEMO_ACCESS_DENIED));
        assert!(harness.state.session.is_anonymous());

        harness.press(&[key(KeyCode::Enter)]);
        assert_eq!(harness.state.alert, None);
        assert!(harness.state.login.is_mounted());
    }

    #[test]
    fn garbage_login_input_only_sets_status() {
        let mut harness = Harness::start(DemoService::signed_out(1));
        harness.take_jobs();
        harness.typed("hello");
        harness.press(&[key(KeyCode::Enter)]);

        assert!(harness.take_jobs().is_empty());
        assert!(harness.state.status_line.is_some());
        assert!(harness.state.session.is_anonymous());
    }

    #[test]
    fn tab_keys_load_only_that_tabs_collections() {
        let mut harness = Harness::start(DemoService::new(1));
        harness.take_jobs();

        harness.press(&[key(KeyCode::Char('3'))]);
        assert_eq!(harness.state.active_tab, TabKind::Admins);
        let jobs = harness.take_jobs();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.contains(&Job::LoadCollection(regdesk_app::Resource::Admins)));
        assert!(jobs.contains(&Job::LoadCollection(regdesk_app::Resource::Users)));

        harness.press(&[key(KeyCode::Tab)]);
        assert_eq!(harness.state.active_tab, TabKind::Requests);
        assert_eq!(
            harness.take_jobs(),
            vec![Job::LoadCollection(regdesk_app::Resource::Requests)]
        );

        harness.press(&[key(KeyCode::Char('4'))]);
        assert!(harness.take_jobs().is_empty());
    }

    #[test]
    fn request_row_opens_detail_and_photo_lightbox() -> Result<()> {
        let mut harness = Harness::start(DemoService::new(1));
        harness.press(&[key(KeyCode::Char('4'))]);

        let data = harness.runtime.service.snapshot()?;
        let with_photo = data
            .files
            .iter()
            .find(|file| file.kind.is_photo())
            .map(|file| file.request_id)
            .expect("demo data has photos");
        let row = harness
            .state
            .cache
            .requests
            .as_ref()
            .and_then(|requests| requests.iter().position(|request| request.id == with_photo))
            .expect("request listed");
        harness.view_data.set_row(TabKind::Requests, row);

        harness.press(&[key(KeyCode::Enter)]);
        assert_eq!(harness.state.selected_request, Some(with_photo));
        let detail = harness.state.detail.as_ref().expect("detail mounted");
        assert_eq!(detail.phase(), &DetailPhase::Ready);
        assert!(detail.photo_count() > 0);
        assert!(
            status_text(&harness.state, &harness.view_data).contains("esc back")
        );

        harness.press(&[key(KeyCode::Enter)]);
        let detail = harness.state.detail.as_ref().expect("detail mounted");
        let lightbox =
            render_lightbox_text(detail, &harness.view_data.base_url).expect("lightbox open");
        assert!(lightbox.contains("http://demo/api/uploads/"));
        assert!(lightbox.contains("image/jpeg"));

        harness.press(&[key(KeyCode::Esc)]);
        assert!(harness.state.detail.as_ref().is_some_and(|detail| detail.lightbox().is_none()));

        harness.press(&[key(KeyCode::Esc)]);
        assert_eq!(harness.state.selected_request, None);
        assert_eq!(harness.state.detail, None);
        Ok(())
    }

    #[test]
    fn switching_tabs_keeps_the_open_request() {
        let mut harness = Harness::start(DemoService::new(1));
        harness.press(&[key(KeyCode::Char('4')), key(KeyCode::Enter)]);
        let selected = harness.state.selected_request;
        assert_eq!(selected, Some(RequestId::new(16)));

        harness.press(&[key(KeyCode::Char('1')), key(KeyCode::Char('4'))]);
        assert_eq!(harness.state.selected_request, selected);
    }

    #[test]
    fn grant_needs_a_selection_and_retains_it_on_failure() {
        let mut harness = Harness::start(DemoService::new(1));
        harness.press(&[key(KeyCode::Char('3'))]);
        harness.take_jobs();

        harness.press(&[key(KeyCode::Char('a'))]);
        assert!(harness.take_jobs().is_empty());
        assert!(render_grant_text(&harness.state).contains("Выберите пользователя"));

        // The first user is already an admin, so the grant fails.
        harness.press(&[key(KeyCode::Char('u')), key(KeyCode::Char('a'))]);
        assert_eq!(harness.state.alert.as_deref(), Some(GRANT_FAILED));
        assert_eq!(harness.state.grant.selected_user, Some(UserId::new(1)));
        harness.press(&[key(KeyCode::Enter)]);

        harness.press(&[
            key(KeyCode::Char('u')),
            key(KeyCode::Char('u')),
            key(KeyCode::Char('a')),
        ]);
        assert_eq!(harness.state.alert, None);
        assert_eq!(harness.state.grant.selected_user, None);
        assert_eq!(harness.state.cache.count(regdesk_app::Resource::Admins), 3);
    }

    #[test]
    fn grant_selector_wraps_through_placeholder() {
        let mut harness = Harness::start(DemoService::new(1));
        harness.press(&[key(KeyCode::Char('3'))]);
        assert_eq!(cycle_grant_user(&harness.state, -1), Some(UserId::new(14)));
        assert_eq!(cycle_grant_user(&harness.state, 1), Some(UserId::new(1)));
        harness.state.grant.selected_user = Some(UserId::new(14));
        assert_eq!(cycle_grant_user(&harness.state, 1), None);
    }

    #[test]
    fn template_delete_waits_for_confirmation() {
        let mut harness = Harness::start(DemoService::new(1));
        harness.press(&[key(KeyCode::Char('5'))]);
        harness.take_jobs();

        harness.press(&[key(KeyCode::Char('d'))]);
        assert_eq!(harness.state.pending_delete, Some(TemplateId::new(1)));
        harness.press(&[key(KeyCode::Char('n'))]);
        assert_eq!(harness.state.pending_delete, None);
        assert!(harness.take_jobs().is_empty());

        harness.view_data.column = 4;
        harness.press(&[key(KeyCode::Enter), key(KeyCode::Char('y'))]);
        let jobs = harness.take_jobs();
        assert_eq!(jobs[0], Job::DeleteTemplate(TemplateId::new(1)));
        assert_eq!(harness.state.cache.count(regdesk_app::Resource::Templates), 3);
    }

    #[test]
    fn upload_form_requires_name_and_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("blue.png");
        std::fs::write(&image, fixture_png())?;

        let mut harness = Harness::start(DemoService::new(1));
        harness.press(&[key(KeyCode::Char('5')), key(KeyCode::Char('n'))]);
        harness.typed("Синий");
        harness.press(&[key(KeyCode::Enter), key(KeyCode::Char('e'))]);
        harness.typed("описание");
        harness.press(&[key(KeyCode::Enter)]);
        assert_eq!(harness.state.upload.name, "Синий");
        assert_eq!(harness.state.upload.description, "описание");

        harness.take_jobs();
        harness.press(&[key(KeyCode::Char('s'))]);
        assert!(harness.take_jobs().is_empty());

        harness.press(&[key(KeyCode::Char('f'))]);
        harness.typed("/missing/notes.txt");
        harness.press(&[key(KeyCode::Enter)]);
        assert!(harness.state.upload.image.is_none());
        assert!(
            harness
                .state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("is not an image"))
        );

        harness.press(&[key(KeyCode::Char('f'))]);
        handle_paste(
            &harness.state,
            &mut harness.view_data,
            &image.display().to_string(),
        );
        harness.press(&[key(KeyCode::Enter)]);
        assert!(render_upload_text(&harness.state, &harness.view_data).contains("blue.png"));

        harness.press(&[key(KeyCode::Char('s'))]);
        assert_eq!(harness.state.upload.name, "");
        assert_eq!(harness.state.upload.image, None);
        assert_eq!(harness.state.cache.count(regdesk_app::Resource::Templates), 5);
        assert_eq!(harness.state.status_line.as_deref(), Some("макет загружен"));
        Ok(())
    }

    #[test]
    fn logout_returns_to_login_screen() {
        let mut harness = Harness::start(DemoService::new(1));
        harness.press(&[key(KeyCode::Char('4')), key(KeyCode::Char('L'))]);
        assert!(harness.state.session.is_anonymous());
        assert!(harness.state.login.is_mounted());
        assert_eq!(harness.state.active_tab, TabKind::Dashboard);
        assert_eq!(harness.state.cache.count(regdesk_app::Resource::Users), 0);
    }

    #[test]
    fn stale_status_clear_tokens_are_ignored() {
        let mut harness = Harness::start(DemoService::new(1));
        harness.press(&[key(KeyCode::Char('r'))]);
        assert_eq!(harness.state.status_line.as_deref(), Some("обновлено"));
        let token = harness.view_data.status_token;

        handle_internal_event(
            &mut harness.state,
            &harness.runtime,
            &mut harness.view_data,
            &harness.tx,
            InternalEvent::ClearStatus { token: token - 1 },
        );
        assert!(harness.state.status_line.is_some());

        handle_internal_event(
            &mut harness.state,
            &harness.runtime,
            &mut harness.view_data,
            &harness.tx,
            InternalEvent::ClearStatus { token },
        );
        assert_eq!(harness.state.status_line, None);
    }
}
