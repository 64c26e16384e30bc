// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use rideboard_app::{
    Appointment, AppointmentId, AppointmentStatus, BadgeTone, CalendarEvent, DetailView, Overview,
    OverviewCommand, OverviewEvent, Vehicle, VehicleId, ViewMode, badge_for, format_clock,
    format_day, format_iso_day, parse_iso_day,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::{Date, OffsetDateTime};

const EMPTY_TEXT: &str = "Keine Termine gefunden";
const DELETE_PROMPT: &str = "Sind Sie sicher, dass Sie diesen Termin löschen möchten?";
const CURSOR_MARK: &str = "▸";
const DATE_INPUT_MAX: usize = 10;

/// Storage seam for the dashboard. The CLI backs it with the SQLite store.
pub trait AppRuntime {
    fn load_appointments(&mut self) -> Result<Vec<Appointment>>;
    fn list_vehicles(&mut self) -> Result<Vec<Vehicle>>;
    fn set_status(
        &mut self,
        appointment_id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Result<()>;
    fn assign_vehicle(
        &mut self,
        appointment_id: &AppointmentId,
        vehicle_id: Option<&VehicleId>,
    ) -> Result<()>;
    fn delete_appointment(&mut self, appointment_id: &AppointmentId) -> Result<()>;
}

/// Hour rows shown in the calendar day grid, `start_hour..end_hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarBounds {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl Default for CalendarBounds {
    fn default() -> Self {
        Self {
            start_hour: 6,
            end_hour: 20,
        }
    }
}

impl CalendarBounds {
    fn slot_for(self, hour: u8) -> u8 {
        let last = self.end_hour.saturating_sub(1).max(self.start_hour);
        hour.clamp(self.start_hour, last)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum InputMode {
    #[default]
    Nav,
    Search {
        previous: String,
    },
    Date {
        buffer: String,
    },
    ConfirmDelete(AppointmentId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    cursor: usize,
    input: InputMode,
    help_visible: bool,
    status_line: Option<String>,
    status_token: u64,
    vehicles: Vec<Vehicle>,
    bounds: CalendarBounds,
    today: Date,
}

impl ViewData {
    fn new(bounds: CalendarBounds, today: Date) -> Self {
        Self {
            cursor: 0,
            input: InputMode::Nav,
            help_visible: false,
            status_line: None,
            status_token: 0,
            vehicles: Vec::new(),
            bounds,
            today,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    overview: &mut Overview,
    runtime: &mut R,
    bounds: CalendarBounds,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let today = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date();
    let mut view_data = ViewData::new(bounds, today);
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(overview, runtime, &mut view_data) {
        tracing::warn!("initial load failed: {error:#}");
        view_data.status_line = Some(format!("Laden fehlgeschlagen: {error}"));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(&mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, overview, &view_data)) {
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
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(overview, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(view_data: &mut ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
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

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn refresh_view_data<R: AppRuntime>(
    overview: &mut Overview,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    overview.replace_records(runtime.load_appointments()?);
    view_data.vehicles = runtime.list_vehicles()?;
    clamp_cursor(overview, view_data);
    Ok(())
}

fn clamp_cursor(overview: &Overview, view_data: &mut ViewData) {
    view_data.cursor = view_data
        .cursor
        .min(overview.visible().len().saturating_sub(1));
}

fn dispatch(
    overview: &mut Overview,
    view_data: &mut ViewData,
    command: OverviewCommand,
) -> Vec<OverviewEvent> {
    let events = overview.dispatch(command);
    if events.iter().any(OverviewEvent::changes_visible_set) {
        clamp_cursor(overview, view_data);
    }
    events
}

fn handle_key_event<R: AppRuntime>(
    overview: &mut Overview,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    match view_data.input.clone() {
        InputMode::Nav => {}
        InputMode::Search { previous } => {
            handle_search_key(overview, view_data, previous, key);
            return false;
        }
        InputMode::Date { buffer } => {
            handle_date_key(overview, view_data, internal_tx, buffer, key);
            return false;
        }
        InputMode::ConfirmDelete(appointment_id) => {
            handle_confirm_key(overview, runtime, view_data, internal_tx, appointment_id, key);
            return false;
        }
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Char('v') => {
            dispatch(overview, view_data, OverviewCommand::ToggleViewMode);
            let label = overview.state().view_mode.label();
            emit_status(view_data, internal_tx, format!("Ansicht: {label}"));
        }
        KeyCode::Char('j') | KeyCode::Down => move_cursor(overview, view_data, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(overview, view_data, -1),
        KeyCode::Enter => {
            if let Some(record) = overview.visible().get(view_data.cursor) {
                let appointment_id = record.id.clone();
                dispatch(
                    overview,
                    view_data,
                    OverviewCommand::SelectAppointment(appointment_id),
                );
            }
        }
        KeyCode::Esc => {
            if overview.state().detail_open {
                dispatch(overview, view_data, OverviewCommand::CloseDetail);
            }
        }
        KeyCode::Char('o') => {
            if dispatch(overview, view_data, OverviewCommand::ReopenDetail).is_empty() {
                emit_status(view_data, internal_tx, "Kein Termin ausgewählt");
            }
        }
        KeyCode::Char('s') => {
            dispatch(overview, view_data, OverviewCommand::CycleStatusFilter);
            let label = overview.state().filter.status.label();
            emit_status(view_data, internal_tx, format!("Filter: {label}"));
        }
        KeyCode::Char('/') => {
            view_data.input = InputMode::Search {
                previous: overview.state().filter.query.clone(),
            };
        }
        KeyCode::Char('g') => {
            view_data.input = InputMode::Date {
                buffer: overview
                    .state()
                    .selected_date
                    .map(format_iso_day)
                    .unwrap_or_default(),
            };
        }
        KeyCode::Char('h') | KeyCode::Left => shift_day(overview, view_data, internal_tx, -1),
        KeyCode::Char('l') | KeyCode::Right => shift_day(overview, view_data, internal_tx, 1),
        KeyCode::Char('t') => {
            let today = view_data.today;
            dispatch(overview, view_data, OverviewCommand::SetSelectedDate(Some(today)));
        }
        KeyCode::Char('c') => {
            dispatch(overview, view_data, OverviewCommand::SetSelectedDate(None));
            emit_status(view_data, internal_tx, "Alle Tage");
        }
        KeyCode::Char('x') => {
            dispatch(
                overview,
                view_data,
                OverviewCommand::SetStatusFilter(Default::default()),
            );
            dispatch(overview, view_data, OverviewCommand::SetQuery(String::new()));
            emit_status(view_data, internal_tx, "Filter zurückgesetzt");
        }
        KeyCode::Char('a') => advance_status(overview, runtime, view_data, internal_tx),
        KeyCode::Char('w') => cycle_vehicle(overview, runtime, view_data, internal_tx),
        KeyCode::Char('d') => match target_record(overview, view_data) {
            Some(record) => view_data.input = InputMode::ConfirmDelete(record.id),
            None => emit_status(view_data, internal_tx, "Kein Termin ausgewählt"),
        },
        KeyCode::Char('r') => match refresh_view_data(overview, runtime, view_data) {
            Ok(()) => emit_status(view_data, internal_tx, "Aktualisiert"),
            Err(error) => report_failure(view_data, internal_tx, "Laden", &error),
        },
        _ => {}
    }
    false
}

fn handle_search_key(
    overview: &mut Overview,
    view_data: &mut ViewData,
    previous: String,
    key: KeyEvent,
) {
    let mut query = overview.state().filter.query.clone();
    match key.code {
        KeyCode::Enter => view_data.input = InputMode::Nav,
        KeyCode::Esc => {
            dispatch(overview, view_data, OverviewCommand::SetQuery(previous));
            view_data.input = InputMode::Nav;
        }
        KeyCode::Backspace => {
            query.pop();
            dispatch(overview, view_data, OverviewCommand::SetQuery(query));
        }
        KeyCode::Char(ch) => {
            query.push(ch);
            dispatch(overview, view_data, OverviewCommand::SetQuery(query));
        }
        _ => {}
    }
}

fn handle_date_key(
    overview: &mut Overview,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    mut buffer: String,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => view_data.input = InputMode::Nav,
        KeyCode::Backspace => {
            buffer.pop();
            view_data.input = InputMode::Date { buffer };
        }
        KeyCode::Char(ch) if (ch.is_ascii_digit() || ch == '-') && buffer.len() < DATE_INPUT_MAX => {
            buffer.push(ch);
            view_data.input = InputMode::Date { buffer };
        }
        KeyCode::Enter if buffer.trim().is_empty() => {
            dispatch(overview, view_data, OverviewCommand::SetSelectedDate(None));
            view_data.input = InputMode::Nav;
        }
        KeyCode::Enter => match parse_iso_day(&buffer) {
            Some(day) => {
                dispatch(overview, view_data, OverviewCommand::SetSelectedDate(Some(day)));
                view_data.input = InputMode::Nav;
            }
            None => emit_status(
                view_data,
                internal_tx,
                format!("Ungültiges Datum {buffer:?} -- Format JJJJ-MM-TT"),
            ),
        },
        _ => {}
    }
}

fn handle_confirm_key<R: AppRuntime>(
    overview: &mut Overview,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    appointment_id: AppointmentId,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') => {
            view_data.input = InputMode::Nav;
            let deleted = apply_mutation(
                overview,
                runtime,
                view_data,
                internal_tx,
                "Löschen",
                "Termin gelöscht".to_owned(),
                |runtime| runtime.delete_appointment(&appointment_id),
            );
            if deleted
                && overview.state().selected_appointment.as_ref() == Some(&appointment_id)
                && overview.state().detail_open
            {
                dispatch(overview, view_data, OverviewCommand::CloseDetail);
            }
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            view_data.input = InputMode::Nav;
            emit_status(view_data, internal_tx, "Löschen abgebrochen");
        }
        _ => {}
    }
}

fn move_cursor(overview: &Overview, view_data: &mut ViewData, delta: isize) {
    let len = overview.visible().len();
    if len == 0 {
        view_data.cursor = 0;
        return;
    }
    view_data.cursor = view_data.cursor.saturating_add_signed(delta).min(len - 1);
}

fn shift_day(
    overview: &mut Overview,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    days: i64,
) {
    let today = view_data.today;
    if dispatch(
        overview,
        view_data,
        OverviewCommand::ShiftSelectedDate { days, today },
    )
    .is_empty()
    {
        emit_status(
            view_data,
            internal_tx,
            "Datum außerhalb des Kalenders -- g für ein Datum oder t für heute",
        );
    }
}

/// The open detail wins over the list cursor.
fn target_record(overview: &Overview, view_data: &ViewData) -> Option<Appointment> {
    if overview.state().detail_open {
        return overview.selected_record().cloned();
    }
    overview.visible().get(view_data.cursor).cloned()
}

fn advance_status<R: AppRuntime>(
    overview: &mut Overview,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(record) = target_record(overview, view_data) else {
        emit_status(view_data, internal_tx, "Kein Termin ausgewählt");
        return;
    };
    let Some(next) = record.status.next() else {
        emit_status(
            view_data,
            internal_tx,
            format!("{} ist bereits erledigt", record.title()),
        );
        return;
    };
    apply_mutation(
        overview,
        runtime,
        view_data,
        internal_tx,
        "Status ändern",
        format!("{}: {}", record.title(), badge_for(next).label),
        |runtime| runtime.set_status(&record.id, next),
    );
}

fn cycle_vehicle<R: AppRuntime>(
    overview: &mut Overview,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(record) = target_record(overview, view_data) else {
        emit_status(view_data, internal_tx, "Kein Termin ausgewählt");
        return;
    };
    if view_data.vehicles.is_empty() {
        emit_status(view_data, internal_tx, "Keine Fahrzeuge verfügbar");
        return;
    }
    let next = next_vehicle(&view_data.vehicles, record.vehicle_id.as_ref());
    let message = match &next {
        Some(vehicle_id) => format!("{}: Fahrzeug {vehicle_id}", record.title()),
        None => format!("{}: kein Fahrzeug", record.title()),
    };
    apply_mutation(
        overview,
        runtime,
        view_data,
        internal_tx,
        "Fahrzeug zuweisen",
        message,
        |runtime| runtime.assign_vehicle(&record.id, next.as_ref()),
    );
}

/// none -> first -> ... -> last -> none. An unknown current vehicle restarts
/// at the first one.
fn next_vehicle(vehicles: &[Vehicle], current: Option<&VehicleId>) -> Option<VehicleId> {
    let Some(current) = current else {
        return vehicles.first().map(|vehicle| vehicle.id.clone());
    };
    match vehicles.iter().position(|vehicle| &vehicle.id == current) {
        Some(index) => vehicles.get(index + 1).map(|vehicle| vehicle.id.clone()),
        None => vehicles.first().map(|vehicle| vehicle.id.clone()),
    }
}

/// Runs a store write, reloads the snapshot and reports the outcome on the
/// status line. Returns whether the write went through.
fn apply_mutation<R, F>(
    overview: &mut Overview,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action_label: &str,
    success: String,
    action: F,
) -> bool
where
    R: AppRuntime,
    F: FnOnce(&mut R) -> Result<()>,
{
    if let Err(error) = action(runtime) {
        report_failure(view_data, internal_tx, action_label, &error);
        return false;
    }
    match refresh_view_data(overview, runtime, view_data) {
        Ok(()) => emit_status(view_data, internal_tx, success),
        Err(error) => report_failure(view_data, internal_tx, "Laden", &error),
    }
    true
}

fn report_failure(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action_label: &str,
    error: &anyhow::Error,
) {
    tracing::warn!("{action_label} failed: {error:#}");
    emit_status(
        view_data,
        internal_tx,
        format!("{action_label} fehlgeschlagen: {error}"),
    );
}

fn render(frame: &mut ratatui::Frame<'_>, overview: &Overview, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let modes = [ViewMode::Calendar, ViewMode::List];
    let selected = modes
        .iter()
        .position(|mode| *mode == overview.state().view_mode)
        .unwrap_or(0);
    let tabs = Tabs::new(modes.iter().map(|mode| mode.label()).collect::<Vec<_>>())
        .block(Block::default().title("rideboard").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let filter = Paragraph::new(filter_panel_text(overview, view_data))
        .block(Block::default().title("Filter").borders(Borders::ALL));
    frame.render_widget(filter, layout[1]);

    match overview.state().view_mode {
        ViewMode::Calendar => {
            let calendar = Paragraph::new(calendar_text(overview, view_data))
                .block(Block::default().title("Kalender").borders(Borders::ALL));
            frame.render_widget(calendar, layout[2]);
        }
        ViewMode::List => render_list(frame, layout[2], overview, view_data),
    }

    let status = Paragraph::new(status_text(overview, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    if let Some(detail) = overview.detail() {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(detail_text(&detail))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(detail.title)
                    .borders(Borders::ALL)
                    .style(Style::default().fg(badge_color(detail.badge.tone))),
            );
        frame.render_widget(body, area);
    }

    if let InputMode::ConfirmDelete(appointment_id) = &view_data.input {
        let area = centered_rect(56, 30, frame.area());
        frame.render_widget(Clear, area);
        let prompt = Paragraph::new(confirm_text(overview, appointment_id))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Termin löschen")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(prompt, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("Hilfe").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_list(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    overview: &Overview,
    view_data: &ViewData,
) {
    let block = Block::default().title("Liste").borders(Borders::ALL);
    if overview.visible().is_empty() {
        frame.render_widget(Paragraph::new(EMPTY_TEXT).block(block), area);
        return;
    }

    let rows = overview
        .table_rows()
        .into_iter()
        .zip(overview.visible())
        .enumerate()
        .map(|(index, (row, record))| {
            let mut style = Style::default();
            if index == view_data.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Row::new(vec![
                Cell::from(row.patient),
                Cell::from(format_day(record.time_window.day())),
                Cell::from(row.time),
                Cell::from(row.pickup),
                Cell::from(row.badge.label).style(Style::default().fg(badge_color(row.badge.tone))),
            ])
            .style(style)
        })
        .collect::<Vec<_>>();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(24),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Percentage(40),
            Constraint::Length(16),
        ],
    )
    .header(
        Row::new(vec!["Patient", "Datum", "Zeit", "Abholadresse", "Status"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .column_spacing(2)
    .block(block);
    frame.render_widget(table, area);
}

fn badge_color(tone: BadgeTone) -> Color {
    match tone {
        BadgeTone::Neutral => Color::Gray,
        BadgeTone::Info => Color::Blue,
        BadgeTone::Warning => Color::Yellow,
        BadgeTone::Success => Color::Green,
    }
}

fn filter_panel_text(overview: &Overview, view_data: &ViewData) -> String {
    let state = overview.state();
    let date = match &view_data.input {
        InputMode::Date { buffer } => format!("{buffer}_"),
        _ => state
            .selected_date
            .map_or_else(|| "alle Tage".to_owned(), format_day),
    };
    let query = match &view_data.input {
        InputMode::Search { .. } => format!("{}_", state.filter.query),
        _ if state.filter.query.is_empty() => "-".to_owned(),
        _ => state.filter.query.clone(),
    };
    format!(
        "Status: {} | Datum: {date} | Suche: {query} | {} von {} Terminen",
        state.filter.status.label(),
        overview.visible().len(),
        overview.records().len()
    )
}

/// Day grid of the visible set. With a selected date only that day is drawn,
/// otherwise one grid per day that has rides, in the order the cursor walks
/// them. Records in different offsets can put a later day block first.
fn calendar_text(overview: &Overview, view_data: &ViewData) -> String {
    let events = overview.calendar_events();
    let cursor_id = overview
        .visible()
        .get(view_data.cursor)
        .map(|record| record.id.clone());
    let days = match overview.state().selected_date {
        Some(day) => vec![day],
        None => {
            let mut days = Vec::new();
            for event in &events {
                let day = event.start.date();
                if !days.contains(&day) {
                    days.push(day);
                }
            }
            days
        }
    };
    if days.is_empty() {
        return EMPTY_TEXT.to_owned();
    }

    let bounds = view_data.bounds;
    let mut lines = Vec::new();
    for day in days {
        lines.push(format!("── {} ──", format_day(day)));
        let day_events = events
            .iter()
            .filter(|event| event.start.date() == day)
            .collect::<Vec<_>>();
        for hour in bounds.start_hour..bounds.end_hour {
            let slot = day_events
                .iter()
                .filter(|event| bounds.slot_for(event.start.hour()) == hour)
                .collect::<Vec<_>>();
            if slot.is_empty() {
                lines.push(format!("{hour:02}:00 │"));
                continue;
            }
            for (index, event) in slot.iter().enumerate() {
                let prefix = if index == 0 {
                    format!("{hour:02}:00 │")
                } else {
                    "      │".to_owned()
                };
                let mark = if cursor_id.as_ref() == Some(&event.id) {
                    CURSOR_MARK
                } else {
                    " "
                };
                lines.push(format!("{prefix} {mark} {}", calendar_event_label(event)));
            }
        }
        if day_events.is_empty() {
            lines.push(EMPTY_TEXT.to_owned());
        }
    }
    lines.join("\n")
}

fn calendar_event_label(event: &CalendarEvent) -> String {
    format!(
        "{}-{} {}  [{}]  {}",
        format_clock(event.start),
        format_clock(event.end),
        event.title,
        badge_for(event.status).label,
        event.pickup_address
    )
}

fn detail_text(detail: &DetailView) -> String {
    let mut lines = vec![detail.description.clone(), String::new()];
    lines.extend(detail.lines());
    lines.push(String::new());
    lines.push("esc schließen | a Status weiter | w Fahrzeug | d löschen".to_owned());
    lines.join("\n")
}

fn confirm_text(overview: &Overview, appointment_id: &AppointmentId) -> String {
    let title = overview
        .records()
        .iter()
        .find(|record| &record.id == appointment_id)
        .map_or_else(|| appointment_id.to_string(), Appointment::title);
    format!("{DELETE_PROMPT}\n\n{title}\n\ny löschen | n abbrechen")
}

fn status_text(overview: &Overview, view_data: &ViewData) -> String {
    let (mode, hints) = match &view_data.input {
        InputMode::Nav if overview.state().detail_open => (
            "DETAIL",
            "esc schließen | a Status weiter | w Fahrzeug | d löschen | q beenden",
        ),
        InputMode::Nav => (
            "NAV",
            "j/k wählen | enter Details | v Ansicht | s Status | / Suche | g Datum | h/l Tag | ? Hilfe | q beenden",
        ),
        InputMode::Search { .. } => ("SUCHE", "tippen filtert | enter übernehmen | esc verwerfen"),
        InputMode::Date { .. } => (
            "DATUM",
            "JJJJ-MM-TT | enter übernehmen, leer = alle Tage | esc abbrechen",
        ),
        InputMode::ConfirmDelete(_) => ("LÖSCHEN", "y löschen | n abbrechen"),
    };
    match &view_data.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "ansicht: v Kalender/Liste | j/k oder ↑/↓ Termin wählen | enter Details | esc schließen | o wieder öffnen\n\
filter: s Status durchschalten | / Suche (Name, Adresse) | x Filter zurücksetzen\n\
datum: g Datum eingeben | h/l Tag zurück/vor | t heute | c alle Tage\n\
bearbeiten: a Status weiter | w Fahrzeug wechseln | d löschen (mit Bestätigung) | r neu laden\n\
global: ? Hilfe | q oder ctrl+q beenden"
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
        AppRuntime, CalendarBounds, InputMode, InternalEvent, ViewData, calendar_text,
        detail_text, filter_panel_text, handle_key_event, next_vehicle, process_internal_events,
        refresh_view_data, render, status_text,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use rideboard_app::{
        Appointment, AppointmentId, AppointmentStatus, Overview, OverviewState, StatusFilter,
        TimeWindow, Vehicle, VehicleId, ViewMode,
    };
    use rideboard_testkit::{RideFaker, fixture_day};
    use std::sync::mpsc;
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    #[derive(Debug, Default)]
    struct TestRuntime {
        records: Vec<Appointment>,
        vehicles: Vec<Vehicle>,
        fail_writes: bool,
        write_count: usize,
    }

    impl TestRuntime {
        fn with_schedule(count: usize) -> Self {
            let mut faker = RideFaker::new(21);
            Self {
                records: faker.schedule(fixture_day(), count),
                vehicles: vec![vehicle("V001"), vehicle("V002")],
                ..Self::default()
            }
        }

        fn record(&self, appointment_id: &AppointmentId) -> Option<&Appointment> {
            self.records
                .iter()
                .find(|record| &record.id == appointment_id)
        }

        fn record_mut(&mut self, appointment_id: &AppointmentId) -> Result<&mut Appointment> {
            if self.fail_writes {
                bail!("database is locked");
            }
            self.write_count += 1;
            match self
                .records
                .iter_mut()
                .find(|record| &record.id == appointment_id)
            {
                Some(record) => Ok(record),
                None => bail!("appointment {appointment_id} not found"),
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_appointments(&mut self) -> Result<Vec<Appointment>> {
            Ok(self.records.clone())
        }

        fn list_vehicles(&mut self) -> Result<Vec<Vehicle>> {
            Ok(self.vehicles.clone())
        }

        fn set_status(
            &mut self,
            appointment_id: &AppointmentId,
            status: AppointmentStatus,
        ) -> Result<()> {
            self.record_mut(appointment_id)?.status = status;
            Ok(())
        }

        fn assign_vehicle(
            &mut self,
            appointment_id: &AppointmentId,
            vehicle_id: Option<&VehicleId>,
        ) -> Result<()> {
            self.record_mut(appointment_id)?.vehicle_id = vehicle_id.cloned();
            Ok(())
        }

        fn delete_appointment(&mut self, appointment_id: &AppointmentId) -> Result<()> {
            self.record_mut(appointment_id)?;
            self.records.retain(|record| &record.id != appointment_id);
            Ok(())
        }
    }

    fn vehicle(id: &str) -> Vehicle {
        Vehicle {
            id: VehicleId::new(id),
            label: format!("Wagen {id}"),
            license_plate: String::new(),
            kind: "Rollstuhl".to_owned(),
            capacity: Some(1),
            active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn setup(count: usize) -> Result<(Overview, TestRuntime, ViewData)> {
        let mut runtime = TestRuntime::with_schedule(count);
        let mut overview = Overview::new(Vec::new(), OverviewState::default());
        let mut view_data = ViewData::new(CalendarBounds::default(), fixture_day());
        refresh_view_data(&mut overview, &mut runtime, &mut view_data)?;
        Ok((overview, runtime, view_data))
    }

    fn press(
        overview: &mut Overview,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        code: KeyCode,
    ) -> bool {
        let (tx, _rx) = mpsc::channel();
        handle_key_event(
            overview,
            runtime,
            view_data,
            &tx,
            KeyEvent::new(code, KeyModifiers::NONE),
        )
    }

    fn type_text(
        overview: &mut Overview,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        text: &str,
    ) {
        for ch in text.chars() {
            press(overview, runtime, view_data, KeyCode::Char(ch));
        }
    }

    fn cursor_id(overview: &Overview, view_data: &ViewData) -> AppointmentId {
        overview.visible()[view_data.cursor].id.clone()
    }

    #[test]
    fn view_toggle_and_quit_keys() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(3)?;
        assert_eq!(overview.state().view_mode, ViewMode::Calendar);
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('v'));
        assert_eq!(overview.state().view_mode, ViewMode::List);
        assert!(status_text(&overview, &view_data).contains("Ansicht: Liste"));

        assert!(press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('q')));
        let (tx, _rx) = mpsc::channel();
        assert!(handle_key_event(
            &mut overview,
            &mut runtime,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        ));
        Ok(())
    }

    #[test]
    fn enter_selects_and_esc_closes_but_keeps_selection() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(4)?;
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('j'));
        let expected = cursor_id(&overview, &view_data);

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Enter);
        assert!(overview.state().detail_open);
        assert_eq!(overview.state().selected_appointment, Some(expected.clone()));
        assert!(status_text(&overview, &view_data).starts_with("DETAIL"));

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Esc);
        assert!(!overview.state().detail_open);
        assert_eq!(overview.state().selected_appointment, Some(expected));

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('o'));
        assert!(overview.detail().is_some());
        Ok(())
    }

    #[test]
    fn cursor_stays_inside_visible_set() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(3)?;
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('k'));
        assert_eq!(view_data.cursor, 0);
        for _ in 0..10 {
            press(&mut overview, &mut runtime, &mut view_data, KeyCode::Down);
        }
        assert_eq!(view_data.cursor, 2);

        // One status bucket leaves a single row; the cursor follows it.
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('s'));
        assert_eq!(
            overview.state().filter.status,
            StatusFilter::Only(AppointmentStatus::Unassigned)
        );
        assert_eq!(overview.visible().len(), 1);
        assert_eq!(view_data.cursor, 0);
        Ok(())
    }

    #[test]
    fn search_mode_filters_live_and_esc_restores() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(4)?;
        let target = overview.visible()[2].patient.last_name.to_lowercase();

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('/'));
        assert!(matches!(view_data.input, InputMode::Search { .. }));
        type_text(&mut overview, &mut runtime, &mut view_data, &target);
        assert_eq!(overview.state().filter.query, target);
        assert!(
            overview
                .visible()
                .iter()
                .all(|record| record.patient.full_name().to_lowercase().contains(&target)
                    || record.pickup_address.to_lowercase().contains(&target)
                    || record.destination_address.to_lowercase().contains(&target))
        );
        assert!(filter_panel_text(&overview, &view_data).contains(&format!("{target}_")));

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Esc);
        assert_eq!(view_data.input, InputMode::Nav);
        assert_eq!(overview.state().filter.query, "");
        assert_eq!(overview.visible().len(), 4);
        Ok(())
    }

    #[test]
    fn date_entry_switches_to_calendar_on_that_day() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(2)?;
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('v'));
        assert_eq!(overview.state().view_mode, ViewMode::List);

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('g'));
        type_text(&mut overview, &mut runtime, &mut view_data, "2026-06-16");
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Enter);

        let next_day = fixture_day() + Duration::days(1);
        assert_eq!(overview.state().selected_date, Some(next_day));
        assert_eq!(overview.state().filter.date, Some(next_day));
        assert_eq!(overview.state().view_mode, ViewMode::Calendar);
        assert!(overview.visible().is_empty());
        assert!(calendar_text(&overview, &view_data).contains("Keine Termine gefunden"));

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('h'));
        assert_eq!(overview.state().selected_date, Some(fixture_day()));
        assert_eq!(overview.visible().len(), 2);
        Ok(())
    }

    #[test]
    fn invalid_date_stays_in_date_mode() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(1)?;
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('g'));
        type_text(&mut overview, &mut runtime, &mut view_data, "2026-13-01");
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Enter);
        assert!(matches!(view_data.input, InputMode::Date { .. }));
        assert!(status_text(&overview, &view_data).contains("Ungültiges Datum"));
        assert_eq!(overview.state().selected_date, None);
        Ok(())
    }

    #[test]
    fn shifting_without_a_date_starts_from_today() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(1)?;
        assert_eq!(overview.state().selected_date, None);
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('l'));
        assert_eq!(
            overview.state().selected_date,
            Some(fixture_day() + Duration::days(1))
        );
        assert!(overview.visible().is_empty());

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('c'));
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Left);
        assert_eq!(
            overview.state().selected_date,
            Some(fixture_day() - Duration::days(1))
        );

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('t'));
        assert_eq!(overview.state().selected_date, Some(fixture_day()));
        Ok(())
    }

    #[test]
    fn advance_status_writes_through_runtime() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(1)?;
        let id = cursor_id(&overview, &view_data);
        assert_eq!(overview.visible()[0].status, AppointmentStatus::Unassigned);

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('a'));
        assert_eq!(
            runtime.record(&id).map(|record| record.status),
            Some(AppointmentStatus::Assigned)
        );
        assert_eq!(overview.visible()[0].status, AppointmentStatus::Assigned);

        for _ in 0..5 {
            press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('a'));
        }
        assert_eq!(overview.visible()[0].status, AppointmentStatus::Completed);
        assert_eq!(runtime.write_count, 3);
        assert!(status_text(&overview, &view_data).contains("bereits erledigt"));
        Ok(())
    }

    #[test]
    fn vehicle_key_cycles_through_fleet_and_back_to_none() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(1)?;
        let id = cursor_id(&overview, &view_data);
        let mut seen = Vec::new();
        for _ in 0..3 {
            press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('w'));
            seen.push(
                runtime
                    .record(&id)
                    .and_then(|record| record.vehicle_id.clone()),
            );
        }
        assert_eq!(
            seen,
            vec![Some(VehicleId::new("V001")), Some(VehicleId::new("V002")), None]
        );
        assert_eq!(overview.visible()[0].status, AppointmentStatus::Unassigned);
        Ok(())
    }

    #[test]
    fn next_vehicle_restarts_for_unknown_assignment() {
        let fleet = vec![vehicle("V001"), vehicle("V002")];
        assert_eq!(
            next_vehicle(&fleet, Some(&VehicleId::new("V404"))),
            Some(VehicleId::new("V001"))
        );
        assert_eq!(next_vehicle(&[], None), None);
    }

    #[test]
    fn delete_requires_confirmation() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(2)?;
        let id = cursor_id(&overview, &view_data);
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Enter);

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('d'));
        assert_eq!(view_data.input, InputMode::ConfirmDelete(id.clone()));
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('n'));
        assert_eq!(view_data.input, InputMode::Nav);
        assert_eq!(runtime.records.len(), 2);

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('d'));
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('y'));
        assert_eq!(runtime.records.len(), 1);
        assert!(runtime.record(&id).is_none());
        assert!(!overview.state().detail_open);
        assert!(overview.detail().is_none());
        assert!(status_text(&overview, &view_data).contains("Termin gelöscht"));
        Ok(())
    }

    #[test]
    fn runtime_failures_land_on_status_line() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(1)?;
        runtime.fail_writes = true;
        let quit = press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('a'));
        assert!(!quit);
        let status = status_text(&overview, &view_data);
        assert!(status.contains("Status ändern fehlgeschlagen"));
        assert!(status.contains("database is locked"));
        assert_eq!(overview.visible()[0].status, AppointmentStatus::Unassigned);
        Ok(())
    }

    #[test]
    fn status_clear_only_honours_latest_token() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(1)?;
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('s'));
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('s'));
        let (tx, rx) = mpsc::channel();

        tx.send(InternalEvent::ClearStatus { token: 1 })?;
        process_internal_events(&mut view_data, &rx);
        assert!(view_data.status_line.is_some());

        tx.send(InternalEvent::ClearStatus {
            token: view_data.status_token,
        })?;
        process_internal_events(&mut view_data, &rx);
        assert!(view_data.status_line.is_none());
        Ok(())
    }

    #[test]
    fn calendar_groups_rides_into_hour_rows() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(3)?;
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('t'));
        let text = calendar_text(&overview, &view_data);
        assert!(text.starts_with("── 15.06.2026 ──"));
        assert!(text.contains("06:00 │"));
        assert!(text.contains("19:00 │"));
        assert!(!text.contains("20:00 │"));
        for record in overview.visible() {
            assert!(text.contains(&record.title()), "missing {}", record.title());
        }
        assert_eq!(text.matches(super::CURSOR_MARK).count(), 1);
        Ok(())
    }

    #[test]
    fn calendar_day_blocks_follow_cursor_order_across_offsets() -> Result<()> {
        let mut faker = RideFaker::new(8);
        let mut late_utc = faker.appointment("apt-000001", fixture_day());
        late_utc.time_window =
            TimeWindow::starting_at(datetime!(2026-06-15 23:30 UTC), Duration::minutes(30))?;
        let mut early_local = faker.appointment("apt-000002", fixture_day());
        early_local.time_window =
            TimeWindow::starting_at(datetime!(2026-06-16 00:30 +02:00), Duration::minutes(30))?;

        let mut runtime = TestRuntime {
            records: vec![late_utc, early_local],
            ..TestRuntime::default()
        };
        let mut overview = Overview::new(Vec::new(), OverviewState::default());
        let mut view_data = ViewData::new(CalendarBounds::default(), fixture_day());
        refresh_view_data(&mut overview, &mut runtime, &mut view_data)?;
        assert_eq!(overview.visible()[0].id.as_str(), "apt-000002");

        let text = calendar_text(&overview, &view_data);
        let first_block = text.find("── 16.06.2026 ──");
        let second_block = text.find("── 15.06.2026 ──");
        assert!(first_block.is_some() && second_block.is_some());
        assert!(first_block < second_block, "{text}");

        let cursor_line = text
            .lines()
            .position(|line| line.contains(super::CURSOR_MARK));
        let second_header = text.lines().position(|line| line.contains("15.06.2026"));
        assert!(cursor_line < second_header);
        Ok(())
    }

    #[test]
    fn detail_text_lists_fields() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(1)?;
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Enter);
        let detail = overview.detail().expect("detail should be open");
        let text = detail_text(&detail);
        assert!(text.starts_with("Details zum Termin von "));
        assert!(text.contains("Abholadresse"));
        assert!(text.contains("Unverteilt"));
        assert!(!text.contains("Fahrzeug  "));
        Ok(())
    }

    #[test]
    fn rendered_frame_shows_empty_list_and_help() -> Result<()> {
        let (mut overview, mut runtime, mut view_data) = setup(0)?;
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('v'));
        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Char('?'));

        let mut terminal = Terminal::new(TestBackend::new(120, 40))?;
        terminal.draw(|frame| render(frame, &overview, &view_data))?;
        let screen = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(screen.contains("Keine Termine gefunden"));
        assert!(screen.contains("Hilfe"));
        assert!(screen.contains("0 von 0 Terminen"));

        press(&mut overview, &mut runtime, &mut view_data, KeyCode::Esc);
        assert!(!view_data.help_visible);
        Ok(())
    }
}
