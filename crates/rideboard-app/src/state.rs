// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::{Date, Duration, OffsetDateTime};

use crate::{
    Appointment, AppointmentId, AppointmentStatus, Badge, DetailView, FilterSpec, StatusFilter,
    ViewMode, badge_for, filter_appointments, format_clock, present,
};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewState {
    pub view_mode: ViewMode,
    pub selected_date: Option<Date>,
    pub filter: FilterSpec,
    pub selected_appointment: Option<AppointmentId>,
    pub detail_open: bool,
}

impl Default for OverviewState {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::Calendar,
            selected_date: None,
            filter: FilterSpec::default(),
            selected_appointment: None,
            detail_open: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverviewCommand {
    SetViewMode(ViewMode),
    ToggleViewMode,
    /// Also filters to that day and returns to the calendar.
    SetSelectedDate(Option<Date>),
    /// Starts from `today` while no date is selected. A shift past the
    /// representable calendar is a no-op.
    ShiftSelectedDate { days: i64, today: Date },
    SetStatusFilter(StatusFilter),
    CycleStatusFilter,
    SetQuery(String),
    SelectAppointment(AppointmentId),
    CloseDetail,
    ReopenDetail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverviewEvent {
    ViewModeChanged(ViewMode),
    SelectedDateChanged(Option<Date>),
    StatusFilterChanged(StatusFilter),
    QueryChanged(String),
    AppointmentSelected(AppointmentId),
    DetailClosed,
    DetailReopened(AppointmentId),
}

impl OverviewEvent {
    pub fn changes_visible_set(&self) -> bool {
        matches!(
            self,
            Self::SelectedDateChanged(_) | Self::StatusFilterChanged(_) | Self::QueryChanged(_)
        )
    }
}

impl OverviewState {
    pub fn for_day(day: Date) -> Self {
        Self {
            selected_date: Some(day),
            filter: FilterSpec {
                date: Some(day),
                ..FilterSpec::default()
            },
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, command: OverviewCommand) -> Vec<OverviewEvent> {
        match command {
            OverviewCommand::SetViewMode(mode) => {
                self.view_mode = mode;
                vec![OverviewEvent::ViewModeChanged(mode)]
            }
            OverviewCommand::ToggleViewMode => {
                self.view_mode = self.view_mode.toggled();
                vec![OverviewEvent::ViewModeChanged(self.view_mode)]
            }
            OverviewCommand::SetSelectedDate(date) => self.select_date(date),
            OverviewCommand::ShiftSelectedDate { days, today } => {
                let current = self.selected_date.unwrap_or(today);
                let shifted = days
                    .checked_mul(SECONDS_PER_DAY)
                    .map(Duration::seconds)
                    .and_then(|offset| current.checked_add(offset));
                match shifted {
                    Some(shifted) => self.select_date(Some(shifted)),
                    None => Vec::new(),
                }
            }
            OverviewCommand::SetStatusFilter(status) => {
                self.filter.status = status;
                vec![OverviewEvent::StatusFilterChanged(status)]
            }
            OverviewCommand::CycleStatusFilter => {
                self.filter.status = self.filter.status.cycled();
                vec![OverviewEvent::StatusFilterChanged(self.filter.status)]
            }
            OverviewCommand::SetQuery(query) => {
                self.filter.query = query.clone();
                vec![OverviewEvent::QueryChanged(query)]
            }
            OverviewCommand::SelectAppointment(id) => {
                self.selected_appointment = Some(id.clone());
                self.detail_open = true;
                vec![OverviewEvent::AppointmentSelected(id)]
            }
            OverviewCommand::CloseDetail => {
                // Selection is kept so the detail can be reopened.
                self.detail_open = false;
                vec![OverviewEvent::DetailClosed]
            }
            OverviewCommand::ReopenDetail => match &self.selected_appointment {
                Some(id) => {
                    self.detail_open = true;
                    vec![OverviewEvent::DetailReopened(id.clone())]
                }
                None => Vec::new(),
            },
        }
    }

    fn select_date(&mut self, date: Option<Date>) -> Vec<OverviewEvent> {
        self.selected_date = date;
        self.filter.date = date;
        self.view_mode = ViewMode::Calendar;
        vec![
            OverviewEvent::SelectedDateChanged(date),
            OverviewEvent::ViewModeChanged(ViewMode::Calendar),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: AppointmentId,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub title: String,
    pub status: AppointmentStatus,
    pub pickup_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub id: AppointmentId,
    pub patient: String,
    pub time: String,
    pub pickup: String,
    pub badge: Badge,
}

/// Owns one record snapshot plus the view state, and keeps the filtered
/// visible set in step with both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    records: Vec<Appointment>,
    state: OverviewState,
    visible: Vec<Appointment>,
}

impl Overview {
    pub fn new(records: Vec<Appointment>, state: OverviewState) -> Self {
        let visible = filter_appointments(&records, &state.filter);
        Self {
            records,
            state,
            visible,
        }
    }

    pub fn state(&self) -> &OverviewState {
        &self.state
    }

    pub fn records(&self) -> &[Appointment] {
        &self.records
    }

    pub fn visible(&self) -> &[Appointment] {
        &self.visible
    }

    pub fn dispatch(&mut self, command: OverviewCommand) -> Vec<OverviewEvent> {
        let events = self.state.dispatch(command);
        self.recompute();
        events
    }

    pub fn replace_records(&mut self, records: Vec<Appointment>) {
        self.records = records;
        self.recompute();
    }

    /// Looks the selection up in the full snapshot, so an open detail stays
    /// readable after a filter change hides its row.
    pub fn selected_record(&self) -> Option<&Appointment> {
        let id = self.state.selected_appointment.as_ref()?;
        self.records.iter().find(|record| &record.id == id)
    }

    pub fn detail(&self) -> Option<DetailView> {
        if !self.state.detail_open {
            return None;
        }
        present(self.selected_record())
    }

    pub fn calendar_events(&self) -> Vec<CalendarEvent> {
        self.visible
            .iter()
            .map(|record| CalendarEvent {
                id: record.id.clone(),
                start: record.start(),
                end: record.end(),
                title: record.title(),
                status: record.status,
                pickup_address: record.pickup_address.clone(),
            })
            .collect()
    }

    pub fn table_rows(&self) -> Vec<TableRow> {
        self.visible
            .iter()
            .map(|record| TableRow {
                id: record.id.clone(),
                patient: record.patient.full_name(),
                time: format_clock(record.start()),
                pickup: record.pickup_address.clone(),
                badge: badge_for(record.status),
            })
            .collect()
    }

    fn recompute(&mut self) {
        self.visible = filter_appointments(&self.records, &self.state.filter);
    }
}
