// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Duration, OffsetDateTime};

use crate::ids::*;

/// A status value outside the closed [`AppointmentStatus`] enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus {
    value: String,
}

impl InvalidStatus {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown appointment status {:?}; expected one of unassigned, assigned, in-progress, completed",
            self.value
        )
    }
}

impl std::error::Error for InvalidStatus {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Unassigned,
    Assigned,
    InProgress,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [Self; 4] = [
        Self::Unassigned,
        Self::Assigned,
        Self::InProgress,
        Self::Completed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Assigned => "assigned",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, InvalidStatus> {
        match value {
            "unassigned" => Ok(Self::Unassigned),
            "assigned" => Ok(Self::Assigned),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(InvalidStatus::new(other)),
        }
    }

    /// Next step of the advisory lifecycle. Transitions are not enforced
    /// anywhere; this only drives the "advance" affordance.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Unassigned => Some(Self::Assigned),
            Self::Assigned => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportType {
    Wheelchair,
    CarryingChair,
}

impl TransportType {
    pub const ALL: [Self; 2] = [Self::Wheelchair, Self::CarryingChair];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wheelchair => "wheelchair",
            Self::CarryingChair => "carrying-chair",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wheelchair" => Some(Self::Wheelchair),
            "carrying-chair" => Some(Self::CarryingChair),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Wheelchair => "Rollstuhl",
            Self::CarryingChair => "Tragestuhl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    Calendar,
    List,
}

impl ViewMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::List => "list",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "calendar" => Some(Self::Calendar),
            "list" => Some(Self::List),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Calendar => "Kalender",
            Self::List => "Liste",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Calendar => Self::List,
            Self::List => Self::Calendar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContact {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl PatientContact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// "Last, First", used as the calendar event title.
    pub fn sort_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct TimeWindowParts {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

/// Start/end of a ride. Always `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimeWindowParts", into = "TimeWindowParts")]
pub struct TimeWindow {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl TimeWindow {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self> {
        if end <= start {
            bail!("appointment end must be after its start -- adjust the time window and retry");
        }
        Ok(Self { start, end })
    }

    pub fn starting_at(start: OffsetDateTime, length: Duration) -> Result<Self> {
        Self::new(start, start + length)
    }

    pub const fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub const fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Calendar day of the start, in the window's own offset.
    pub fn day(&self) -> Date {
        self.start.date()
    }
}

impl TryFrom<TimeWindowParts> for TimeWindow {
    type Error = anyhow::Error;

    fn try_from(parts: TimeWindowParts) -> Result<Self> {
        Self::new(parts.start, parts.end)
    }
}

impl From<TimeWindow> for TimeWindowParts {
    fn from(window: TimeWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub time_window: TimeWindow,
    pub status: AppointmentStatus,
    pub patient: PatientContact,
    pub pickup_address: String,
    pub destination_address: String,
    pub transport_type: TransportType,
    pub vehicle_id: Option<VehicleId>,
}

impl Appointment {
    pub fn start(&self) -> OffsetDateTime {
        self.time_window.start()
    }

    pub fn end(&self) -> OffsetDateTime {
        self.time_window.end()
    }

    pub fn title(&self) -> String {
        self.patient.sort_name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub label: String,
    pub license_plate: String,
    pub kind: String,
    pub capacity: Option<i32>,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub birthdate: Option<Date>,
    pub insurance_number: String,
    pub medical_notes: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Patient {
    pub fn contact(&self) -> PatientContact {
        PatientContact {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: self.phone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppointmentStatus, PatientContact, TimeWindow, TransportType};
    use time::Duration;
    use time::macros::datetime;

    #[test]
    fn status_parse_rejects_unknown_values() {
        let error = AppointmentStatus::parse("cancelled").expect_err("unknown status must fail");
        assert_eq!(error.value(), "cancelled");
        assert!(error.to_string().contains("in-progress"));
        assert_eq!(
            AppointmentStatus::parse("in-progress"),
            Ok(AppointmentStatus::InProgress)
        );
    }

    #[test]
    fn status_parse_is_case_sensitive() {
        assert!(AppointmentStatus::parse("Assigned").is_err());
        assert!(AppointmentStatus::parse("in_progress").is_err());
    }

    #[test]
    fn lifecycle_advances_and_stops_at_completed() {
        let mut status = AppointmentStatus::Unassigned;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            status = next;
            seen.push(status);
        }
        assert_eq!(seen, AppointmentStatus::ALL.to_vec());
    }

    #[test]
    fn time_window_requires_end_after_start() {
        let start = datetime!(2026-03-02 10:00 +01:00);
        assert!(TimeWindow::new(start, start).is_err());
        assert!(TimeWindow::new(start, start - Duration::minutes(5)).is_err());

        let window = TimeWindow::starting_at(start, Duration::minutes(45)).expect("valid window");
        assert_eq!(window.duration(), Duration::minutes(45));
        assert_eq!(window.day(), start.date());
    }

    #[test]
    fn time_window_day_uses_own_offset() {
        let start = datetime!(2026-03-02 23:30 -02:00);
        let window = TimeWindow::starting_at(start, Duration::minutes(30)).expect("valid window");
        assert_eq!(window.day(), start.date());
        assert_ne!(window.day(), start.to_offset(time::UtcOffset::UTC).date());
    }

    #[test]
    fn contact_names_format_for_title_and_search() {
        let contact = PatientContact {
            first_name: "Hans".to_owned(),
            last_name: "Müller".to_owned(),
            phone_number: "+49123456789".to_owned(),
        };
        assert_eq!(contact.full_name(), "Hans Müller");
        assert_eq!(contact.sort_name(), "Müller, Hans");
    }

    #[test]
    fn transport_type_labels_are_german() {
        assert_eq!(TransportType::Wheelchair.label(), "Rollstuhl");
        assert_eq!(
            TransportType::parse("carrying-chair"),
            Some(TransportType::CarryingChair)
        );
        assert_eq!(TransportType::parse("stretcher"), None);
    }
}
