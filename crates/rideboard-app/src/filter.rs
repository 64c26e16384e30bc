// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;

use crate::{Appointment, AppointmentStatus, badge_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AppointmentStatus),
}

impl StatusFilter {
    pub fn matches(self, status: AppointmentStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(status) => status.as_str(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if value == "all" {
            return Some(Self::All);
        }
        AppointmentStatus::parse(value).ok().map(Self::Only)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "Alle Status",
            Self::Only(status) => badge_for(status).label,
        }
    }

    /// all -> unassigned -> assigned -> in-progress -> completed -> all
    pub fn cycled(self) -> Self {
        match self {
            Self::All => Self::Only(AppointmentStatus::ALL[0]),
            Self::Only(status) => status.next().map_or(Self::All, Self::Only),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    pub status: StatusFilter,
    pub date: Option<Date>,
    pub query: String,
}

impl FilterSpec {
    pub fn is_noop(&self) -> bool {
        self.status == StatusFilter::All && self.date.is_none() && self.query.trim().is_empty()
    }

    pub fn matches(&self, record: &Appointment) -> bool {
        self.matches_with_needle(record, self.needle().as_deref())
    }

    fn needle(&self) -> Option<String> {
        if self.query.trim().is_empty() {
            None
        } else {
            Some(self.query.to_lowercase())
        }
    }

    fn matches_with_needle(&self, record: &Appointment, needle: Option<&str>) -> bool {
        if !self.status.matches(record.status) {
            return false;
        }

        if let Some(date) = self.date
            && record.time_window.day() != date
        {
            return false;
        }

        let Some(needle) = needle else {
            return true;
        };
        [
            record.patient.full_name(),
            record.pickup_address.clone(),
            record.destination_address.clone(),
        ]
        .iter()
        .any(|haystack| haystack.to_lowercase().contains(needle))
    }
}

/// Returns the records matching every predicate of `spec`, ordered by start
/// time. Records sharing a start keep their input order.
pub fn filter_appointments(records: &[Appointment], spec: &FilterSpec) -> Vec<Appointment> {
    let needle = spec.needle();
    let mut matched = records
        .iter()
        .filter(|record| spec.matches_with_needle(record, needle.as_deref()))
        .cloned()
        .collect::<Vec<_>>();
    matched.sort_by_key(Appointment::start);
    matched
}
