// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppointmentStatus, InvalidStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Neutral,
    Info,
    Warning,
    Success,
}

impl BadgeTone {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Success => "success",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub label: &'static str,
    pub tone: BadgeTone,
    pub style_class: &'static str,
}

pub const fn badge_for(status: AppointmentStatus) -> Badge {
    match status {
        AppointmentStatus::Unassigned => Badge {
            label: "Unverteilt",
            tone: BadgeTone::Neutral,
            style_class: "badge-unassigned",
        },
        AppointmentStatus::Assigned => Badge {
            label: "Zugeteilt",
            tone: BadgeTone::Info,
            style_class: "badge-assigned",
        },
        AppointmentStatus::InProgress => Badge {
            label: "In Durchführung",
            tone: BadgeTone::Warning,
            style_class: "badge-in-progress",
        },
        AppointmentStatus::Completed => Badge {
            label: "Erledigt",
            tone: BadgeTone::Success,
            style_class: "badge-completed",
        },
    }
}

/// Resolves a badge for an untyped status string. Unknown values are an
/// upstream data fault and are reported, never mapped to a default badge.
pub fn badge_for_raw(status: &str) -> Result<Badge, InvalidStatus> {
    AppointmentStatus::parse(status).map(badge_for)
}
