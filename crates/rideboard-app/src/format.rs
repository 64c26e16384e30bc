// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::TimeWindow;

pub fn format_clock(value: OffsetDateTime) -> String {
    value
        .format(&format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| "--:--".to_owned())
}

pub fn format_day(value: Date) -> String {
    value
        .format(&format_description!("[day].[month].[year]"))
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_iso_day(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

pub fn parse_iso_day(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), &format_description!("[year]-[month]-[day]")).ok()
}

/// `DD.MM.YYYY HH:MM - HH:MM`
pub fn format_window(window: &TimeWindow) -> String {
    format!(
        "{} {} - {}",
        format_day(window.day()),
        format_clock(window.start()),
        format_clock(window.end())
    )
}
