// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use rideboard_app::{
    Appointment, AppointmentFormInput, AppointmentId, AppointmentStatus, PatientContact,
    PatientFormInput, TimeWindow, TransportType, VehicleFormInput,
};
use std::path::PathBuf;
use time::{Date, Duration, Month, UtcOffset};

const FIRST_NAMES: [&str; 16] = [
    "Hans", "Maria", "Klaus", "Anna", "Jürgen", "Ursula", "Wolfgang", "Monika", "Dieter", "Renate",
    "Helga", "Günter", "Sabine", "Peter", "Ingrid", "Jonas",
];
const LAST_NAMES: [&str; 18] = [
    "Müller",
    "Schmidt",
    "Weber",
    "Fischer",
    "Meyer",
    "Wagner",
    "Becker",
    "Schulz",
    "Hoffmann",
    "Schäfer",
    "Koch",
    "Bauer",
    "Richter",
    "Klein",
    "Wolf",
    "Schröder",
    "Neumann",
    "Schwarz",
];

const STREET_NAMES: [&str; 14] = [
    "Hauptstraße",
    "Berliner Straße",
    "Kurfürstendamm",
    "Friedrichstraße",
    "Alexanderplatz",
    "Schönhauser Allee",
    "Karl-Marx-Allee",
    "Sonnenallee",
    "Torstraße",
    "Danziger Straße",
    "Kantstraße",
    "Bergmannstraße",
    "Müllerstraße",
    "Greifswalder Straße",
];
const DISTRICTS: [&str; 8] = [
    "Berlin",
    "Berlin-Mitte",
    "Berlin-Pankow",
    "Berlin-Neukölln",
    "Berlin-Spandau",
    "Berlin-Charlottenburg",
    "Berlin-Lichtenberg",
    "Berlin-Tempelhof",
];
const DESTINATIONS: [&str; 10] = [
    "Klinikum Berlin, Charité",
    "Charité Campus Virchow",
    "Vivantes Klinikum Neukölln",
    "Vivantes Auguste-Viktoria-Klinikum",
    "Praxis Dr. Weber, Friedrichstraße",
    "Hausarztpraxis Dr. Schulz",
    "Dialysezentrum Moabit",
    "Helios Klinikum Buch",
    "St. Hedwig-Krankenhaus",
    "Reha-Zentrum Westend",
];

const VEHICLE_KINDS: [&str; 3] = ["Rollstuhl", "Tragestuhl", "KTW"];
const RIDE_MINUTES: [i64; 3] = [30, 45, 60];
const QUARTER_HOURS: [u8; 4] = [0, 15, 30, 45];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Reproducible schedule fixtures. The same seed always yields the same
/// sequence of patients, vehicles and rides.
#[derive(Debug, Clone)]
pub struct RideFaker {
    rng: DeterministicRng,
    vehicle_count: usize,
}

impl RideFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            vehicle_count: 0,
        }
    }

    pub fn patient_contact(&mut self) -> PatientContact {
        PatientContact {
            first_name: self.pick(&FIRST_NAMES).to_owned(),
            last_name: self.pick(&LAST_NAMES).to_owned(),
            phone_number: self.phone_number(),
        }
    }

    pub fn patient_input(&mut self) -> PatientFormInput {
        let contact = self.patient_contact();
        let email = format!(
            "{}.{}@example.de",
            ascii_slug(&contact.first_name),
            ascii_slug(&contact.last_name)
        );
        let birth_year = 1930 + self.rng.int_n(70) as i32;
        let birthdate = Date::from_calendar_date(birth_year, Month::January, 1)
            .ok()
            .map(|date| date + Duration::days(self.rng.int_n(365) as i64));
        PatientFormInput {
            first_name: contact.first_name,
            last_name: contact.last_name,
            phone: contact.phone_number,
            email,
            address: self.street_address(),
            birthdate,
            insurance_number: format!(
                "{}{:09}",
                (b'A' + self.rng.int_n(26) as u8) as char,
                self.rng.next_u64() % 1_000_000_000
            ),
            medical_notes: String::new(),
        }
    }

    pub fn vehicle_input(&mut self) -> VehicleFormInput {
        self.vehicle_count += 1;
        let kind = self.pick(&VEHICLE_KINDS);
        VehicleFormInput {
            label: format!("{kind}wagen {}", self.vehicle_count),
            license_plate: format!("B-RB {}", 100 + self.rng.int_n(900)),
            kind: kind.to_owned(),
            capacity: Some(1 + self.rng.int_n(3) as i32),
            active: true,
        }
    }

    /// An unassigned ride on `day`, starting on a quarter hour between
    /// 07:00 and 17:45 in [`fixture_offset`].
    pub fn appointment_input(&mut self, day: Date) -> AppointmentFormInput {
        AppointmentFormInput {
            time_window: self.time_window(day),
            status: AppointmentStatus::Unassigned,
            patient: self.patient_contact(),
            patient_id: None,
            pickup_address: self.street_address(),
            destination_address: self.pick(&DESTINATIONS).to_owned(),
            transport_type: if self.rng.bool() {
                TransportType::Wheelchair
            } else {
                TransportType::CarryingChair
            },
            vehicle_id: None,
        }
    }

    pub fn appointment(&mut self, id: &str, day: Date) -> Appointment {
        let input = self.appointment_input(day);
        Appointment {
            id: AppointmentId::new(id),
            time_window: input.time_window,
            status: input.status,
            patient: input.patient,
            pickup_address: input.pickup_address,
            destination_address: input.destination_address,
            transport_type: input.transport_type,
            vehicle_id: input.vehicle_id,
        }
    }

    /// `count` rides on `day` with ids `apt-000001..`, cycling through every
    /// status so each badge shows up.
    pub fn schedule(&mut self, day: Date, count: usize) -> Vec<Appointment> {
        (0..count)
            .map(|index| {
                let mut record = self.appointment(&format!("apt-{:06}", index + 1), day);
                record.status = AppointmentStatus::ALL[index % AppointmentStatus::ALL.len()];
                record
            })
            .collect()
    }

    fn time_window(&mut self, day: Date) -> TimeWindow {
        let hour = 7 + self.rng.int_n(11) as u8;
        let minute = QUARTER_HOURS[self.rng.int_n(QUARTER_HOURS.len())];
        let length = RIDE_MINUTES[self.rng.int_n(RIDE_MINUTES.len())];
        let start = day
            .with_hms(hour, minute, 0)
            .expect("valid quarter hour")
            .assume_offset(fixture_offset());
        TimeWindow::starting_at(start, Duration::minutes(length)).expect("positive ride length")
    }

    fn street_address(&mut self) -> String {
        format!(
            "{} {}, {}",
            self.pick(&STREET_NAMES),
            1 + self.rng.int_n(180),
            self.pick(&DISTRICTS)
        )
    }

    fn phone_number(&mut self) -> String {
        format!("+4930{:07}", self.rng.next_u64() % 10_000_000)
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("rideboard.db");
    Ok((dir, db_path))
}

pub fn fixture_day() -> Date {
    Date::from_calendar_date(2026, Month::June, 15).expect("valid fixture day")
}

/// Central European Summer Time.
pub fn fixture_offset() -> UtcOffset {
    UtcOffset::from_hms(2, 0, 0).expect("valid fixture offset")
}

fn ascii_slug(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            'ä' | 'Ä' => "ae".to_owned(),
            'ö' | 'Ö' => "oe".to_owned(),
            'ü' | 'Ü' => "ue".to_owned(),
            'ß' => "ss".to_owned(),
            other => other.to_ascii_lowercase().to_string(),
        })
        .collect()
}
