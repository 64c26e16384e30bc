// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Appointment, Badge, badge_for, format_window};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub title: &'static str,
    pub description: String,
    pub badge: Badge,
    pub fields: Vec<DetailField>,
}

impl DetailView {
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.as_str())
    }

    pub fn lines(&self) -> Vec<String> {
        let width = self
            .fields
            .iter()
            .map(|field| field.label.chars().count())
            .max()
            .unwrap_or(0);
        self.fields
            .iter()
            .map(|field| {
                let pad = width - field.label.chars().count();
                format!("{}{}  {}", " ".repeat(pad), field.label, field.value)
            })
            .collect()
    }
}

/// Read-only view of one appointment. A missing selection renders nothing.
pub fn present(record: Option<&Appointment>) -> Option<DetailView> {
    let record = record?;
    let badge = badge_for(record.status);

    let mut fields = vec![
        DetailField {
            label: "Status",
            value: badge.label.to_owned(),
        },
        DetailField {
            label: "Patient",
            value: record.patient.full_name(),
        },
        DetailField {
            label: "Telefon",
            value: record.patient.phone_number.clone(),
        },
        DetailField {
            label: "Abholadresse",
            value: record.pickup_address.clone(),
        },
        DetailField {
            label: "Zieladresse",
            value: record.destination_address.clone(),
        },
        DetailField {
            label: "Beförderungsart",
            value: record.transport_type.label().to_owned(),
        },
        DetailField {
            label: "Termin",
            value: format_window(&record.time_window),
        },
    ];
    if let Some(vehicle_id) = &record.vehicle_id {
        fields.push(DetailField {
            label: "Fahrzeug",
            value: vehicle_id.to_string(),
        });
    }

    Some(DetailView {
        title: "Termindetails",
        description: format!("Details zum Termin von {}", record.patient.full_name()),
        badge,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::present;
    use crate::{
        Appointment, AppointmentId, AppointmentStatus, PatientContact, TimeWindow, TransportType,
        VehicleId,
    };
    use time::macros::datetime;

    fn appointment(vehicle: Option<&str>) -> Appointment {
        Appointment {
            id: AppointmentId::new("2"),
            time_window: TimeWindow::new(
                datetime!(2026-06-15 11:00 +02:00),
                datetime!(2026-06-15 11:45 +02:00),
            )
            .expect("valid window"),
            status: AppointmentStatus::Assigned,
            patient: PatientContact {
                first_name: "Maria".to_owned(),
                last_name: "Schmidt".to_owned(),
                phone_number: "+49987654321".to_owned(),
            },
            pickup_address: "Berliner Straße 42, Berlin".to_owned(),
            destination_address: "Praxis Dr. Weber, Friedrichstraße".to_owned(),
            transport_type: TransportType::CarryingChair,
            vehicle_id: vehicle.map(VehicleId::new),
        }
    }

    #[test]
    fn no_selection_renders_nothing() {
        assert!(present(None).is_none());
    }

    #[test]
    fn renders_every_field_read_only() {
        let record = appointment(Some("V001"));
        let view = present(Some(&record)).expect("detail view");
        assert_eq!(view.description, "Details zum Termin von Maria Schmidt");
        assert_eq!(view.field("Status"), Some("Zugeteilt"));
        assert_eq!(view.field("Telefon"), Some("+49987654321"));
        assert_eq!(view.field("Beförderungsart"), Some("Tragestuhl"));
        assert_eq!(view.field("Termin"), Some("15.06.2026 11:00 - 11:45"));
        assert_eq!(view.field("Fahrzeug"), Some("V001"));
    }

    #[test]
    fn vehicle_line_only_when_assigned() {
        let record = appointment(None);
        let view = present(Some(&record)).expect("detail view");
        assert_eq!(view.field("Fahrzeug"), None);
        assert_eq!(view.fields.len(), 7);
    }

    #[test]
    fn lines_right_align_labels() {
        let record = appointment(None);
        let view = present(Some(&record)).expect("detail view");
        let lines = view.lines();
        assert_eq!(lines[0], "         Status  Zugeteilt");
        assert!(lines.iter().any(|line| line == "Beförderungsart  Tragestuhl"));
    }
}
