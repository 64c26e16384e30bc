// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Deserialize;
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{
    Appointment, AppointmentId, AppointmentStatus, PatientContact, TimeWindow, TransportType,
    VehicleId,
};

/// Why a loosely-typed appointment document was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    MissingField {
        id: String,
        field: &'static str,
    },
    InvalidTimestamp {
        id: String,
        field: &'static str,
        value: String,
    },
    InvertedWindow {
        id: String,
    },
    UnknownStatus {
        id: String,
        value: String,
    },
    UnknownTransportType {
        id: String,
        value: String,
    },
}

impl RecordError {
    pub fn record_id(&self) -> &str {
        match self {
            Self::MissingField { id, .. }
            | Self::InvalidTimestamp { id, .. }
            | Self::InvertedWindow { id }
            | Self::UnknownStatus { id, .. }
            | Self::UnknownTransportType { id, .. } => id,
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { id, field } => {
                write!(f, "appointment {id:?}: {field} is missing or blank")
            }
            Self::InvalidTimestamp { id, field, value } => write!(
                f,
                "appointment {id:?}: {field} {value:?} is not an RFC 3339 timestamp"
            ),
            Self::InvertedWindow { id } => {
                write!(f, "appointment {id:?}: end must be after start")
            }
            Self::UnknownStatus { id, value } => write!(
                f,
                "appointment {id:?}: unknown status {value:?}; expected one of unassigned, assigned, in-progress, completed"
            ),
            Self::UnknownTransportType { id, value } => write!(
                f,
                "appointment {id:?}: unknown transport type {value:?}; expected wheelchair or carrying-chair"
            ),
        }
    }
}

impl std::error::Error for RecordError {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDocument {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Wire shape of an appointment as exported by dispatch tooling. Every field
/// is optional here; [`AppointmentDocument::into_appointment`] decides what
/// a valid record is. Unknown keys such as `title` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDocument {
    pub id: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub status: Option<String>,
    pub patient_data: Option<PatientDocument>,
    pub pickup_address: Option<String>,
    pub destination_address: Option<String>,
    pub transport_type: Option<String>,
    pub vehicle_id: Option<String>,
}

impl AppointmentDocument {
    pub fn into_appointment(self) -> Result<Appointment, RecordError> {
        let id = required(self.id, "<unknown>", "id")?;
        let start = timestamp(self.start, &id, "start")?;
        let end = timestamp(self.end, &id, "end")?;
        let time_window =
            TimeWindow::new(start, end).map_err(|_| RecordError::InvertedWindow { id: id.clone() })?;

        let raw_status = required(self.status, &id, "status")?;
        let status = AppointmentStatus::parse(&raw_status).map_err(|error| {
            RecordError::UnknownStatus {
                id: id.clone(),
                value: error.value().to_owned(),
            }
        })?;

        let raw_transport = required(self.transport_type, &id, "transportType")?;
        let transport_type = TransportType::parse(&raw_transport).ok_or_else(|| {
            RecordError::UnknownTransportType {
                id: id.clone(),
                value: raw_transport.clone(),
            }
        })?;

        let patient = self.patient_data.unwrap_or_default();
        let patient = PatientContact {
            first_name: required(patient.first_name, &id, "patientData.firstName")?,
            last_name: required(patient.last_name, &id, "patientData.lastName")?,
            phone_number: required(patient.phone_number, &id, "patientData.phoneNumber")?,
        };

        let pickup_address = required(self.pickup_address, &id, "pickupAddress")?;
        let destination_address = required(self.destination_address, &id, "destinationAddress")?;
        let vehicle_id = self
            .vehicle_id
            .filter(|value| !value.trim().is_empty())
            .map(VehicleId::new);

        Ok(Appointment {
            id: AppointmentId::new(id),
            time_window,
            status,
            patient,
            pickup_address,
            destination_address,
            transport_type,
            vehicle_id,
        })
    }
}

fn required(value: Option<String>, id: &str, field: &'static str) -> Result<String, RecordError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RecordError::MissingField {
            id: id.to_owned(),
            field,
        }),
    }
}

fn timestamp(
    value: Option<String>,
    id: &str,
    field: &'static str,
) -> Result<OffsetDateTime, RecordError> {
    let raw = required(value, id, field)?;
    OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(|_| RecordError::InvalidTimestamp {
        id: id.to_owned(),
        field,
        value: raw,
    })
}

#[cfg(test)]
mod tests {
    use super::{AppointmentDocument, PatientDocument, RecordError};
    use crate::{AppointmentStatus, TransportType};
    use time::macros::datetime;

    fn document() -> AppointmentDocument {
        AppointmentDocument {
            id: Some("2".to_owned()),
            start: Some("2026-06-15T11:00:00+02:00".to_owned()),
            end: Some("2026-06-15T11:45:00+02:00".to_owned()),
            status: Some("assigned".to_owned()),
            patient_data: Some(PatientDocument {
                first_name: Some("Maria".to_owned()),
                last_name: Some("Schmidt".to_owned()),
                phone_number: Some("+49987654321".to_owned()),
            }),
            pickup_address: Some("Berliner Straße 42, Berlin".to_owned()),
            destination_address: Some("Praxis Dr. Weber, Friedrichstraße".to_owned()),
            transport_type: Some("carrying-chair".to_owned()),
            vehicle_id: Some("V001".to_owned()),
        }
    }

    #[test]
    fn complete_document_becomes_appointment() -> anyhow::Result<()> {
        let record = document().into_appointment()?;
        assert_eq!(record.id.as_str(), "2");
        assert_eq!(record.start(), datetime!(2026-06-15 11:00 +02:00));
        assert_eq!(record.status, AppointmentStatus::Assigned);
        assert_eq!(record.transport_type, TransportType::CarryingChair);
        assert_eq!(record.title(), "Schmidt, Maria");
        assert_eq!(record.vehicle_id.as_ref().map(|id| id.as_str()), Some("V001"));
        Ok(())
    }

    #[test]
    fn unknown_status_is_rejected_not_defaulted() {
        let mut doc = document();
        doc.status = Some("cancelled".to_owned());
        let error = doc.into_appointment().expect_err("unknown status must fail");
        assert_eq!(
            error,
            RecordError::UnknownStatus {
                id: "2".to_owned(),
                value: "cancelled".to_owned(),
            }
        );
        assert!(error.to_string().contains("in-progress"));
    }

    #[test]
    fn blank_fields_are_missing() {
        let mut doc = document();
        doc.pickup_address = Some("  ".to_owned());
        let error = doc.into_appointment().expect_err("blank pickup must fail");
        assert!(error.to_string().contains("pickupAddress"));

        let mut doc = document();
        doc.patient_data = None;
        let error = doc.into_appointment().expect_err("missing patient must fail");
        assert!(error.to_string().contains("patientData.firstName"));
    }

    #[test]
    fn bad_timestamps_and_inverted_windows_fail() {
        let mut doc = document();
        doc.start = Some("15.06.2026 11:00".to_owned());
        let error = doc.into_appointment().expect_err("bad timestamp must fail");
        assert!(matches!(error, RecordError::InvalidTimestamp { field: "start", .. }));

        let mut doc = document();
        doc.end = doc.start.clone();
        let error = doc.into_appointment().expect_err("empty window must fail");
        assert_eq!(error, RecordError::InvertedWindow { id: "2".to_owned() });
        assert_eq!(error.record_id(), "2");
    }

    #[test]
    fn unknown_transport_and_blank_vehicle() -> anyhow::Result<()> {
        let mut doc = document();
        doc.transport_type = Some("stretcher".to_owned());
        assert!(matches!(
            doc.into_appointment(),
            Err(RecordError::UnknownTransportType { .. })
        ));

        let mut doc = document();
        doc.vehicle_id = Some(String::new());
        assert!(doc.into_appointment()?.vehicle_id.is_none());
        Ok(())
    }
}
