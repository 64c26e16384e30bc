// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::Date;

use crate::{
    Appointment, AppointmentStatus, PatientContact, PatientId, TimeWindow, TransportType,
    VehicleId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentFormInput {
    pub time_window: TimeWindow,
    pub status: AppointmentStatus,
    pub patient: PatientContact,
    pub patient_id: Option<PatientId>,
    pub pickup_address: String,
    pub destination_address: String,
    pub transport_type: TransportType,
    pub vehicle_id: Option<VehicleId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleFormInput {
    pub label: String,
    pub license_plate: String,
    pub kind: String,
    pub capacity: Option<i32>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFormInput {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub birthdate: Option<Date>,
    pub insurance_number: String,
    pub medical_notes: String,
}

impl AppointmentFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.patient.first_name.trim().is_empty() || self.patient.last_name.trim().is_empty() {
            bail!("patient first and last name are required -- enter both names and retry");
        }
        if self.patient.phone_number.trim().is_empty() {
            bail!("patient phone number is required -- enter a phone number and retry");
        }
        if self.pickup_address.trim().is_empty() {
            bail!("pickup address is required -- enter a pickup address and retry");
        }
        if self.destination_address.trim().is_empty() {
            bail!("destination address is required -- enter a destination and retry");
        }
        Ok(())
    }
}

impl From<&Appointment> for AppointmentFormInput {
    fn from(record: &Appointment) -> Self {
        Self {
            time_window: record.time_window,
            status: record.status,
            patient: record.patient.clone(),
            patient_id: None,
            pickup_address: record.pickup_address.clone(),
            destination_address: record.destination_address.clone(),
            transport_type: record.transport_type,
            vehicle_id: record.vehicle_id.clone(),
        }
    }
}

impl VehicleFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            bail!("vehicle label is required -- enter a call sign such as V001 and retry");
        }
        if let Some(capacity) = self.capacity
            && capacity <= 0
        {
            bail!("vehicle capacity must be positive, got {capacity}");
        }
        Ok(())
    }
}

impl PatientFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            bail!("patient first and last name are required -- enter both names and retry");
        }
        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            bail!("patient email {email:?} is not an address -- fix or clear it and retry");
        }
        Ok(())
    }
}
