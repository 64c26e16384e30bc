// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use rideboard_app::{Appointment, AppointmentId, AppointmentStatus, Vehicle, VehicleId};
use rideboard_db::{AppointmentQuery, Store};

pub struct DbRuntime<'a> {
    store: &'a Store,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl rideboard_tui::AppRuntime for DbRuntime<'_> {
    fn load_appointments(&mut self) -> Result<Vec<Appointment>> {
        self.store
            .list_appointments(&AppointmentQuery::default())
            .inspect_err(|error| tracing::warn!("load appointments: {error:#}"))
    }

    fn list_vehicles(&mut self) -> Result<Vec<Vehicle>> {
        self.store
            .list_vehicles(false)
            .inspect_err(|error| tracing::warn!("list vehicles: {error:#}"))
    }

    fn set_status(
        &mut self,
        appointment_id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Result<()> {
        self.store
            .set_appointment_status(appointment_id, status)
            .inspect_err(|error| {
                tracing::warn!(appointment = %appointment_id, "set status: {error:#}");
            })
    }

    fn assign_vehicle(
        &mut self,
        appointment_id: &AppointmentId,
        vehicle_id: Option<&VehicleId>,
    ) -> Result<()> {
        self.store
            .assign_vehicle(appointment_id, vehicle_id)
            .inspect_err(|error| {
                tracing::warn!(appointment = %appointment_id, "assign vehicle: {error:#}");
            })
    }

    fn delete_appointment(&mut self, appointment_id: &AppointmentId) -> Result<()> {
        self.store
            .delete_appointment(appointment_id)
            .inspect_err(|error| {
                tracing::warn!(appointment = %appointment_id, "delete appointment: {error:#}");
            })
    }
}
