// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rideboard_app::{
    Appointment, AppointmentFormInput, AppointmentId, AppointmentStatus, Patient, PatientContact,
    PatientFormInput, PatientId, TimeWindow, TransportType, Vehicle, VehicleFormInput, VehicleId,
};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub const APP_NAME: &str = "rideboard";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("id_sequences", &["entity", "last_value"]),
    (
        "vehicles",
        &[
            "id",
            "label",
            "license_plate",
            "kind",
            "capacity",
            "active",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "patients",
        &[
            "id",
            "first_name",
            "last_name",
            "phone",
            "email",
            "address",
            "birthdate",
            "insurance_number",
            "medical_notes",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "appointments",
        &[
            "id",
            "start_at",
            "end_at",
            "status",
            "patient_id",
            "patient_first_name",
            "patient_last_name",
            "patient_phone",
            "pickup_address",
            "destination_address",
            "transport_type",
            "vehicle_id",
            "created_at",
            "updated_at",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_appointments_start_at",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_appointments_start_at ON appointments (start_at);",
    },
    RequiredIndex {
        name: "idx_appointments_status",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments (status);",
    },
    RequiredIndex {
        name: "idx_appointments_vehicle_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_appointments_vehicle_id ON appointments (vehicle_id);",
    },
    RequiredIndex {
        name: "idx_appointments_patient_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments (patient_id);",
    },
    RequiredIndex {
        name: "idx_vehicles_label",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_vehicles_label ON vehicles (label);",
    },
    RequiredIndex {
        name: "idx_patients_name",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_patients_name ON patients (last_name, first_name);",
    },
];

const APPOINTMENT_COLUMNS: &str = "
  id, start_at, end_at, status,
  patient_first_name, patient_last_name, patient_phone,
  pickup_address, destination_address, transport_type, vehicle_id
";

const VEHICLE_COLUMNS: &str = "
  id, label, license_plate, kind, capacity, active, created_at, updated_at
";

const PATIENT_COLUMNS: &str = "
  id, first_name, last_name, phone, email, address, birthdate,
  insurance_number, medical_notes, created_at, updated_at
";

/// Server-side narrowing for [`Store::list_appointments`]. Every `None`
/// field means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    pub day: Option<Date>,
    pub vehicle_id: Option<VehicleId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdSequence {
    Appointment,
    Vehicle,
    Patient,
}

impl IdSequence {
    const fn entity(self) -> &'static str {
        match self {
            Self::Appointment => "appointments",
            Self::Vehicle => "vehicles",
            Self::Patient => "patients",
        }
    }

    fn format(self, value: i64) -> String {
        match self {
            Self::Appointment => format!("apt-{value:06}"),
            Self::Vehicle => format!("V{value:03}"),
            Self::Patient => format!("pat-{value:06}"),
        }
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        tracing::debug!("opened database {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
            tracing::info!("created rideboard schema");
        }

        ensure_required_indexes(&self.conn)?;
        Ok(())
    }

    pub fn create_appointment(&self, input: &AppointmentFormInput) -> Result<AppointmentId> {
        input.validate()?;
        if let Some(vehicle_id) = &input.vehicle_id {
            self.ensure_vehicle_assignable(vehicle_id)?;
        }

        let id = self.next_id(IdSequence::Appointment)?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO appointments (
                  id, start_at, end_at, status, patient_id,
                  patient_first_name, patient_last_name, patient_phone,
                  pickup_address, destination_address, transport_type, vehicle_id,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    id,
                    format_datetime(input.time_window.start())?,
                    format_datetime(input.time_window.end())?,
                    input.status.as_str(),
                    input.patient_id.as_ref().map(PatientId::as_str),
                    input.patient.first_name,
                    input.patient.last_name,
                    input.patient.phone_number,
                    input.pickup_address,
                    input.destination_address,
                    input.transport_type.as_str(),
                    input.vehicle_id.as_ref().map(VehicleId::as_str),
                    now,
                    now,
                ],
            )
            .context("insert appointment")?;

        tracing::info!(appointment = %id, "created appointment");
        Ok(AppointmentId::new(id))
    }

    pub fn update_appointment(
        &self,
        appointment_id: &AppointmentId,
        input: &AppointmentFormInput,
    ) -> Result<()> {
        input.validate()?;
        if let Some(vehicle_id) = &input.vehicle_id {
            self.ensure_vehicle_assignable(vehicle_id)?;
        }

        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE appointments
                SET
                  start_at = ?,
                  end_at = ?,
                  status = ?,
                  patient_id = ?,
                  patient_first_name = ?,
                  patient_last_name = ?,
                  patient_phone = ?,
                  pickup_address = ?,
                  destination_address = ?,
                  transport_type = ?,
                  vehicle_id = ?,
                  updated_at = ?
                WHERE id = ?
                ",
                params![
                    format_datetime(input.time_window.start())?,
                    format_datetime(input.time_window.end())?,
                    input.status.as_str(),
                    input.patient_id.as_ref().map(PatientId::as_str),
                    input.patient.first_name,
                    input.patient.last_name,
                    input.patient.phone_number,
                    input.pickup_address,
                    input.destination_address,
                    input.transport_type.as_str(),
                    input.vehicle_id.as_ref().map(VehicleId::as_str),
                    now,
                    appointment_id.as_str(),
                ],
            )
            .context("update appointment")?;
        if rows_affected == 0 {
            bail!(
                "appointment {appointment_id} not found -- refresh the schedule and retry"
            );
        }
        tracing::debug!(appointment = %appointment_id, "updated appointment");
        Ok(())
    }

    /// Inserts the record under its own id, or overwrites the stored one.
    /// Returns `true` when the id was new. Vehicle references are stored as
    /// given, so imports may name vehicles that are not registered here.
    pub fn upsert_appointment(&self, record: &Appointment) -> Result<bool> {
        AppointmentFormInput::from(record).validate()?;
        let existed = self.appointment_exists(&record.id)?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO appointments (
                  id, start_at, end_at, status,
                  patient_first_name, patient_last_name, patient_phone,
                  pickup_address, destination_address, transport_type, vehicle_id,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                  start_at = excluded.start_at,
                  end_at = excluded.end_at,
                  status = excluded.status,
                  patient_first_name = excluded.patient_first_name,
                  patient_last_name = excluded.patient_last_name,
                  patient_phone = excluded.patient_phone,
                  pickup_address = excluded.pickup_address,
                  destination_address = excluded.destination_address,
                  transport_type = excluded.transport_type,
                  vehicle_id = excluded.vehicle_id,
                  updated_at = excluded.updated_at
                ",
                params![
                    record.id.as_str(),
                    format_datetime(record.start())?,
                    format_datetime(record.end())?,
                    record.status.as_str(),
                    record.patient.first_name,
                    record.patient.last_name,
                    record.patient.phone_number,
                    record.pickup_address,
                    record.destination_address,
                    record.transport_type.as_str(),
                    record.vehicle_id.as_ref().map(VehicleId::as_str),
                    now,
                    now,
                ],
            )
            .with_context(|| format!("upsert appointment {}", record.id))?;
        Ok(!existed)
    }

    pub fn set_appointment_status(
        &self,
        appointment_id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "UPDATE appointments SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), now, appointment_id.as_str()],
            )
            .context("update appointment status")?;
        if rows_affected == 0 {
            bail!(
                "appointment {appointment_id} not found -- refresh the schedule and retry"
            );
        }
        tracing::info!(
            appointment = %appointment_id,
            status = status.as_str(),
            "changed appointment status"
        );
        Ok(())
    }

    /// Sets or clears the vehicle. The status is left alone.
    pub fn assign_vehicle(
        &self,
        appointment_id: &AppointmentId,
        vehicle_id: Option<&VehicleId>,
    ) -> Result<()> {
        if let Some(vehicle_id) = vehicle_id {
            self.ensure_vehicle_assignable(vehicle_id)?;
        }

        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "UPDATE appointments SET vehicle_id = ?, updated_at = ? WHERE id = ?",
                params![
                    vehicle_id.map(VehicleId::as_str),
                    now,
                    appointment_id.as_str()
                ],
            )
            .context("update appointment vehicle")?;
        if rows_affected == 0 {
            bail!(
                "appointment {appointment_id} not found -- refresh the schedule and retry"
            );
        }
        tracing::info!(
            appointment = %appointment_id,
            vehicle = vehicle_id.map_or("-", VehicleId::as_str),
            "assigned vehicle"
        );
        Ok(())
    }

    pub fn get_appointment(&self, appointment_id: &AppointmentId) -> Result<Appointment> {
        self.conn
            .query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?"),
                params![appointment_id.as_str()],
                appointment_from_row,
            )
            .with_context(|| format!("load appointment {appointment_id}"))
    }

    /// Records matching `query`, ordered by start instant then id.
    pub fn list_appointments(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>> {
        let mut sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments");
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(status) = query.status {
            clauses.push("status = ?");
            values.push(status.as_str().to_owned());
        }
        if let Some(day) = query.day {
            // RFC 3339 text keeps the local date of the stored offset up front.
            clauses.push("substr(start_at, 1, 10) = ?");
            values.push(format_date(day));
        }
        if let Some(vehicle_id) = &query.vehicle_id {
            clauses.push("vehicle_id = ?");
            values.push(vehicle_id.as_str().to_owned());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY start_at ASC, id ASC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare appointments query")?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), appointment_from_row)
            .context("query appointments")?;
        let mut records = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect appointments")?;

        records.sort_by(|left, right| {
            left.start()
                .cmp(&right.start())
                .then_with(|| left.id.as_str().cmp(right.id.as_str()))
        });
        Ok(records)
    }

    pub fn delete_appointment(&self, appointment_id: &AppointmentId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM appointments WHERE id = ?",
                params![appointment_id.as_str()],
            )
            .with_context(|| format!("delete appointment {appointment_id}"))?;
        if rows_affected == 0 {
            bail!("appointment {appointment_id} not found or already deleted");
        }
        tracing::info!(appointment = %appointment_id, "deleted appointment");
        Ok(())
    }

    pub fn create_vehicle(&self, input: &VehicleFormInput) -> Result<VehicleId> {
        input.validate()?;
        let id = self.next_id(IdSequence::Vehicle)?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO vehicles (
                  id, label, license_plate, kind, capacity, active, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    id,
                    input.label.trim(),
                    input.license_plate,
                    input.kind,
                    input.capacity,
                    input.active,
                    now,
                    now,
                ],
            )
            .with_context(|| {
                format!(
                    "insert vehicle {:?} -- labels must be unique",
                    input.label.trim()
                )
            })?;
        tracing::info!(vehicle = %id, "created vehicle");
        Ok(VehicleId::new(id))
    }

    pub fn update_vehicle(&self, vehicle_id: &VehicleId, input: &VehicleFormInput) -> Result<()> {
        input.validate()?;
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE vehicles
                SET
                  label = ?,
                  license_plate = ?,
                  kind = ?,
                  capacity = ?,
                  active = ?,
                  updated_at = ?
                WHERE id = ?
                ",
                params![
                    input.label.trim(),
                    input.license_plate,
                    input.kind,
                    input.capacity,
                    input.active,
                    now,
                    vehicle_id.as_str(),
                ],
            )
            .context("update vehicle")?;
        if rows_affected == 0 {
            bail!("vehicle {vehicle_id} not found -- choose an existing vehicle and retry");
        }
        tracing::debug!(vehicle = %vehicle_id, "updated vehicle");
        Ok(())
    }

    pub fn get_vehicle(&self, vehicle_id: &VehicleId) -> Result<Vehicle> {
        self.conn
            .query_row(
                &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?"),
                params![vehicle_id.as_str()],
                vehicle_from_row,
            )
            .with_context(|| format!("load vehicle {vehicle_id}"))
    }

    pub fn list_vehicles(&self, include_inactive: bool) -> Result<Vec<Vehicle>> {
        let mut sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles\n");
        if !include_inactive {
            sql.push_str("WHERE active = 1\n");
        }
        sql.push_str("ORDER BY label ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql).context("prepare vehicles query")?;
        let rows = stmt
            .query_map([], vehicle_from_row)
            .context("query vehicles")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect vehicles")
    }

    pub fn create_patient(&self, input: &PatientFormInput) -> Result<PatientId> {
        input.validate()?;
        let id = self.next_id(IdSequence::Patient)?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO patients (
                  id, first_name, last_name, phone, email, address, birthdate,
                  insurance_number, medical_notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    id,
                    input.first_name.trim(),
                    input.last_name.trim(),
                    input.phone,
                    input.email.trim(),
                    input.address,
                    input.birthdate.map(format_date),
                    input.insurance_number,
                    input.medical_notes,
                    now,
                    now,
                ],
            )
            .context("insert patient")?;
        tracing::info!(patient = %id, "created patient");
        Ok(PatientId::new(id))
    }

    pub fn update_patient(&self, patient_id: &PatientId, input: &PatientFormInput) -> Result<()> {
        input.validate()?;
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE patients
                SET
                  first_name = ?,
                  last_name = ?,
                  phone = ?,
                  email = ?,
                  address = ?,
                  birthdate = ?,
                  insurance_number = ?,
                  medical_notes = ?,
                  updated_at = ?
                WHERE id = ?
                ",
                params![
                    input.first_name.trim(),
                    input.last_name.trim(),
                    input.phone,
                    input.email.trim(),
                    input.address,
                    input.birthdate.map(format_date),
                    input.insurance_number,
                    input.medical_notes,
                    now,
                    patient_id.as_str(),
                ],
            )
            .context("update patient")?;
        if rows_affected == 0 {
            bail!("patient {patient_id} not found -- choose an existing patient and retry");
        }
        tracing::debug!(patient = %patient_id, "updated patient");
        Ok(())
    }

    pub fn list_patients(&self) -> Result<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY last_name ASC, first_name ASC, id ASC"
            ))
            .context("prepare patients query")?;
        let rows = stmt
            .query_map([], patient_from_row)
            .context("query patients")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect patients")
    }

    /// Two vehicles, four patients and one appointment per lifecycle stage,
    /// all on `day` in `offset`.
    pub fn seed_demo_data(&self, day: Date, offset: UtcOffset) -> Result<()> {
        let first_vehicle = self.create_vehicle(&VehicleFormInput {
            label: "Rollstuhlwagen 1".to_owned(),
            license_plate: "B-RB 101".to_owned(),
            kind: "Rollstuhl".to_owned(),
            capacity: Some(2),
            active: true,
        })?;
        let second_vehicle = self.create_vehicle(&VehicleFormInput {
            label: "Tragestuhlwagen 2".to_owned(),
            license_plate: "B-RB 202".to_owned(),
            kind: "Tragestuhl".to_owned(),
            capacity: Some(1),
            active: true,
        })?;

        let demo = [
            (
                ("Hans", "Müller", "+49123456789"),
                (10, 0),
                AppointmentStatus::Unassigned,
                "Hauptstraße 1, Berlin",
                "Klinikum Berlin, Charité",
                TransportType::Wheelchair,
                None,
            ),
            (
                ("Maria", "Schmidt", "+49987654321"),
                (11, 0),
                AppointmentStatus::Assigned,
                "Berliner Straße 42, Berlin",
                "Praxis Dr. Weber, Friedrichstraße",
                TransportType::CarryingChair,
                Some(&first_vehicle),
            ),
            (
                ("Klaus", "Weber", "+49123123123"),
                (14, 0),
                AppointmentStatus::InProgress,
                "Alexanderplatz 5, Berlin",
                "Vivantes Klinikum Neukölln",
                TransportType::Wheelchair,
                Some(&second_vehicle),
            ),
            (
                ("Anna", "Fischer", "+49456456456"),
                (16, 0),
                AppointmentStatus::Completed,
                "Kurfürstendamm 123, Berlin",
                "Hausarztpraxis Dr. Schulz",
                TransportType::CarryingChair,
                Some(&first_vehicle),
            ),
        ];

        for ((first, last, phone), (hour, minute), status, pickup, destination, transport, vehicle) in
            demo
        {
            let patient_id = self.create_patient(&PatientFormInput {
                first_name: first.to_owned(),
                last_name: last.to_owned(),
                phone: phone.to_owned(),
                email: String::new(),
                address: pickup.to_owned(),
                birthdate: None,
                insurance_number: String::new(),
                medical_notes: String::new(),
            })?;
            let start = day
                .with_hms(hour, minute, 0)
                .context("build demo start time")?
                .assume_offset(offset);
            self.create_appointment(&AppointmentFormInput {
                time_window: TimeWindow::starting_at(start, Duration::minutes(45))?,
                status,
                patient: PatientContact {
                    first_name: first.to_owned(),
                    last_name: last.to_owned(),
                    phone_number: phone.to_owned(),
                },
                patient_id: Some(patient_id),
                pickup_address: pickup.to_owned(),
                destination_address: destination.to_owned(),
                transport_type: transport,
                vehicle_id: vehicle.cloned(),
            })?;
        }

        tracing::info!(day = %format_date(day), "seeded demo schedule");
        Ok(())
    }

    fn ensure_vehicle_assignable(&self, vehicle_id: &VehicleId) -> Result<()> {
        let active: Option<bool> = self
            .conn
            .query_row(
                "SELECT active FROM vehicles WHERE id = ?",
                params![vehicle_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("load vehicle {vehicle_id} for assignment"))?;
        match active {
            Some(true) => Ok(()),
            Some(false) => {
                bail!("vehicle {vehicle_id} is inactive -- reactivate it or pick another vehicle")
            }
            None => bail!("vehicle {vehicle_id} does not exist -- pick a registered vehicle"),
        }
    }

    fn appointment_exists(&self, appointment_id: &AppointmentId) -> Result<bool> {
        let exists: i64 = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM appointments WHERE id = ?)",
                params![appointment_id.as_str()],
                |row| row.get(0),
            )
            .with_context(|| format!("check appointment {appointment_id}"))?;
        Ok(exists == 1)
    }

    fn next_id(&self, sequence: IdSequence) -> Result<String> {
        let table = sequence.entity();
        loop {
            let value: i64 = self
                .conn
                .query_row(
                    "
                    INSERT INTO id_sequences (entity, last_value) VALUES (?, 1)
                    ON CONFLICT (entity) DO UPDATE SET last_value = last_value + 1
                    RETURNING last_value
                    ",
                    params![table],
                    |row| row.get(0),
                )
                .with_context(|| format!("advance id sequence for {table}"))?;

            // Imported rows keep their own ids; skip any that collide.
            let candidate = sequence.format(value);
            let taken: i64 = self
                .conn
                .query_row(
                    &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)"),
                    params![candidate],
                    |row| row.get(0),
                )
                .with_context(|| format!("check id {candidate} in {table}"))?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("RIDEBOARD_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set RIDEBOARD_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("rideboard.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let start_raw: String = row.get(1)?;
    let end_raw: String = row.get(2)?;
    let status_raw: String = row.get(3)?;
    let transport_raw: String = row.get(9)?;
    let vehicle_raw: Option<String> = row.get(10)?;

    let status = AppointmentStatus::parse(&status_raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(error))
    })?;
    let transport_type = TransportType::parse(&transport_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown transport type {transport_raw}"),
            )),
        )
    })?;
    let start = parse_datetime(&start_raw).map_err(to_sql_error)?;
    let end = parse_datetime(&end_raw).map_err(to_sql_error)?;

    Ok(Appointment {
        id: AppointmentId::new(row.get::<_, String>(0)?),
        time_window: TimeWindow::new(start, end).map_err(to_sql_error)?,
        status,
        patient: PatientContact {
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            phone_number: row.get(6)?,
        },
        pickup_address: row.get(7)?,
        destination_address: row.get(8)?,
        transport_type,
        vehicle_id: vehicle_raw.map(VehicleId::new),
    })
}

fn vehicle_from_row(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
    let created_at_raw: String = row.get(6)?;
    let updated_at_raw: String = row.get(7)?;
    Ok(Vehicle {
        id: VehicleId::new(row.get::<_, String>(0)?),
        label: row.get(1)?,
        license_plate: row.get(2)?,
        kind: row.get(3)?,
        capacity: row.get(4)?,
        active: row.get(5)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let birthdate_raw: Option<String> = row.get(6)?;
    let created_at_raw: String = row.get(9)?;
    let updated_at_raw: String = row.get(10)?;
    Ok(Patient {
        id: PatientId::new(row.get::<_, String>(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        address: row.get(5)?,
        birthdate: parse_opt_date(birthdate_raw).map_err(to_sql_error)?,
        insurance_number: row.get(7)?,
        medical_notes: row.get(8)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a rideboard database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    format_datetime(OffsetDateTime::now_utc())
}

fn format_datetime(value: OffsetDateTime) -> Result<String> {
    value.format(&Rfc3339).context("format timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = OffsetDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_date(raw: &str) -> Result<Date> {
    if let Ok(value) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Ok(value);
    }
    Ok(parse_datetime(raw)?.date())
}

fn parse_opt_date(raw: Option<String>) -> Result<Option<Date>> {
    raw.as_deref().map(parse_date).transpose()
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}

fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}
