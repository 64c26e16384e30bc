// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use rideboard_app::{AppointmentDocument, RecordError};
use rideboard_db::Store;
use std::fs;
use std::path::Path;

#[derive(Debug, Default)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: Vec<RecordError>,
}

/// Loads a JSON array of appointment documents into the store. Documents
/// that fail validation are collected in the report and skipped; the rest
/// are upserted under their own ids.
pub fn import_snapshot(store: &Store, path: &Path) -> Result<ImportReport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read snapshot {}", path.display()))?;
    let documents: Vec<AppointmentDocument> = serde_json::from_str(&raw).with_context(|| {
        format!(
            "parse snapshot {} -- expected a JSON array of appointment objects",
            path.display()
        )
    })?;

    let mut report = ImportReport::default();
    for document in documents {
        let record = match document.into_appointment() {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(appointment = %error.record_id(), "rejected snapshot record: {error}");
                report.rejected.push(error);
                continue;
            }
        };
        if store
            .upsert_appointment(&record)
            .with_context(|| format!("import appointment {}", record.id))?
        {
            report.inserted += 1;
        } else {
            report.updated += 1;
        }
    }

    tracing::info!(
        inserted = report.inserted,
        updated = report.updated,
        rejected = report.rejected.len(),
        "imported snapshot {}",
        path.display()
    );
    Ok(report)
}
