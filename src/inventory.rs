//! The inventory of raw sensor files.
//!
//! Each device's dataset holds one folder per subject, and each subject folder one tsv file per
//! day of recording. Every file becomes a record of who wore what, on which day, and over what time
//! span. The file content itself is shared with the curated table by copying the file handles.
use crate::{
    config::{Config, RawDataSource, DEVICE_SIDES},
    store::{self, CopyRequest, DataStore, FileHandleId},
    subject::{first_number, SubjectId},
    table::{opt, Column, ColumnType, Record, Table},
    tsv,
};
use qu::ick_use::*;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

pub const TSV_CONTENT_TYPE: &str = "text/tab-separated-values";
/// The column of a sensor file holding sample times.
const TIMESTAMP: &str = "timestamp";

/// One day of raw sensor data.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSensorRecord {
    pub subject_id: SubjectId,
    pub device: String,
    pub device_position: Option<String>,
    pub participant_day: u32,
    pub timestamp_start: Option<f64>,
    pub timestamp_end: Option<f64>,
    /// The file entity the data came from.
    pub source_file: String,
    /// Starts as the source file's handle, then replaced by the copy's.
    pub data_file_handle_id: FileHandleId,
}

impl Record for RawSensorRecord {
    fn columns() -> Vec<Column> {
        vec![
            Column::string("subject_id", 6),
            Column::string("device", 10),
            Column::string("device_position", 16),
            Column::new("participant_day", ColumnType::Integer),
            Column::new("timestamp_start", ColumnType::Double),
            Column::new("timestamp_end", ColumnType::Double),
            Column::new("source_file", ColumnType::EntityId),
            Column::new("data_file_handle_id", ColumnType::FileHandleId),
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.subject_id.to_string(),
            self.device.clone(),
            opt(&self.device_position),
            self.participant_day.to_string(),
            opt(&self.timestamp_start),
            opt(&self.timestamp_end),
            self.source_file.clone(),
            self.data_file_handle_id.to_string(),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct DeviceSideRow {
    subject_id: String,
    device: String,
    device_side: String,
}

/// Which wrist each subject wore each wrist-worn device on.
#[derive(Debug, Clone, Default)]
pub struct DeviceSides {
    sides: BTreeMap<(SubjectId, String), String>,
}

impl DeviceSides {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let rows: Vec<DeviceSideRow> = tsv::load_records(path)?;
        let mut sides = DeviceSides::default();
        for row in rows {
            let subject = parse_subject(&row.subject_id)?;
            sides.insert(subject, row.device, row.device_side);
        }
        Ok(sides)
    }

    pub fn insert(&mut self, subject: SubjectId, device: String, side: String) {
        self.sides.insert((subject, device), side);
    }

    /// Where `device` was worn by `subject`. Devices with no recorded side were worn on the legs.
    pub fn position(&self, subject: SubjectId, device: &str) -> &'static str {
        match self.sides.get(&(subject, device.to_string())) {
            Some(side) if side.trim() == "Right" => "RightUpperLimb",
            Some(_) => "LeftUpperLimb",
            None => "LowerLimbs",
        }
    }
}

/// Canonical (`3_BOS`) or score table (`103`) subject ids.
fn parse_subject(input: &str) -> Result<SubjectId> {
    match input.trim().parse::<i64>() {
        Ok(id) => SubjectId::from_score_id(id),
        Err(_) => input.parse(),
    }
}

/// The first and last sample time in a sensor file.
pub fn timestamp_range(path: impl AsRef<Path>) -> Result<(f64, f64)> {
    fn inner(path: &Path) -> Result<(f64, f64)> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_path(path)?;
        let col = reader
            .headers()?
            .iter()
            .position(|h| h == TIMESTAMP)
            .with_context(|| format!("no `{}` column", TIMESTAMP))?;
        let mut range: Option<(f64, f64)> = None;
        for record in reader.records() {
            let record = record?;
            let Some(value) = record.get(col).and_then(|v| v.parse::<f64>().ok()) else {
                continue;
            };
            if value.is_nan() {
                continue;
            }
            range = Some(match range {
                None => (value, value),
                Some((start, end)) => (start.min(value), end.max(value)),
            });
        }
        range.with_context(|| format!("no values in `{}` column", TIMESTAMP))
    }
    let path = path.as_ref();
    inner(path).with_context(|| format!("reading sample times from \"{}\"", path.display()))
}

/// Build the records for one device's dataset.
pub fn inventory_source(
    store: &impl DataStore,
    dataset: &str,
    source: &RawDataSource,
    sides: Option<&DeviceSides>,
) -> Result<Vec<RawSensorRecord>> {
    let mut records = vec![];
    for folder in store.folders(dataset)? {
        let subject_id = SubjectId::from_device_folder(&folder.name)?;
        let device_position = match (&source.position, sides) {
            (Some(position), _) => Some(position.clone()),
            (None, Some(sides)) => Some(sides.position(subject_id, &source.device).to_string()),
            (None, None) => None,
        };
        event!(
            Level::INFO,
            "{} files for subject {} (\"{}\")",
            source.device,
            subject_id,
            folder.name
        );
        for file in store.files(&folder.id)? {
            let participant_day = first_number(&file.name)
                .with_context(|| format!("no day number in file name \"{}\"", file.name))?;
            let (timestamp_start, timestamp_end, data_file_handle_id) = if source.timestamp_range {
                let fetched = store.fetch(&file.id)?;
                let (start, end) = timestamp_range(&fetched.path)?;
                (Some(start), Some(end), fetched.data_file_handle_id)
            } else {
                (None, None, store.file_handle(&file.id)?)
            };
            records.push(RawSensorRecord {
                subject_id,
                device: source.device.clone(),
                device_position: device_position.clone(),
                participant_day,
                timestamp_start,
                timestamp_end,
                source_file: file.id,
                data_file_handle_id,
            });
        }
    }
    Ok(records)
}

/// Copy the file handle of every record, and point the records at the copies.
pub fn copy_handles(store: &mut impl DataStore, records: &mut [RawSensorRecord]) -> Result {
    let requests = records
        .iter()
        .map(|rec| CopyRequest {
            file_handle_id: rec.data_file_handle_id,
            associate_object_id: rec.source_file.clone(),
            content_type: TSV_CONTENT_TYPE.into(),
            file_name: None,
        })
        .collect::<Vec<_>>();
    let new_handles = store::copy_file_handles(store, &requests)?;
    ensure!(
        new_handles.len() == records.len(),
        "copied {} file handles for {} records",
        new_handles.len(),
        records.len()
    );
    for (record, handle) in records.iter_mut().zip(new_handles) {
        record.data_file_handle_id = handle;
    }
    Ok(())
}

/// Inventory every configured device dataset.
///
/// With `dry_run` set the file handles aren't copied, and the records keep the source handles.
pub fn curate_raw_data(
    store: &mut impl DataStore,
    config: &Config,
    dry_run: bool,
) -> Result<Table> {
    let sides = match config.optional_dataset(DEVICE_SIDES) {
        Some(id) => {
            let file = store.fetch(id)?;
            Some(DeviceSides::load(&file.path)?)
        }
        None => None,
    };
    let mut all = vec![];
    for source in &config.raw_data {
        let dataset = config.dataset(&source.dataset)?;
        event!(
            Level::INFO,
            "building {} inventory from \"{}\"",
            source.device,
            dataset
        );
        let mut records = inventory_source(&*store, dataset, source, sides.as_ref())
            .with_context(|| format!("building {} inventory", source.device))?;
        if dry_run {
            event!(
                Level::INFO,
                "dry run, not copying {} file handles",
                records.len()
            );
        } else {
            copy_handles(store, &mut records)?;
        }
        all.extend(records);
    }
    Ok(Table::from_records("Sensor Measurements", &all))
}
