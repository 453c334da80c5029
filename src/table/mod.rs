//! # Columnar glider tables.
//!
//! A [`Table`] is a shared time axis (seconds since the Unix epoch) together with a set of
//! numeric columns of the same length, addressed by the logical names of a
//! [`Schema`](schema::Schema).
//!
//! Tables are read from the CSV export of the tabular data service. The header row carries
//! `name (unit)` entries, the time column is ISO-8601 and missing cells are empty, `NaN` or
//! equal to one of the schema fill values. A second header row holding only units (as
//! emitted by the plain `.csv` response type) is detected and skipped.

pub mod schema;

use crate::series::{Sample, SampleSeries};
use chrono::{DateTime, NaiveDateTime};
use csv::StringRecord;
use log::debug;
use schema::{FieldKind, FieldSpec, Schema, SchemaError};
use std::{fs::File, io, path::Path, time::Instant};
use thiserror::Error;

/// Errors associated with the [`table`](crate::table) module.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read csv data")]
    Csv(#[from] csv::Error),
    #[error("failed to open table")]
    Io(#[from] io::Error),
    #[error("schema error")]
    Schema(#[from] SchemaError),
    #[error("column \"{column}\" has {found} entries but the time axis has {expected}")]
    ShapeMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid timestamp \"{text}\"")]
    Time { line: u64, text: String },
    #[error("line {line}: invalid value \"{text}\" in column \"{column}\"")]
    Value {
        line: u64,
        column: String,
        text: String,
    },
}

/// A single named table column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    spec: FieldSpec,
    values: Vec<f64>,
}

impl Column {
    /// Returns the field specification of the column.
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// Returns the column values, missing values are NaN.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A time axis with named numeric columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    time: Vec<f64>,
    columns: Vec<Column>,
}

impl Table {
    /// Returns the values of the column `name`.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|column| column.spec.name == name)
            .map(|column| column.values.as_slice())
    }

    /// Returns all columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Create a [`Table`] from an in-memory time axis and columns.
    pub fn from_columns<I>(time: Vec<f64>, columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (FieldSpec, Vec<f64>)>,
    {
        let columns = columns
            .into_iter()
            .map(|(spec, values)| {
                if values.len() != time.len() {
                    return Err(TableError::ShapeMismatch {
                        column: spec.name,
                        expected: time.len(),
                        found: values.len(),
                    });
                }

                Ok(Column { spec, values })
            })
            .collect::<Result<Vec<Column>, TableError>>()?;

        Ok(Self { time, columns })
    }

    /// Read a [`Table`] from a CSV file.
    pub fn from_path<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<Self, TableError> {
        debug!("table: reading {}", path.as_ref().display());

        Self::from_reader(File::open(path)?, schema)
    }

    /// Read a [`Table`] from CSV data.
    ///
    /// Only the columns named by `schema` are kept. Fill values and `NaN` cells are stored
    /// as NaN.
    pub fn from_reader<R: io::Read>(reader: R, schema: &Schema) -> Result<Self, TableError> {
        let start = Instant::now();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let resolved = schema.resolve(headers.iter())?;

        let time_spec = schema.time_field();
        let time_idx = resolved[&time_spec.name];

        // Keep the schema order for the value columns.
        let mut columns = schema
            .fields()
            .iter()
            .filter(|spec| spec.kind != FieldKind::Time)
            .filter_map(|spec| {
                resolved.get(&spec.name).map(|idx| {
                    (
                        *idx,
                        Column {
                            spec: spec.clone(),
                            values: Vec::new(),
                        },
                    )
                })
            })
            .collect::<Vec<(usize, Column)>>();

        let mut time = Vec::new();
        let mut record = StringRecord::new();

        while reader.read_record(&mut record)? {
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            let text = &record[time_idx];

            if time.is_empty() && is_units_row(text, time_spec) {
                debug!("table: skipping units row at line {}", line);
                continue;
            }

            time.push(parse_time(text).ok_or_else(|| TableError::Time {
                line,
                text: text.to_string(),
            })?);

            for (idx, column) in columns.iter_mut() {
                let text = &record[*idx];

                let value = parse_value(text).ok_or_else(|| TableError::Value {
                    line,
                    column: column.spec.name.clone(),
                    text: text.to_string(),
                })?;

                column.values.push(value);
            }
        }

        let scrubbed = columns.iter_mut().fold(0, |acc, (_, column)| {
            acc + schema.fill_values().scrub(&mut column.values, f64::NAN)
        });

        debug!(
            "table: read {} rows x {} columns ({} fill values) in {:.2} sec",
            time.len(),
            columns.len(),
            scrubbed,
            start.elapsed().as_millis() as f64 / 1e3
        );

        Ok(Self {
            time,
            columns: columns.into_iter().map(|(_, column)| column).collect(),
        })
    }

    /// Returns `true` if the table contains no rows.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Returns an iterator over the logical names of all columns.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.spec.name.as_str())
    }

    /// Returns the column `name` as a [`SampleSeries`] over the time axis.
    pub fn series(&self, name: &str) -> Option<SampleSeries<f64>> {
        self.column(name).map(|values| {
            SampleSeries::from_iterator(
                self.time
                    .iter()
                    .zip(values)
                    .map(|(t, v)| Sample::new(*t, *v)),
            )
        })
    }

    /// Returns the time axis, in seconds since the Unix epoch.
    pub fn time(&self) -> &[f64] {
        &self.time
    }
}

/// Parses an ISO-8601 timestamp into seconds since the Unix epoch.
///
/// Timestamps without an offset are interpreted as UTC.
pub fn parse_time(text: &str) -> Option<f64> {
    let datetime = match DateTime::parse_from_rfc3339(text) {
        Ok(datetime) => datetime.to_utc(),
        Err(_) => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())?
            .and_utc(),
    };

    Some(datetime.timestamp() as f64 + datetime.timestamp_subsec_nanos() as f64 / 1e9)
}

/// Parses a numeric cell, empty and `NaN` cells are returned as NaN.
fn parse_value(text: &str) -> Option<f64> {
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        Some(f64::NAN)
    } else {
        text.parse::<f64>().ok()
    }
}

fn is_units_row(text: &str, time_spec: &FieldSpec) -> bool {
    match &time_spec.unit {
        Some(unit) => text == unit,
        None => text == "UTC",
    }
}
