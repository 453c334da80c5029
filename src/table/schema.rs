//! # Field schema.
//!
//! A [`Schema`] maps logical field names onto the `name (unit)` headers of a tabular export.

use crate::series::FillValues;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, io, path::Path};
use thiserror::Error;

/// Errors associated with [`Schema`].
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field \"{0}\" is defined more than once")]
    DuplicateField(String),
    #[error("failed to read schema file")]
    Io(#[from] io::Error),
    #[error("failed to parse schema: {0}")]
    Json5(#[from] serde_json5::Error),
    #[error("no column matches the time field \"{0}\"")]
    MissingColumn(String),
    #[error("schema must define exactly one time field (found {0})")]
    MissingTimeField(usize),
}

/// The semantic kind of a field.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum FieldKind {
    Time,
    Depth,
    Latitude,
    Longitude,
    Science,
}

/// Maps a logical field name onto an upstream column.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Logical name, e.g. `nitrate`.
    pub name: String,

    /// Upstream column name without the unit suffix, e.g. `sci_suna_nitrate_concentration`.
    pub column: String,

    /// Expected unit, only used for diagnostics.
    #[serde(default)]
    pub unit: Option<String>,

    /// Semantic kind.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Create a new [`FieldSpec`].
    pub fn new(name: &str, column: &str, unit: Option<&str>, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            column: column.to_string(),
            unit: unit.map(str::to_string),
            kind,
        }
    }
}

/// A set of [`FieldSpec`] that is resolved against the header of a table once at
/// ingestion time.
///
/// Upstream headers embed units and special characters, e.g.
/// `sci_oxy4_oxygen (µmole/liter)`. Columns are therefore matched on the bare name only,
/// and every later access goes through the logical field name.
///
/// ```
/// # use glider_align::table::schema::Schema;
/// let schema = Schema::glider();
/// let resolved = schema
///     .resolve(["time (UTC)", "depth (m)", "sci_oxy4_oxygen (\u{00b5}mole/liter)"])
///     .unwrap();
///
/// assert_eq!(resolved["oxygen"], 2);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "SchemaDef", into = "SchemaDef")]
pub struct Schema {
    fields: Vec<FieldSpec>,
    fill_values: FillValues<f64>,
}

#[derive(Deserialize, Serialize)]
struct SchemaDef {
    fields: Vec<FieldSpec>,
    #[serde(default = "FillValues::erddap")]
    fill_values: FillValues<f64>,
}

impl TryFrom<SchemaDef> for Schema {
    type Error = SchemaError;

    fn try_from(value: SchemaDef) -> Result<Self, Self::Error> {
        Self::new(value.fields, value.fill_values)
    }
}

impl From<Schema> for SchemaDef {
    fn from(value: Schema) -> Self {
        Self {
            fields: value.fields,
            fill_values: value.fill_values,
        }
    }
}

impl Schema {
    /// Returns the field with the logical name `name`.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns all fields in definition order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the sentinel values that mark a cell as missing.
    pub fn fill_values(&self) -> &FillValues<f64> {
        &self.fill_values
    }

    /// Load a [`Schema`] from a JSON5 file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        Self::from_json5(&fs::read_to_string(path)?)
    }

    /// Load a [`Schema`] from a JSON5 string.
    ///
    /// The `fill_values` entry is optional and defaults to [`FillValues::erddap`].
    pub fn from_json5(source: &str) -> Result<Self, SchemaError> {
        let def = serde_json5::from_str::<SchemaDef>(source)?;

        Self::try_from(def)
    }

    /// The default schema for the glider datasets of the monitoring program.
    pub fn glider() -> Self {
        use FieldKind::*;

        let fields = vec![
            FieldSpec::new("time", "time", Some("UTC"), Time),
            FieldSpec::new("depth", "depth", Some("m"), Depth),
            FieldSpec::new("latitude", "latitude", Some("degrees_north"), Latitude),
            FieldSpec::new("longitude", "longitude", Some("degrees_east"), Longitude),
            FieldSpec::new(
                "backscatter_470",
                "sci_bb2flsv2_b470_scaled",
                Some("/m /sr"),
                Science,
            ),
            FieldSpec::new(
                "backscatter_532",
                "sci_bb2flsv2_b532_scaled",
                Some("/m /sr"),
                Science,
            ),
            FieldSpec::new("chlorophyll", "sci_bb2flsv2_chl_scaled", Some("ug/l"), Science),
            FieldSpec::new("irradiance", "sci_ocr504i_irrad3", None, Science),
            FieldSpec::new("oxygen", "sci_oxy4_oxygen", Some("\u{00b5}mole/liter"), Science),
            FieldSpec::new(
                "nitrate",
                "sci_suna_nitrate_concentration",
                Some("\u{03bc}mol"),
                Science,
            ),
            FieldSpec::new("temperature", "temperature", Some("degree_C"), Science),
            FieldSpec::new("salinity", "salinity", None, Science),
            FieldSpec::new("density", "density", Some("kg.m-3"), Science),
        ];

        Self {
            fields,
            fill_values: FillValues::erddap(),
        }
    }

    /// Create a new [`Schema`].
    ///
    /// Logical names must be unique and exactly one field must be of kind
    /// [`FieldKind::Time`].
    pub fn new(fields: Vec<FieldSpec>, fill_values: FillValues<f64>) -> Result<Self, SchemaError> {
        for (idx, field) in fields.iter().enumerate() {
            if fields[..idx].iter().any(|other| other.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }

        let time_fields = fields
            .iter()
            .filter(|field| field.kind == FieldKind::Time)
            .count();

        if time_fields != 1 {
            return Err(SchemaError::MissingTimeField(time_fields));
        }

        Ok(Self {
            fields,
            fill_values,
        })
    }

    /// Maps every logical field name onto the index of the matching header.
    ///
    /// Fields without a matching header are skipped, except for the time field.
    pub fn resolve<'a, I>(&self, headers: I) -> Result<HashMap<String, usize>, SchemaError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let headers = headers
            .into_iter()
            .map(split_header)
            .collect::<Vec<(&str, Option<&str>)>>();

        let mut resolved = HashMap::new();

        for field in &self.fields {
            match headers.iter().position(|(name, _)| *name == field.column) {
                Some(idx) => {
                    if let (Some(expected), Some(found)) = (&field.unit, headers[idx].1) {
                        if normalize_unit(expected) != normalize_unit(found) {
                            warn!(
                                "schema: column \"{}\" has unit \"{}\" (expected \"{}\")",
                                field.column, found, expected
                            );
                        }
                    }

                    resolved.insert(field.name.clone(), idx);
                }
                None if field.kind == FieldKind::Time => {
                    return Err(SchemaError::MissingColumn(field.column.clone()));
                }
                None => warn!(
                    "schema: no column for field \"{}\" ({})",
                    field.name, field.column
                ),
            }
        }

        debug!(
            "schema: resolved {} out of {} fields against {} columns",
            resolved.len(),
            self.fields.len(),
            headers.len()
        );

        Ok(resolved)
    }

    /// Returns the time field.
    pub fn time_field(&self) -> &FieldSpec {
        // Guaranteed to exist by construction.
        &self.fields[self
            .fields
            .iter()
            .position(|field| field.kind == FieldKind::Time)
            .unwrap_or_default()]
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::glider()
    }
}

/// Splits a header of the form `name (unit)` into its bare name and unit.
pub fn split_header(header: &str) -> (&str, Option<&str>) {
    let header = header.trim().trim_start_matches('\u{feff}').trim();

    if let Some(stripped) = header.strip_suffix(')') {
        if let Some(idx) = stripped.rfind(" (") {
            return (stripped[..idx].trim_end(), Some(&stripped[idx + 2..]));
        }
    }

    (header, None)
}

/// Micro sign and greek mu are used interchangeably upstream.
fn normalize_unit(unit: &str) -> String {
    unit.trim().replace('\u{00b5}', "\u{03bc}")
}
