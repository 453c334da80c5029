//! # Depth-time transects.
//!
//! Depth is reported far less often than most science channels. A transect pairs every
//! valid sample of a science channel with the glider depth, linearly interpolated at the
//! sample timestamp. The result is the `(time, depth, value)` triples behind a
//! depth-time section plot.

use crate::{
    GliderError,
    align::{AlignSettings, AlignedPair, Aligner},
    series::{Sample, SampleSeries},
    table::Table,
};
use itertools::izip;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A single transect sample.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct TransectPoint {
    pub timestamp: f64,
    pub depth: f64,
    pub value: f64,
}

/// The transect samples of a single science channel.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TransectChannel {
    name: String,
    unit: Option<String>,
    points: Vec<TransectPoint>,
}

impl TransectChannel {
    /// Returns the logical channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the transect samples in time order.
    pub fn points(&self) -> &[TransectPoint] {
        &self.points
    }

    /// Returns the channel unit, if known.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

/// Interpolated depth for a set of science channels.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Transect {
    channels: Vec<TransectChannel>,
    depth: AlignedPair<f64>,
}

impl Transect {
    /// Build a [`Transect`] from the column `depth_field` and the science `channels`
    /// of `table`.
    ///
    /// Channels are processed in parallel, the output keeps the order of `channels`.
    pub fn build(
        table: &Table,
        depth_field: &str,
        channels: &[&str],
        settings: &AlignSettings<f64>,
    ) -> Result<Self, GliderError<f64>> {
        let start = Instant::now();

        let aligner = Aligner::new(settings.clone());
        let time = table.time();

        let depth = table
            .column(depth_field)
            .ok_or_else(|| GliderError::UnknownField(depth_field.to_string()))?;

        // Depth at every row of the table.
        let depth_on_time = aligner.align(time, time, depth)?;

        let channels = channels
            .par_iter()
            .map(|name| -> Result<TransectChannel, GliderError<f64>> {
                let column = table
                    .columns()
                    .iter()
                    .find(|column| column.spec().name == *name)
                    .ok_or_else(|| GliderError::UnknownField(name.to_string()))?;

                let pair = aligner.align(time, column.values(), depth)?;

                let points = izip!(
                    pair.timestamps().iter(),
                    pair.interpolated().iter(),
                    pair.values().iter()
                )
                .map(|(timestamp, depth, value)| TransectPoint {
                    timestamp: *timestamp,
                    depth: *depth,
                    value: *value,
                })
                .collect::<Vec<TransectPoint>>();

                Ok(TransectChannel {
                    name: name.to_string(),
                    unit: column.spec().unit.clone(),
                    points,
                })
            })
            .collect::<Result<Vec<TransectChannel>, _>>()?;

        debug!(
            "transect_build: {} channels over {} rows in {:.2} sec",
            channels.len(),
            table.len(),
            start.elapsed().as_millis() as f64 / 1e3
        );

        Ok(Self {
            channels,
            depth: depth_on_time,
        })
    }

    /// Returns the channel `name`.
    pub fn channel(&self, name: &str) -> Option<&TransectChannel> {
        self.channels.iter().find(|channel| channel.name == name)
    }

    /// Returns all channels.
    pub fn channels(&self) -> &[TransectChannel] {
        &self.channels
    }

    /// Returns the depth interpolated at every row of the source table.
    pub fn depth(&self) -> &AlignedPair<f64> {
        &self.depth
    }
}

/// A geographic position at a point in time.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Fix {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Returns the most recent [`Fix`] for which both coordinates are valid.
///
/// Returns `Ok(None)` if the table holds no valid position.
pub fn latest_fix(
    table: &Table,
    lat_field: &str,
    lon_field: &str,
) -> Result<Option<Fix>, GliderError<f64>> {
    let latitude = table
        .column(lat_field)
        .ok_or_else(|| GliderError::UnknownField(lat_field.to_string()))?;
    let longitude = table
        .column(lon_field)
        .ok_or_else(|| GliderError::UnknownField(lon_field.to_string()))?;

    // Row indices stand in for the values, rows without a full position are missing.
    let rows = SampleSeries::from_iterator(izip!(table.time(), latitude, longitude).enumerate().map(
        |(idx, (t, lat, lon))| {
            if lat.is_finite() && lon.is_finite() {
                Sample::new(*t, idx as f64)
            } else {
                Sample::new(*t, f64::NAN)
            }
        },
    ));

    Ok(rows.latest().map(|sample| {
        let idx = sample.value() as usize;

        Fix {
            timestamp: sample.timestamp(),
            latitude: latitude[idx],
            longitude: longitude[idx],
        }
    }))
}
