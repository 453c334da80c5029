//! # Sample series and missing value handling.
//!
//! This module provides the [`Observable`] trait, which decides whether a single measurement
//! is usable. Missing measurements are stored in-line as non-finite values (NaN) instead of
//! `Option<T>`, which keeps columns as plain numeric slices that can be handed around without
//! copying.
//!
//! Some upstream data sources also emit integer fill values for missing data
//! (`-2147483647` scaled to a float). These sentinels are described by [`FillValues`] and are
//! treated exactly like NaN once declared.
//!
//! Individual measurements are represented by [`Sample`], and an ordered sequence of samples
//! by [`SampleSeries`]. [`SampleSeries`] has, among others, three important implementations:
//! - [`valid`](`SampleSeries::valid`) Returns the subsequence of valid samples in their
//!   original order.
//! - [`sort_by_timestamp`](`SampleSeries::sort_by_timestamp`) Stable sort by timestamp.
//! - [`Add / +`](`std::ops::Add`) Concatenation of two series.

mod sample;

pub use sample::*;

use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors associated with the [`series`](crate::series) module.
#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("time axis and value column differ in length ({time} != {values})")]
    ShapeMismatch { time: usize, values: usize },
}

/// A trait that must be implemented for any type that acts as a measurement.
pub trait Observable: Copy + Send + Sync {
    /// Returns `true` if the measurement is considered valid.
    fn is_valid(&self) -> bool;
}

impl Observable for f32 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl Observable for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

/// A set of sentinel values that mark a measurement as missing.
///
/// Non-finite values are always considered missing, independent of the sentinels.
#[derive(Clone, Debug, Deref, Deserialize, IntoIterator, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FillValues<T>(#[into_iterator(owned, ref)] Vec<T>);

impl<T> Default for FillValues<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> FillValues<T>
where
    T: Observable + PartialEq,
{
    /// Create a new [`FillValues`] from an iterator over sentinels.
    pub fn new<I: IntoIterator<Item = T>>(sentinels: I) -> Self {
        Self(sentinels.into_iter().collect())
    }

    /// Returns `true` if `value` is non-finite or equal to one of the sentinels.
    pub fn is_missing(&self, value: &T) -> bool {
        !value.is_valid() || self.0.contains(value)
    }

    /// Replace every sentinel within `values` by `nan`.
    ///
    /// Returns the number of replaced values.
    pub fn scrub(&self, values: &mut [T], nan: T) -> usize {
        if self.0.is_empty() {
            return 0;
        }

        values.iter_mut().fold(0, |acc, value| {
            if self.0.contains(value) {
                *value = nan;
                acc + 1
            } else {
                acc
            }
        })
    }
}

impl FillValues<f64> {
    /// The 32-bit integer fill value used by the tabular data service.
    pub const ERDDAP_INT: f64 = -2.147483647e9;

    /// Returns the sentinels used by the tabular data service.
    pub fn erddap() -> Self {
        Self::new([Self::ERDDAP_INT])
    }
}
