use crate::series::{Observable, SeriesError};
use derive_more::IntoIterator;
use itertools::zip_eq;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    ops::{Add, AddAssign},
};

/// Represents a single measurement in time.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Sample<T> {
    timestamp: T,
    value: T,
}

impl<T> Sample<T>
where
    T: Observable,
{
    /// Returns `true` if the sample carries a valid measurement.
    pub fn is_valid(&self) -> bool {
        self.value.is_valid()
    }

    /// Create a new [`Sample`].
    pub fn new(timestamp: T, value: T) -> Self {
        Self { timestamp, value }
    }

    /// Returns the sample timestamp.
    pub fn timestamp(&self) -> T {
        self.timestamp
    }

    /// Returns the measured value.
    pub fn value(&self) -> T {
        self.value
    }
}

/// Represents a time series of measurements.
#[derive(Clone, Debug, Default, Deserialize, IntoIterator, PartialEq, Serialize)]
pub struct SampleSeries<T> {
    /// Vector of samples.
    #[into_iterator(owned, ref)]
    samples: Vec<Sample<T>>,
}

impl<T> SampleSeries<T>
where
    T: Observable + PartialOrd,
{
    /// Returns the first [`Sample`].
    pub fn first_sample(&self) -> Option<&Sample<T>> {
        self.samples.first()
    }

    /// Create a [`SampleSeries`] from a time axis and a value column of equal length.
    pub fn from_columns(time: &[T], values: &[T]) -> Result<Self, SeriesError> {
        if time.len() != values.len() {
            return Err(SeriesError::ShapeMismatch {
                time: time.len(),
                values: values.len(),
            });
        }

        Ok(Self {
            samples: zip_eq(time, values)
                .map(|(t, v)| Sample::new(*t, *v))
                .collect(),
        })
    }

    /// Create a [`SampleSeries`] from an iterator over [`Sample`].
    pub fn from_iterator<I: IntoIterator<Item = Sample<T>>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }

    /// Returns `true` if the series contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns `true` if the timestamps are non-decreasing.
    pub fn is_sorted_by_timestamp(&self) -> bool {
        self.samples
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }

    /// Returns the last [`Sample`].
    pub fn last_sample(&self) -> Option<&Sample<T>> {
        self.samples.last()
    }

    /// Returns the valid [`Sample`] with the largest timestamp.
    ///
    /// Later samples win ties, so an unsorted series still returns the most recently
    /// recorded sample for a repeated timestamp.
    pub fn latest(&self) -> Option<&Sample<T>> {
        self.samples
            .iter()
            .filter(|sample| sample.is_valid() && sample.timestamp.is_valid())
            .fold(None, |acc: Option<&Sample<T>>, next| match acc {
                Some(best) if best.timestamp > next.timestamp => Some(best),
                _ => Some(next),
            })
    }

    /// Returns the number of samples in the series.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Create an empty [`SampleSeries`].
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Sorts the underlying samples by their timestamps.
    ///
    /// The sort is stable. Samples with an invalid timestamp are moved to the end of the
    /// series, in their original order.
    pub fn sort_by_timestamp(&mut self) {
        self.samples.sort_by(|a, b| {
            match (a.timestamp.is_valid(), b.timestamp.is_valid()) {
                (true, true) => a
                    .timestamp
                    .partial_cmp(&b.timestamp)
                    .unwrap_or(Ordering::Equal),
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => Ordering::Equal,
            }
        });
    }

    /// Returns a copy of all timestamps.
    pub fn timestamps(&self) -> Vec<T> {
        self.samples.iter().map(|sample| sample.timestamp).collect()
    }

    /// Returns the subsequence of valid samples, preserving their order.
    pub fn valid(&self) -> Self {
        let samples = self
            .samples
            .iter()
            .filter(|sample| sample.is_valid())
            .copied()
            .collect::<Vec<Sample<T>>>();

        debug!(
            "series_valid: kept {} out of {} samples",
            samples.len(),
            self.samples.len()
        );

        Self { samples }
    }

    /// Returns a copy of all measured values.
    pub fn values(&self) -> Vec<T> {
        self.samples.iter().map(|sample| sample.value).collect()
    }
}

impl<T> Add<Sample<T>> for SampleSeries<T> {
    type Output = Self;

    fn add(self, rhs: Sample<T>) -> Self::Output {
        let mut samples = self.samples;

        samples.push(rhs);

        Self { samples }
    }
}

impl<T> Add for SampleSeries<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let mut samples = self.samples;

        debug!(
            "merging two SampleSeries objects ({} + {})",
            samples.len(),
            rhs.samples.len()
        );

        samples.extend(rhs.samples);

        Self { samples }
    }
}

impl<T> AddAssign<Sample<T>> for SampleSeries<T> {
    fn add_assign(&mut self, rhs: Sample<T>) {
        self.samples.push(rhs);
    }
}

impl<T> AddAssign for SampleSeries<T> {
    fn add_assign(&mut self, rhs: Self) {
        debug!(
            "merging two SampleSeries objects ({} + {})",
            self.samples.len(),
            rhs.samples.len()
        );

        self.samples.extend(rhs.samples);
    }
}
