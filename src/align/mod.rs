//! # Alignment of a secondary signal onto the time grid of a primary signal.
//!
//! Glider channels are recorded on a shared tick axis, but each instrument only fills the
//! slots in which it reported (all other slots are NaN). [`align`] resamples a sparse
//! secondary channel (e.g. depth) at every valid timestamp of a primary channel:
//!
//! 1. Remove the missing entries of the primary channel, keeping the original order.
//! 2. Remove the missing entries of the secondary channel, keeping the original order.
//! 3. Check or restore the ordering of the secondary timestamps, see [`SortPolicy`].
//! 4. Evaluate the secondary channel at the primary timestamps with [`interp()`], using
//!    flat extrapolation outside of the secondary range.
//!
//! The result is an [`AlignedPair`], whose three vectors are positionally aligned.
//!
//! Missing entries must be removed *before* any sorting takes place, as NaN values do not
//! have a defined order. For the same reason, secondary samples recorded at a non-finite
//! timestamp cannot act as interpolation knots and are dropped as well.

mod interp;

pub use interp::*;

use crate::{
    fXX,
    series::{FillValues, Sample, SampleSeries},
};
use derive_builder::Builder;
use itertools::zip_eq;
use log::{debug, trace};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, time::Instant};
use thiserror::Error;

/// Errors associated with the [`align`](crate::align) module.
#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq)]
pub enum AlignError<T> {
    #[error("secondary signal contains no valid samples")]
    InsufficientData,
    #[error(
        "input sequences differ in length: \
        time axis {time}, primary {primary}, secondary {secondary}"
    )]
    ShapeMismatch {
        time: usize,
        primary: usize,
        secondary: usize,
    },
    #[error("secondary timestamps decrease at valid sample {index} ({previous} -> {next})")]
    UnsortedInput { index: usize, previous: T, next: T },
}

/// Determines how the timestamps of the cleaned secondary signal are treated before
/// interpolation.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub enum SortPolicy {
    /// Use the timestamps as they are. Unsorted input silently produces wrong values.
    Unchecked,
    /// Fail with [`AlignError::UnsortedInput`] if the timestamps decrease anywhere.
    #[default]
    Validate,
    /// Stable sort of the cleaned samples by their timestamps.
    Sort,
}

/// Alignment settings.
#[derive(Builder, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AlignSettings<T> {
    /// Additional sentinel values that mark a measurement as missing.
    #[builder(default)]
    #[serde(default)]
    pub fill_values: FillValues<T>,

    /// Ordering treatment of the secondary timestamps.
    #[builder(default)]
    #[serde(default)]
    pub sort_policy: SortPolicy,
}

/// The result of an alignment, all three vectors have the same length.
///
/// Index `i` of every vector refers to the `i`-th valid sample of the primary signal.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AlignedPair<T>
where
    T: fXX,
{
    timestamps: DVector<T>,
    values: DVector<T>,
    interpolated: DVector<T>,
}

impl<T> AlignedPair<T>
where
    T: fXX,
{
    /// Returns the secondary signal interpolated at [`AlignedPair::timestamps`].
    pub fn interpolated(&self) -> &DVector<T> {
        &self.interpolated
    }

    /// Consumes the pair and returns `(timestamps, values, interpolated)`.
    pub fn into_parts(self) -> (DVector<T>, DVector<T>, DVector<T>) {
        (self.timestamps, self.values, self.interpolated)
    }

    /// Returns `true` if the primary signal had no valid samples.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Returns the number of valid primary samples.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns the timestamps of the valid primary samples.
    pub fn timestamps(&self) -> &DVector<T> {
        &self.timestamps
    }

    /// Returns the valid primary samples.
    pub fn values(&self) -> &DVector<T> {
        &self.values
    }
}

/// Aligns secondary signals onto primary signals using a fixed set of [`AlignSettings`].
#[derive(Clone, Debug, Default)]
pub struct Aligner<T> {
    settings: AlignSettings<T>,
}

impl<T> Aligner<T>
where
    T: fXX,
{
    /// Interpolate `secondary` at every valid timestamp of `primary`.
    ///
    /// All three inputs share the same indexing, i.e. `primary[i]` and `secondary[i]` were
    /// both recorded (or not) at `time_axis[i]`.
    ///
    /// A valid primary sample at a non-finite timestamp is kept, and its interpolated value
    /// is NaN.
    pub fn align(
        &self,
        time_axis: &[T],
        primary: &[T],
        secondary: &[T],
    ) -> Result<AlignedPair<T>, AlignError<T>> {
        if (time_axis.len() != primary.len()) || (time_axis.len() != secondary.len()) {
            return Err(AlignError::ShapeMismatch {
                time: time_axis.len(),
                primary: primary.len(),
                secondary: secondary.len(),
            });
        }

        let start = Instant::now();

        let (primary_t, primary_v) = self.clean(time_axis, primary);
        let (mut secondary_t, mut secondary_v) = self.knots(time_axis, secondary);

        if secondary_t.is_empty() {
            return Err(AlignError::InsufficientData);
        }

        match self.settings.sort_policy {
            SortPolicy::Unchecked => (),
            SortPolicy::Validate => check_sorted(&secondary_t)?,
            SortPolicy::Sort => {
                let mut series = SampleSeries::from_iterator(
                    zip_eq(&secondary_t, &secondary_v).map(|(t, v)| Sample::new(*t, *v)),
                );

                if !series.is_sorted_by_timestamp() {
                    trace!("align: sorting {} secondary samples", series.len());

                    series.sort_by_timestamp();

                    secondary_t = series.timestamps();
                    secondary_v = series.values();
                }
            }
        }

        let interpolated = interp_many(&primary_t, &secondary_t, &secondary_v)
            .ok_or(AlignError::InsufficientData)?;

        debug!(
            "align: {} primary / {} secondary valid samples out of {} in {:.3} ms",
            primary_t.len(),
            secondary_t.len(),
            time_axis.len(),
            start.elapsed().as_secs_f64() * 1e3
        );

        Ok(AlignedPair {
            timestamps: DVector::from_vec(primary_t),
            values: DVector::from_vec(primary_v),
            interpolated: DVector::from_vec(interpolated),
        })
    }

    /// Returns the timestamps and values of all valid entries of `signal`, in order.
    fn clean(&self, time_axis: &[T], signal: &[T]) -> (Vec<T>, Vec<T>) {
        zip_eq(time_axis, signal)
            .filter(|(_, value)| !self.settings.fill_values.is_missing(value))
            .map(|(t, v)| (*t, *v))
            .unzip()
    }

    /// Same as [`Aligner::clean`], but also drops entries without a valid timestamp.
    fn knots(&self, time_axis: &[T], signal: &[T]) -> (Vec<T>, Vec<T>) {
        zip_eq(time_axis, signal)
            .filter(|(t, value)| t.is_valid() && !self.settings.fill_values.is_missing(value))
            .map(|(t, v)| (*t, *v))
            .unzip()
    }

    /// Create a new [`Aligner`].
    pub fn new(settings: AlignSettings<T>) -> Self {
        Self { settings }
    }
}

/// Interpolate `secondary` at every valid timestamp of `primary`, using the default
/// [`AlignSettings`].
///
/// ```
/// # use glider_align::align::align;
/// let nan = f64::NAN;
/// let pair = align(
///     &[0.0, 1.0, 2.0, 3.0, 4.0],
///     &[10.0, nan, 30.0, 40.0, nan],
///     &[nan, 100.0, nan, 300.0, 400.0],
/// )
/// .unwrap();
///
/// assert_eq!(pair.timestamps().as_slice(), &[0.0, 2.0, 3.0]);
/// assert_eq!(pair.values().as_slice(), &[10.0, 30.0, 40.0]);
/// assert_eq!(pair.interpolated().as_slice(), &[100.0, 200.0, 300.0]);
/// ```
///
/// If the time axis repeats a timestamp, the secondary value recorded last at that
/// timestamp is used for every primary sample sharing it. Aligning a signal with itself
/// then no longer reproduces the signal:
///
/// ```
/// # use glider_align::align::align;
/// let signal = [1.0, 2.0, 3.0, 4.0];
/// let pair = align(&[0.0, 1.0, 1.0, 2.0], &signal, &signal).unwrap();
///
/// assert_eq!(pair.interpolated().as_slice(), &[1.0, 3.0, 3.0, 4.0]);
/// ```
pub fn align<T>(
    time_axis: &[T],
    primary: &[T],
    secondary: &[T],
) -> Result<AlignedPair<T>, AlignError<T>>
where
    T: fXX,
{
    Aligner::default().align(time_axis, primary, secondary)
}

fn check_sorted<T>(timestamps: &[T]) -> Result<(), AlignError<T>>
where
    T: fXX,
{
    timestamps
        .windows(2)
        .enumerate()
        .try_for_each(|(idx, pair)| match pair[0].partial_cmp(&pair[1]) {
            Some(Ordering::Less) | Some(Ordering::Equal) => Ok(()),
            _ => Err(AlignError::UnsortedInput {
                index: idx + 1,
                previous: pair[0],
                next: pair[1],
            }),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    const NAN: f64 = f64::NAN;

    #[test]
    fn test_align() {
        let pair = align(
            &[0.0, 1.0, 2.0, 3.0, 4.0],
            &[10.0, NAN, 30.0, 40.0, NAN],
            &[NAN, 100.0, NAN, 300.0, 400.0],
        )
        .unwrap();

        assert!(pair.len() == 3);
        assert!(pair.timestamps().as_slice() == [0.0, 2.0, 3.0]);
        assert!(pair.values().as_slice() == [10.0, 30.0, 40.0]);
        assert!(pair.interpolated().as_slice() == [100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_align_errors() {
        assert!(
            align(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0], &[NAN, NAN, NAN]).unwrap_err()
                == AlignError::InsufficientData
        );

        assert!(
            align(&[0.0, 1.0, 2.0], &[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err()
                == AlignError::ShapeMismatch {
                    time: 3,
                    primary: 2,
                    secondary: 3
                }
        );

        assert!(
            align(&[0.0, 2.0, 1.0, 3.0], &[1.0; 4], &[5.0, 6.0, 7.0, 8.0]).unwrap_err()
                == AlignError::UnsortedInput {
                    index: 2,
                    previous: 2.0,
                    next: 1.0
                }
        );

        // Primary without any valid samples is not an error.
        let pair = align(&[0.0, 1.0], &[NAN, NAN], &[1.0, 2.0]).unwrap();

        assert!(pair.is_empty());
    }

    #[test]
    fn test_align_sort_policy() {
        // Missing entries hide the disorder of the secondary signal from the checks.
        let time_axis = [0.0, 3.0, 1.0, 2.0];
        let primary = [0.0, 1.0, 2.0, NAN];
        let secondary = [0.0, 30.0, NAN, 20.0];

        let sorted = Aligner::new(
            AlignSettingsBuilder::default()
                .sort_policy(SortPolicy::Sort)
                .build()
                .unwrap(),
        )
        .align(&time_axis, &primary, &secondary)
        .unwrap();

        assert!(sorted.timestamps().as_slice() == [0.0, 3.0, 1.0]);
        assert!(sorted.interpolated().as_slice() == [0.0, 30.0, 10.0]);

        let unchecked = Aligner::new(
            AlignSettingsBuilder::default()
                .sort_policy(SortPolicy::Unchecked)
                .build()
                .unwrap(),
        )
        .align(&time_axis, &primary, &secondary)
        .unwrap();

        // The knots [0, 3, 2] are used as they are, so t = 3 falls past the last knot and
        // picks up its value.
        assert!(unchecked.timestamps().as_slice() == [0.0, 3.0, 1.0]);
        assert!(unchecked.interpolated().as_slice() == [0.0, 20.0, 10.0]);

        assert!(matches!(
            align(&time_axis, &primary, &secondary),
            Err(AlignError::UnsortedInput { index: 2, .. })
        ));
    }

    #[test]
    fn test_align_nan_timestamps() {
        let time_axis = [0.0, NAN, 1.0, 2.0, 3.0];
        let primary = [1.0; 5];
        let secondary = [0.0, 99.0, 10.0, 20.0, 30.0];

        for policy in [SortPolicy::Unchecked, SortPolicy::Validate, SortPolicy::Sort] {
            let pair = Aligner::new(
                AlignSettingsBuilder::default()
                    .sort_policy(policy)
                    .build()
                    .unwrap(),
            )
            .align(&time_axis, &primary, &secondary)
            .unwrap();

            assert!(pair.len() == 5);
            assert!(pair.timestamps()[1].is_nan());
            assert!(pair.interpolated()[1].is_nan());
            assert!(
                pair.interpolated()
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| *idx != 1)
                    .map(|(_, v)| *v)
                    .collect::<Vec<f64>>()
                    == vec![0.0, 10.0, 20.0, 30.0]
            );
        }

        // Descending axis where every fifth tick is missing.
        let time_axis = (0..64)
            .map(|idx| if idx % 5 == 0 { NAN } else { (63 - idx) as f64 })
            .collect::<Vec<f64>>();
        let primary = [1.0; 64];
        let secondary = time_axis
            .iter()
            .map(|t| if t.is_nan() { 1e6 } else { 2.0 * t })
            .collect::<Vec<f64>>();

        let sorted = Aligner::new(
            AlignSettingsBuilder::default()
                .sort_policy(SortPolicy::Sort)
                .build()
                .unwrap(),
        )
        .align(&time_axis, &primary, &secondary)
        .unwrap();

        assert!(sorted.len() == 64);
        assert!(
            zip_eq(sorted.timestamps().iter(), sorted.interpolated().iter()).all(|(t, v)| {
                if t.is_nan() {
                    v.is_nan()
                } else {
                    *v == 2.0 * t
                }
            })
        );

        assert!(matches!(
            align(&time_axis, &primary, &secondary),
            Err(AlignError::UnsortedInput { index: 1, .. })
        ));

        assert!(
            Aligner::new(
                AlignSettingsBuilder::default()
                    .sort_policy(SortPolicy::Unchecked)
                    .build()
                    .unwrap(),
            )
            .align(&time_axis, &primary, &secondary)
            .is_ok()
        );
    }

    #[test]
    fn test_align_fill_values() {
        let aligner = Aligner::new(
            AlignSettingsBuilder::default()
                .fill_values(FillValues::erddap())
                .build()
                .unwrap(),
        );

        let pair = aligner
            .align(
                &[0.0, 1.0, 2.0, 3.0],
                &[1.0, -2.147483647e9, 3.0, 4.0],
                &[-2.147483647e9, 10.0, NAN, 30.0],
            )
            .unwrap();

        assert!(pair.timestamps().as_slice() == [0.0, 2.0, 3.0]);
        assert!(pair.interpolated().as_slice() == [10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_align_identity() {
        let time_axis = [0.0f32, 1.5, 2.0, 4.0, 7.0, 7.5];
        let signal = [3.0f32, f32::NAN, -1.25, 8.0, f32::NAN, 2.0];

        let pair = align(&time_axis, &signal, &signal).unwrap();

        assert!(pair.values() == pair.interpolated());
    }

    #[test]
    fn test_align_random() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);

        for _ in 0..64 {
            let length = rng.random_range(1..256);

            let mut time_axis = (0..length)
                .map(|_| rng.random_range(0.0..1e4))
                .collect::<Vec<f64>>();

            time_axis.sort_by(|a, b| a.partial_cmp(b).unwrap());

            let mut signal = || {
                (0..length)
                    .map(|_| {
                        if rng.random_bool(0.3) {
                            NAN
                        } else {
                            rng.random_range(-50.0..50.0)
                        }
                    })
                    .collect::<Vec<f64>>()
            };

            let primary = signal();
            let mut secondary = signal();

            secondary[0] = 1.0;

            let pair = align(&time_axis, &primary, &secondary).unwrap();

            let expected_t = zip_eq(&time_axis, &primary)
                .filter(|(_, v)| v.is_finite())
                .map(|(t, _)| *t)
                .collect::<Vec<f64>>();

            assert!(pair.len() == primary.iter().filter(|v| v.is_finite()).count());
            assert!(pair.values().len() == pair.len());
            assert!(pair.interpolated().len() == pair.len());
            assert!(pair.timestamps().as_slice() == expected_t.as_slice());

            let (lo, hi) = secondary
                .iter()
                .filter(|v| v.is_finite())
                .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

            assert!(
                pair.interpolated()
                    .iter()
                    .all(|v| (lo - 1e-9 <= *v) && (*v <= hi + 1e-9))
            );
        }
    }

    #[test]
    fn test_align_settings_json5() {
        let settings = serde_json5::from_str::<AlignSettings<f64>>(
            "{ fill_values: [-2147483647.0], sort_policy: 'Sort' }",
        )
        .unwrap();

        assert!(settings.sort_policy == SortPolicy::Sort);
        assert!(settings.fill_values == FillValues::erddap());

        let defaults = serde_json5::from_str::<AlignSettings<f64>>("{}").unwrap();

        assert!(defaults == AlignSettings::default());
    }
}
