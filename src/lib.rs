#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod align;
pub mod series;
pub mod table;
pub mod transect;

use align::AlignError;
use nalgebra::Scalar;
use num_traits::{Float, FromPrimitive};
use series::{Observable, SeriesError};
use std::{
    fmt::{Debug, Display},
    iter::Sum,
};
use table::{TableError, schema::SchemaError};
use thiserror::Error;

/// Generic container type for errors.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum GliderError<T> {
    #[error("alignment error")]
    Align(#[from] AlignError<T>),
    #[error("series error")]
    Series(#[from] SeriesError),
    #[error("schema error")]
    Schema(#[from] SchemaError),
    #[error("table error")]
    Table(#[from] TableError),
    #[error("unknown field \"{0}\"")]
    UnknownField(String),
}

/// A trait that describes a generic floating point numbers within the **glider-align** crate.
/// In practical terms this trait is only used for the f32/f64 types.
#[allow(non_camel_case_types)]
pub trait fXX:
    'static
    + Copy
    + Debug
    + Default
    + Display
    + Float
    + FromPrimitive
    + Observable
    + Scalar
    + Send
    + Sum
    + Sync
{
}

impl fXX for f32 {}
impl fXX for f64 {}
