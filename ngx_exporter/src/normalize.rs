//! Convert raw scraped values into gauge values.
//!
//! Prometheus gauges are 64-bit floats. Every [`RawValue`] is either mapped
//! onto a finite `f64` or rejected; nothing non-finite is allowed through.

use crate::measurement::RawValue;

/// Errors produced by [`normalize`]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The value was absent.
    #[error("Unable to convert metric value: value is empty")]
    EmptyValue,
    /// The value was NaN or infinite.
    #[error("Unable to convert metric value: value is NaN or Inf")]
    NonFiniteValue,
    /// The value has a shape that cannot be expressed as a gauge.
    #[error("Unable to convert metric value: unsupported type {0}")]
    UnsupportedType(&'static str),
}

/// Convert `raw` into a finite `f64`.
///
/// Unsigned 64-bit values at or above 2^63 clamp to `i64::MAX`, strings map
/// to `1.0` when they case-insensitively equal `up` and `0.0` otherwise.
///
/// # Errors
///
/// Returns [`Error::EmptyValue`] for [`RawValue::None`] and
/// [`Error::NonFiniteValue`] for a NaN or infinite float of either width.
pub fn normalize(raw: &RawValue) -> Result<f64, Error> {
    let value = match raw {
        RawValue::None => return Err(Error::EmptyValue),
        RawValue::I8(v) => f64::from(*v),
        RawValue::I16(v) => f64::from(*v),
        RawValue::I32(v) => f64::from(*v),
        RawValue::I64(v) => *v as f64,
        RawValue::U8(v) => f64::from(*v),
        RawValue::U16(v) => f64::from(*v),
        RawValue::U32(v) => f64::from(*v),
        RawValue::U64(v) => match i64::try_from(*v) {
            Ok(v) => v as f64,
            Err(_) => i64::MAX as f64,
        },
        RawValue::F32(v) => finite(f64::from(*v))?,
        RawValue::F64(v) => finite(*v)?,
        RawValue::Bool(v) => {
            if *v {
                1.0
            } else {
                0.0
            }
        }
        RawValue::Str(s) => {
            if s.eq_ignore_ascii_case("up") {
                1.0
            } else {
                0.0
            }
        }
    };
    Ok(value)
}

fn finite(v: f64) -> Result<f64, Error> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(Error::NonFiniteValue)
    }
}
