//! The unit of data exchanged between scrapers and the collector.
//!
//! Both status parsers emit [`Measurement`] instances: a metric name, the raw
//! value exactly as it appeared in the report, and the label set identifying
//! where it came from. The collector normalizes the value and folds it into
//! the series cache.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::normalize;

/// A label set, keyed by label name.
///
/// Ordered so that two label sets with the same pairs compare and hash
/// identically regardless of insertion order.
pub type Labels = BTreeMap<String, String>;

/// Return a copy of `base` with `key` set to `value`.
///
/// Structural labels discovered while walking a nested report overwrite any
/// existing entry of the same name, they never merge with it.
#[must_use]
pub fn with_label(base: &Labels, key: &str, value: impl Into<String>) -> Labels {
    let mut labels = base.clone();
    labels.insert(key.to_string(), value.into());
    labels
}

/// A scraped value prior to normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// The field was present but carried no value.
    None,
    /// Signed 8-bit integer.
    I8(i8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Boolean flag.
    Bool(bool),
    /// Free-form string, typically a peer state such as `up`.
    Str(String),
}

macro_rules! raw_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RawValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

raw_from!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => Str,
);

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl<T> From<Option<T>> for RawValue
where
    T: Into<RawValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

impl TryFrom<&Value> for RawValue {
    type Error = normalize::Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::None),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(Self::U64(u))
                } else if let Some(i) = n.as_i64() {
                    Ok(Self::I64(i))
                } else {
                    n.as_f64()
                        .map(Self::F64)
                        .ok_or(normalize::Error::UnsupportedType("number"))
                }
            }
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Array(_) => Err(normalize::Error::UnsupportedType("array")),
            Value::Object(_) => Err(normalize::Error::UnsupportedType("object")),
        }
    }
}

/// A single named, labeled, scraped value.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Metric name without the exporter namespace.
    pub name: &'static str,
    /// The value as scraped.
    pub value: RawValue,
    /// Endpoint labels plus any structural labels.
    pub labels: Labels,
}

impl Measurement {
    /// Create a new [`Measurement`].
    #[must_use]
    pub fn new(name: &'static str, value: impl Into<RawValue>, labels: &Labels) -> Self {
        Self {
            name,
            value: value.into(),
            labels: labels.clone(),
        }
    }
}
