//! Decoded KLV payload values (component C1: the primitive decoder).

use chrono::{DateTime, Utc};

use crate::type_code::TypeCode;

/// A decoded record payload.
///
/// Every numeric variant stores a flat `Vec`; when a record's
/// `element_size` is a multiple of the primitive size (e.g. GPS5's
/// `element_size = 20` for a 4-byte `l` type, five `i32`s per sample) the
/// flat vector represents `repeat` rows of `width` columns each, and
/// [`Value::rows_f64`] reshapes it. A record with `element_size` equal to
/// exactly the primitive size is just `repeat` scalars, i.e. `width == 1`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `b`
    I8(Vec<i8>),
    /// `B`
    U8(Vec<u8>),
    /// `c`, trimmed of trailing NULs and decoded lossily as UTF-8.
    Str(String),
    /// `d`
    F64(Vec<f64>),
    /// `f`
    F32(Vec<f32>),
    /// `F`, one 4-character token per element.
    FourCC(Vec<String>),
    /// `G`, one 16-byte opaque id per element.
    Guid(Vec<[u8; 16]>),
    /// `j`
    I64(Vec<i64>),
    /// `J`
    U64(Vec<u64>),
    /// `l`
    I32(Vec<i32>),
    /// `L`
    U32(Vec<u32>),
    /// `q`, already divided by 2^16.
    Fixed32(Vec<f64>),
    /// `Q`, already divided by 2^32.
    Fixed64(Vec<f64>),
    /// `s`
    I16(Vec<i16>),
    /// `S`
    U16(Vec<u16>),
    /// `U`, parsed from the on-wire `yymmddhhmmss.sss` format.
    Date(DateTime<Utc>),
    /// `?`, one tuple of heterogeneous fields per element, per the active `TYPE` schema.
    Complex(Vec<Vec<Value>>),
}

impl Value {
    /// The [`TypeCode`] this value was decoded from.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Value::I8(_) => TypeCode::I8,
            Value::U8(_) => TypeCode::U8,
            Value::Str(_) => TypeCode::Char,
            Value::F64(_) => TypeCode::F64,
            Value::F32(_) => TypeCode::F32,
            Value::FourCC(_) => TypeCode::FourCC,
            Value::Guid(_) => TypeCode::Guid,
            Value::I64(_) => TypeCode::I64,
            Value::U64(_) => TypeCode::U64,
            Value::I32(_) => TypeCode::I32,
            Value::U32(_) => TypeCode::U32,
            Value::Fixed32(_) => TypeCode::Fixed32,
            Value::Fixed64(_) => TypeCode::Fixed64,
            Value::I16(_) => TypeCode::I16,
            Value::U16(_) => TypeCode::U16,
            Value::Date(_) => TypeCode::Date,
            Value::Complex(_) => TypeCode::Complex,
        }
    }

    /// Number of scalar elements in a flat numeric value (not rows).
    pub fn len(&self) -> usize {
        match self {
            Value::I8(v) => v.len(),
            Value::U8(v) => v.len(),
            Value::Str(_) => 1,
            Value::F64(v) => v.len(),
            Value::F32(v) => v.len(),
            Value::FourCC(v) => v.len(),
            Value::Guid(v) => v.len(),
            Value::I64(v) => v.len(),
            Value::U64(v) => v.len(),
            Value::I32(v) => v.len(),
            Value::U32(v) => v.len(),
            Value::Fixed32(v) => v.len(),
            Value::Fixed64(v) => v.len(),
            Value::I16(v) => v.len(),
            Value::U16(v) => v.len(),
            Value::Date(_) => 1,
            Value::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens any numeric variant to `f64`, widening as needed. Returns
    /// `None` for `Str`, `FourCC`, `Guid`, `Date` and `Complex`, which have
    /// no single numeric interpretation.
    pub fn as_f64_flat(&self) -> Option<Vec<f64>> {
        Some(match self {
            Value::I8(v) => v.iter().map(|&x| x as f64).collect(),
            Value::U8(v) => v.iter().map(|&x| x as f64).collect(),
            Value::F64(v) => v.clone(),
            Value::F32(v) => v.iter().map(|&x| x as f64).collect(),
            Value::I64(v) => v.iter().map(|&x| x as f64).collect(),
            Value::U64(v) => v.iter().map(|&x| x as f64).collect(),
            Value::I32(v) => v.iter().map(|&x| x as f64).collect(),
            Value::U32(v) => v.iter().map(|&x| x as f64).collect(),
            Value::Fixed32(v) => v.clone(),
            Value::Fixed64(v) => v.clone(),
            Value::I16(v) => v.iter().map(|&x| x as f64).collect(),
            Value::U16(v) => v.iter().map(|&x| x as f64).collect(),
            Value::Str(_) | Value::FourCC(_) | Value::Guid(_) | Value::Date(_) | Value::Complex(_) => {
                return None
            }
        })
    }

    /// Reshapes a flat numeric value into `rows` of `width` columns each.
    /// Returns `None` if the flat length is not `rows * width`, or if the
    /// value has no numeric interpretation.
    pub fn rows_f64(&self, width: usize) -> Option<Vec<Vec<f64>>> {
        let flat = self.as_f64_flat()?;
        if width == 0 || flat.len() % width != 0 {
            return None;
        }
        Some(flat.chunks(width).map(|chunk| chunk.to_vec()).collect())
    }

    /// The first scalar element as `f64`, if this is a nonempty numeric value.
    pub fn first_f64(&self) -> Option<f64> {
        self.as_f64_flat()?.into_iter().next()
    }

    /// The payload as a string, for `Str` and `FourCC` (first token) variants.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            Value::FourCC(v) => v.first().map(|s| s.as_str()),
            _ => None,
        }
    }

    /// The decoded timestamp, for the `Date` variant.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(dt) => Some(*dt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reshapes_flat_vector_into_rows() {
        let v = Value::I32(vec![1, 2, 3, 4, 5, 6]);
        let rows = v.rows_f64(3).unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn rejects_non_divisible_width() {
        let v = Value::I32(vec![1, 2, 3, 4, 5]);
        assert!(v.rows_f64(3).is_none());
    }

    #[test]
    fn non_numeric_has_no_flat_form() {
        let v = Value::Str("hello".into());
        assert!(v.as_f64_flat().is_none());
    }
}
