//! A single KLV record: `(key, length_triple, payload_bytes)` plus the
//! primitive decode operation (component C1) and complex-type decode
//! (component C2).

use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use fixed::types::{I16F16, I32F32};
use std::io::Cursor;

use crate::error::GpmfError;
use crate::fourcc::FourCC;
use crate::type_code::TypeCode;
use crate::value::Value;

/// A KLV record borrowed from the caller's buffer.
///
/// `payload` is exactly `element_size * repeat` bytes — the pad bytes that
/// follow it in the wire format are not included and are skipped by the
/// scanner when it advances past this record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    pub key: FourCC,
    pub type_byte: u8,
    pub element_size: u8,
    pub repeat: u16,
    pub payload: &'a [u8],
}

impl<'a> Record<'a> {
    /// True if this record is a container (`type byte == 0`), i.e. its
    /// payload is itself a sequence of KLV records rather than decodable
    /// data.
    pub fn is_container(&self) -> bool {
        self.type_byte == 0
    }

    /// The record's [`TypeCode`], if the type byte is one of the 16
    /// documented codes (or the nested-container sentinel).
    pub fn type_code(&self) -> Result<TypeCode, GpmfError> {
        TypeCode::try_from(self.type_byte).map_err(|_| GpmfError::UnknownType(self.type_byte))
    }

    /// Column width of this record's data: `element_size / primitive_size`.
    /// `1` for a plain scalar-per-sample record, `5` for GPS5, `9` for
    /// GPS9, `3` for GYRO/ACCL, and so on.
    pub fn width(&self) -> Result<usize, GpmfError> {
        let type_code = self.type_code()?;
        let prim_size = type_code
            .primitive_size()
            .ok_or(GpmfError::UnknownType(self.type_byte))?;
        if prim_size == 0 || self.element_size as usize % prim_size != 0 {
            return Err(GpmfError::MisalignedSize {
                type_code: type_code.as_char(),
                element_size: self.element_size,
            });
        }
        Ok(self.element_size as usize / prim_size)
    }

    /// Decodes this record's payload (component C1), resolving a `?`
    /// complex type against `schema` (component C2) if needed.
    ///
    /// Precondition: `!self.is_container()`. A container's payload is a
    /// nested KLV sequence, not decodable data; see
    /// [`crate::scanner::Records::children`].
    pub fn decode(&self, schema: Option<&[TypeCode]>) -> Result<Value, GpmfError> {
        let type_code = self.type_code()?;
        if type_code == TypeCode::Nested {
            return Err(GpmfError::UnknownType(0));
        }
        decode_payload(self.payload, type_code, self.element_size, schema)
    }
}

/// Decodes a raw payload given its declared type and element size
/// (component C1). `schema` is the current complex-type schema installed
/// by the most recent `TYPE` record in the enclosing container scope
/// (component C2); it is required only when `type_code == TypeCode::Complex`.
pub fn decode_payload(
    payload: &[u8],
    type_code: TypeCode,
    element_size: u8,
    schema: Option<&[TypeCode]>,
) -> Result<Value, GpmfError> {
    match type_code {
        TypeCode::Char => Ok(Value::Str(decode_trimmed_string(payload))),
        TypeCode::Date => Ok(Value::Date(decode_utc_timestamp(payload)?)),
        TypeCode::Complex => decode_complex(payload, element_size, schema),
        TypeCode::Nested => Err(GpmfError::UnknownType(0)),
        _ => decode_numeric(payload, type_code, element_size),
    }
}

/// Trims trailing NUL bytes and decodes the remainder as UTF-8, replacing
/// invalid sequences rather than failing (GPMF string fields are ASCII in
/// practice but this is defensive against stray high bytes).
fn decode_trimmed_string(payload: &[u8]) -> String {
    let trimmed = match payload.iter().position(|&b| b == 0) {
        Some(end) => &payload[..end],
        None => payload,
    };
    String::from_utf8_lossy(trimmed).into_owned()
}

/// Decodes a 16-byte `yymmddhhmmss.sss` payload into a UTC timestamp. A
/// two-digit year `yy` is interpreted as `2000 + yy`, per the GPMF spec.
fn decode_utc_timestamp(payload: &[u8]) -> Result<DateTime<Utc>, GpmfError> {
    if payload.len() < 16 {
        return Err(GpmfError::TruncatedPayload {
            type_code: 'U',
            needed: 16,
            available: payload.len(),
        });
    }
    let raw = std::str::from_utf8(&payload[..16]).map_err(GpmfError::Utf8)?;
    let full = format!("20{raw}");
    let naive = NaiveDateTime::parse_from_str(&full, "%Y%m%d%H%M%S%.3f")
        .map_err(|_| GpmfError::InvalidTimestamp(raw.to_owned()))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Decodes the schema-driven `?` complex type: `repeat` tuples, each with
/// one field per code in `schema`, fields decoded independently as single
/// elements (component C2).
fn decode_complex(
    payload: &[u8],
    element_size: u8,
    schema: Option<&[TypeCode]>,
) -> Result<Value, GpmfError> {
    let schema = schema.ok_or(GpmfError::NoComplexSchema)?;
    let tuple_size: usize = schema
        .iter()
        .map(|code| code.primitive_size().unwrap_or(0))
        .sum();
    if tuple_size == 0 || element_size as usize % tuple_size != 0 {
        return Err(GpmfError::MisalignedSize {
            type_code: '?',
            element_size,
        });
    }
    let repeat = payload.len() / tuple_size.max(1);
    let mut cursor = Cursor::new(payload);
    let mut tuples = Vec::with_capacity(repeat);
    for _ in 0..repeat {
        let mut fields = Vec::with_capacity(schema.len());
        for code in schema {
            let size = code.primitive_size().unwrap_or(0);
            let start = cursor.position() as usize;
            let end = start + size;
            let field_bytes = payload.get(start..end).ok_or(GpmfError::TruncatedPayload {
                type_code: code.as_char(),
                needed: size,
                available: payload.len().saturating_sub(start),
            })?;
            fields.push(decode_numeric_scalar(field_bytes, *code)?);
            cursor.set_position(end as u64);
        }
        tuples.push(fields);
    }
    Ok(Value::Complex(tuples))
}

/// Decodes a flat numeric payload (everything except `c`, `U`, `?`, `\0`)
/// into the matching [`Value`] variant.
fn decode_numeric(payload: &[u8], type_code: TypeCode, element_size: u8) -> Result<Value, GpmfError> {
    let prim_size = type_code
        .primitive_size()
        .ok_or(GpmfError::UnknownType(type_code.as_byte()))?;
    if prim_size == 0 || element_size as usize % prim_size != 0 {
        return Err(GpmfError::MisalignedSize {
            type_code: type_code.as_char(),
            element_size,
        });
    }
    if payload.len() % prim_size != 0 {
        return Err(GpmfError::TruncatedPayload {
            type_code: type_code.as_char(),
            needed: payload.len() - payload.len() % prim_size + prim_size,
            available: payload.len(),
        });
    }
    let count = payload.len() / prim_size;
    let mut cursor = Cursor::new(payload);

    macro_rules! read_all {
        ($reader:expr) => {{
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push($reader(&mut cursor)?);
            }
            out
        }};
    }

    Ok(match type_code {
        TypeCode::I8 => Value::I8(read_all!(|c: &mut Cursor<&[u8]>| c.read_i8())),
        TypeCode::U8 => Value::U8(read_all!(|c: &mut Cursor<&[u8]>| c.read_u8())),
        TypeCode::I16 => Value::I16(read_all!(|c: &mut Cursor<&[u8]>| c.read_i16::<BigEndian>())),
        TypeCode::U16 => Value::U16(read_all!(|c: &mut Cursor<&[u8]>| c.read_u16::<BigEndian>())),
        TypeCode::I32 => Value::I32(read_all!(|c: &mut Cursor<&[u8]>| c.read_i32::<BigEndian>())),
        TypeCode::U32 => Value::U32(read_all!(|c: &mut Cursor<&[u8]>| c.read_u32::<BigEndian>())),
        TypeCode::I64 => Value::I64(read_all!(|c: &mut Cursor<&[u8]>| c.read_i64::<BigEndian>())),
        TypeCode::U64 => Value::U64(read_all!(|c: &mut Cursor<&[u8]>| c.read_u64::<BigEndian>())),
        TypeCode::F32 => Value::F32(read_all!(|c: &mut Cursor<&[u8]>| c.read_f32::<BigEndian>())),
        TypeCode::F64 => Value::F64(read_all!(|c: &mut Cursor<&[u8]>| c.read_f64::<BigEndian>())),
        TypeCode::Fixed32 => {
            let raw: Vec<i32> = read_all!(|c: &mut Cursor<&[u8]>| c.read_i32::<BigEndian>());
            Value::Fixed32(
                raw.into_iter()
                    .map(|bits| I16F16::from_bits(bits).to_num::<f64>())
                    .collect(),
            )
        }
        TypeCode::Fixed64 => {
            let raw: Vec<i64> = read_all!(|c: &mut Cursor<&[u8]>| c.read_i64::<BigEndian>());
            Value::Fixed64(
                raw.into_iter()
                    .map(|bits| I32F32::from_bits(bits).to_num::<f64>())
                    .collect(),
            )
        }
        TypeCode::FourCC => {
            let mut out = Vec::with_capacity(count);
            for chunk in payload.chunks_exact(4) {
                out.push(String::from_utf8_lossy(chunk).into_owned());
            }
            Value::FourCC(out)
        }
        TypeCode::Guid => {
            let mut out = Vec::with_capacity(count);
            for chunk in payload.chunks_exact(16) {
                let mut id = [0u8; 16];
                id.copy_from_slice(chunk);
                out.push(id);
            }
            Value::Guid(out)
        }
        TypeCode::Char | TypeCode::Date | TypeCode::Complex | TypeCode::Nested => unreachable!(
            "decode_numeric is only called for primitive numeric type codes"
        ),
    })
}

/// Decodes a single scalar element for use inside a complex-type tuple.
fn decode_numeric_scalar(bytes: &[u8], type_code: TypeCode) -> Result<Value, GpmfError> {
    decode_numeric(bytes, type_code, bytes.len() as u8)
}
