//! Crate-local error type.
//!
//! Kept as a single flat enum (as opposed to per-module error types) so
//! callers can match on the taxonomy laid out in the GPMF parsing model:
//! truncated/malformed KLV headers, scale/shape mismatches when joining a
//! stream block, and the two "no data" cases raised by the GPS and IMU
//! materializers.

use std::path::PathBuf;

use crate::FourCC;

// PartialEq is implemented manually below because the `Io` variant wraps
// `std::io::Error`, which does not implement PartialEq.
/// Errors produced while scanning, joining or materializing GPMF data.
#[derive(Debug, thiserror::Error)]
pub enum GpmfError {
    /// A record header or payload extends past the end of the buffer.
    #[error("truncated record at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedRecord {
        /// Byte offset of the record header that could not be read in full.
        offset: usize,
        /// Number of bytes the record header/payload claimed to need.
        needed: usize,
        /// Number of bytes actually left in the buffer.
        available: usize,
    },

    /// A payload's stated length does not fit the primitive's element size.
    #[error("misaligned element size {element_size} for type '{type_code}'")]
    MisalignedSize {
        /// The type code the size was checked against.
        type_code: char,
        /// The `element_size` field read from the record header.
        element_size: u8,
    },

    /// `element_size * repeat` exceeds the bytes actually present.
    #[error("truncated payload: type '{type_code}' needs {needed} bytes, {available} available")]
    TruncatedPayload {
        /// The type code being decoded.
        type_code: char,
        /// Bytes required by `element_size * repeat`.
        needed: usize,
        /// Bytes actually available in the payload slice.
        available: usize,
    },

    /// The single-byte type code is not one of the 16 documented codes.
    #[error("unknown type code 0x{0:02x}")]
    UnknownType(u8),

    /// A `STRM` block's `SCAL` length does not match the data record's
    /// tuple arity.
    #[error("SCAL length {scal_len} does not match data arity {data_arity}")]
    ShapeMismatch {
        /// Length of the `SCAL` vector found in the block.
        scal_len: usize,
        /// Expected tuple width of the data record (5 for GPS5, 9 for GPS9, 3 for GYRO/ACCL).
        data_arity: usize,
    },

    /// Neither `GPS5` nor `GPS9` was present in a stream block.
    #[error("stream block has no GPS5 or GPS9 record")]
    NoGps,

    /// The expected data fourcc (`GYRO`, `ACCL`, ...) was absent from the block.
    #[error("stream block has no {0} record")]
    MissingData(FourCC),

    /// A data record was present with no sibling `SCAL` record.
    #[error("stream block has a data record but no SCAL record")]
    MissingScale,

    /// A `TYPE` record's declared schema could not be applied to the
    /// following complex-typed record.
    #[error("complex record with no preceding TYPE declaration in scope")]
    NoComplexSchema,

    /// A UTC datetime payload (`U`) could not be parsed as `yymmddhhmmss.sss`.
    #[error("invalid UTC datetime payload: {0:?}")]
    InvalidTimestamp(String),

    /// Payload bytes were not valid UTF-8 where strict decoding was requested.
    #[error("invalid UTF-8 in payload: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Underlying I/O failure (reading a raw GPMF file from disk, etc.).
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        /// The file being read, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for GpmfError {
    fn from(source: std::io::Error) -> Self {
        GpmfError::Io { path: None, source }
    }
}

impl PartialEq for GpmfError {
    fn eq(&self, other: &Self) -> bool {
        use GpmfError::*;
        match (self, other) {
            (
                TruncatedRecord { offset: a1, needed: a2, available: a3 },
                TruncatedRecord { offset: b1, needed: b2, available: b3 },
            ) => a1 == b1 && a2 == b2 && a3 == b3,
            (
                MisalignedSize { type_code: a1, element_size: a2 },
                MisalignedSize { type_code: b1, element_size: b2 },
            ) => a1 == b1 && a2 == b2,
            (
                TruncatedPayload { type_code: a1, needed: a2, available: a3 },
                TruncatedPayload { type_code: b1, needed: b2, available: b3 },
            ) => a1 == b1 && a2 == b2 && a3 == b3,
            (UnknownType(a), UnknownType(b)) => a == b,
            (
                ShapeMismatch { scal_len: a1, data_arity: a2 },
                ShapeMismatch { scal_len: b1, data_arity: b2 },
            ) => a1 == b1 && a2 == b2,
            (NoGps, NoGps) => true,
            (MissingData(a), MissingData(b)) => a == b,
            (MissingScale, MissingScale) => true,
            (NoComplexSchema, NoComplexSchema) => true,
            (InvalidTimestamp(a), InvalidTimestamp(b)) => a == b,
            (Utf8(a), Utf8(b)) => a == b,
            (Io { path: a1, source: a2 }, Io { path: b1, source: b2 }) => {
                a1 == b1 && a2.kind() == b2.kind()
            }
            _ => false,
        }
    }
}
