//! The lazy KLV scanner (component C3) and the type registry it threads
//! through nested scopes (component C2).
//!
//! [`Records`] walks one container scope at a time: a flat buffer for the
//! top level, or a single record's payload when recursing into a `\0`
//! (nested) record. It never recurses on its own — callers pull children
//! explicitly via [`Records::children`] — so a deeply nested file never
//! costs more stack or heap than the caller actually asks to see.

use tracing::{debug, trace, warn};

use crate::error::GpmfError;
use crate::fourcc::FourCC;
use crate::record::Record;
use crate::type_code::TypeCode;

/// How the scanner behaves when it hits malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Stop iteration and surface a truncated-tail or unknown-type
    /// condition as an `Err` from `next()`.
    #[default]
    Strict,
    /// Stop iteration silently on a truncated tail; skip an
    /// unknown-typed record (advancing past its padded length) rather
    /// than failing the whole scan.
    Lenient,
}

const HEADER_LEN: usize = 8;

/// A lazy iterator over the KLV records in one container scope.
///
/// Construct one with [`iter_records`] for a top-level buffer, or via
/// [`Records::children`] to descend into a nested record's payload.
pub struct Records<'a> {
    buf: &'a [u8],
    pos: usize,
    mode: Mode,
    /// The complex-type schema declared by the most recent `TYPE` record
    /// seen *in this scope*. Reset to `None` on every fresh [`Records`]
    /// (component C2's scope rule: a nested container starts with no
    /// inherited schema).
    schema: Option<Vec<TypeCode>>,
}

/// Begins a lazy scan of `buf` as a top-level sequence of KLV records.
pub fn iter_records(buf: &[u8], mode: Mode) -> Records<'_> {
    Records {
        buf,
        pos: 0,
        mode,
        schema: None,
    }
}

impl<'a> Records<'a> {
    /// The complex-type schema currently installed in this scope, if a
    /// `TYPE` record has been seen and consumed.
    pub fn current_schema(&self) -> Option<&[TypeCode]> {
        self.schema.as_deref()
    }

    /// Descends into `record`'s payload as a fresh scope. Only meaningful
    /// when `record.is_container()`; an empty iterator is returned
    /// otherwise.
    pub fn children(&self, record: &Record<'a>) -> Records<'a> {
        let buf = if record.is_container() { record.payload } else { &[] };
        Records {
            buf,
            pos: 0,
            mode: self.mode,
            schema: None,
        }
    }

    /// Reads one record header plus its unpadded payload from `buf[pos..]`,
    /// without advancing `self.pos`. Returns the record and the offset of
    /// the byte following its (possibly padded) payload.
    fn read_one(&self, pos: usize) -> Result<Option<(Record<'a>, usize)>, GpmfError> {
        let remaining = self.buf.len() - pos;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < HEADER_LEN {
            return Err(GpmfError::TruncatedRecord {
                offset: pos,
                needed: HEADER_LEN,
                available: remaining,
            });
        }
        let header = &self.buf[pos..pos + HEADER_LEN];
        let key_bytes: [u8; 4] = header[0..4].try_into().expect("slice is 4 bytes");
        if FourCC::is_padding(&key_bytes) {
            return Ok(None);
        }
        let type_byte = header[4];
        let element_size = header[5];
        let repeat = u16::from_be_bytes([header[6], header[7]]);

        let payload_len = element_size as usize * repeat as usize;
        let padded_len = (payload_len + 3) & !3;
        let available = remaining - HEADER_LEN;
        if padded_len > available {
            return Err(GpmfError::TruncatedRecord {
                offset: pos,
                needed: padded_len,
                available,
            });
        }

        let payload_start = pos + HEADER_LEN;
        let record = Record {
            key: FourCC::from_bytes(&key_bytes),
            type_byte,
            element_size,
            repeat,
            payload: &self.buf[payload_start..payload_start + payload_len],
        };
        Ok(Some((record, payload_start + padded_len)))
    }

    /// Eagerly expands this scope and every nested scope below it into an
    /// owned tree. A debug convenience (e.g. for dumping a file's full
    /// structure); not on the hot path for telemetry extraction, which
    /// should pull lazily via the iterator instead.
    pub fn expand(mut self) -> Result<Vec<Node>, GpmfError> {
        let mode = self.mode;
        let mut out = Vec::new();
        while let Some(record) = self.next() {
            let record = record?;
            let schema_snapshot = self.schema.clone();
            if record.is_container() {
                let children = iter_records(record.payload, mode).expand()?;
                out.push(Node {
                    key: record.key.clone(),
                    value: None,
                    children,
                });
            } else {
                let value = record.decode(schema_snapshot.as_deref()).ok();
                out.push(Node {
                    key: record.key.clone(),
                    value,
                    children: Vec::new(),
                });
            }
        }
        Ok(out)
    }

}

/// Finds every record matching an ordered path of fourcc keys interpreted
/// from any root — e.g. `[STRM, GPS5]` returns every `GPS5` record nested
/// (at any depth) under a `STRM` container anywhere in `buf`.
pub fn find<'a>(buf: &'a [u8], path: &[FourCC], mode: Mode) -> Result<Vec<Record<'a>>, GpmfError> {
    let mut out = Vec::new();
    if !path.is_empty() {
        collect_path(iter_records(buf, mode), path, &mut out)?;
    }
    Ok(out)
}

/// Recursive helper for [`find`]: walks one scope, advancing `path` past a
/// key it matches and otherwise continuing to search inside every nested
/// container with the same unmatched `path`.
fn collect_path<'a>(
    mut records: Records<'a>,
    path: &[FourCC],
    out: &mut Vec<Record<'a>>,
) -> Result<(), GpmfError> {
    while let Some(record) = records.next() {
        let record = record?;
        if record.key == path[0] {
            if path.len() == 1 {
                out.push(record);
            } else if record.is_container() {
                collect_path(records.children(&record), &path[1..], out)?;
            }
        } else if record.is_container() {
            collect_path(records.children(&record), path, out)?;
        }
    }
    Ok(())
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, GpmfError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match self.read_one(self.pos) {
                Ok(Some(step)) => step,
                Ok(None) => return None,
                Err(err) => {
                    return match self.mode {
                        Mode::Strict => Some(Err(err)),
                        Mode::Lenient => {
                            debug!(?err, "lenient scan stopping at truncated tail");
                            None
                        }
                    }
                }
            };
            let (record, next_pos) = step;

            if record.key == FourCC::TYPE {
                match decode_type_schema(&record) {
                    Ok(schema) => {
                        trace!(?schema, "installed complex-type schema");
                        self.schema = Some(schema);
                    }
                    Err(err) if self.mode == Mode::Strict => {
                        self.pos = next_pos;
                        return Some(Err(err));
                    }
                    Err(err) => {
                        warn!(?err, "skipping malformed TYPE record in lenient mode");
                    }
                }
                self.pos = next_pos;
                return Some(Ok(record));
            }

            if !record.is_container() {
                if let Err(err) = record.type_code() {
                    self.pos = next_pos;
                    return match self.mode {
                        Mode::Strict => Some(Err(err)),
                        Mode::Lenient => {
                            warn!(type_byte = record.type_byte, "skipping unknown type code");
                            continue;
                        }
                    };
                }
            }

            self.pos = next_pos;
            debug!(key = %record.key, type_byte = record.type_byte, repeat = record.repeat, "scanned record");
            return Some(Ok(record));
        }
    }
}

/// Parses a `TYPE` record's payload (one ASCII character per field) into
/// the schema used to decode subsequent `?`-typed records in the same scope.
fn decode_type_schema(record: &Record<'_>) -> Result<Vec<TypeCode>, GpmfError> {
    let trimmed = match record.payload.iter().position(|&b| b == 0) {
        Some(end) => &record.payload[..end],
        None => record.payload,
    };
    trimmed
        .iter()
        .map(|&byte| TypeCode::try_from(byte).map_err(|_| GpmfError::UnknownType(byte)))
        .collect()
}

/// One node of the eagerly-expanded debug tree produced by [`Records::expand`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub key: FourCC,
    /// `None` for a container record (see `children` instead).
    pub value: Option<crate::value::Value>,
    pub children: Vec<Node>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_bytes(key: &[u8; 4], type_byte: u8, element_size: u8, repeat: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(key);
        out.push(type_byte);
        out.push(element_size);
        out.extend_from_slice(&repeat.to_be_bytes());
        out.extend_from_slice(payload);
        let padding = (4 - (payload.len() % 4)) % 4;
        out.extend(std::iter::repeat(0u8).take(padding));
        out
    }

    #[test]
    fn scans_a_flat_sequence_of_records() {
        let mut buf = Vec::new();
        buf.extend(record_bytes(b"TSMP", b'L', 4, 1, &42u32.to_be_bytes()));
        buf.extend(record_bytes(b"STNM", b'c', 1, 4, b"GPS5"));

        let records: Vec<_> = iter_records(&buf, Mode::Strict).collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, FourCC::TSMP);
        assert_eq!(records[1].key, FourCC::STNM);
    }

    #[test]
    fn find_locates_records_nested_under_a_path() {
        let gps5 = record_bytes(b"GPS5", b'l', 4, 1, &1i32.to_be_bytes());
        let strm = record_bytes(b"STRM", 0, 0, gps5.len() as u16, &gps5);
        let devc = record_bytes(b"DEVC", 0, 0, strm.len() as u16, &strm);

        let matches = find(&devc, &[FourCC::STRM, FourCC::GPS5], Mode::Strict).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, FourCC::GPS5);

        let none = find(&devc, &[FourCC::STRM, FourCC::ACCL], Mode::Strict).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn descends_into_nested_container() {
        let inner = record_bytes(b"TSMP", b'L', 4, 1, &7u32.to_be_bytes());
        let outer = record_bytes(b"STRM", 0, 0, inner.len() as u16, &inner);

        let scanner = iter_records(&outer, Mode::Strict);
        let records: Vec<_> = scanner.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_container());

        let child_scope = iter_records(&outer, Mode::Strict);
        let children: Vec<_> = child_scope
            .children(&records[0])
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].key, FourCC::TSMP);
    }

    #[test]
    fn strict_mode_errors_on_truncated_header() {
        let buf = vec![b'T', b'S', b'M']; // 3 bytes, short of an 8-byte header
        let mut scanner = iter_records(&buf, Mode::Strict);
        assert!(matches!(scanner.next(), Some(Err(GpmfError::TruncatedRecord { .. }))));
    }

    #[test]
    fn lenient_mode_stops_silently_on_truncated_tail() {
        let buf = vec![b'T', b'S', b'M'];
        let mut scanner = iter_records(&buf, Mode::Lenient);
        assert_eq!(scanner.next(), None);
    }

    #[test]
    fn type_record_installs_schema_for_following_complex_record() {
        let type_rec = record_bytes(b"TYPE", b'c', 1, 3, b"fsl");
        let mut payload = Vec::new();
        payload.extend_from_slice(&1.0f32.to_be_bytes());
        payload.extend_from_slice(&2i16.to_be_bytes());
        payload.extend_from_slice(&3i32.to_be_bytes());
        let complex_rec = record_bytes(b"DATA", b'?', 10, 1, &payload);

        let mut buf = Vec::new();
        buf.extend(type_rec);
        buf.extend(complex_rec);

        let mut scanner = iter_records(&buf, Mode::Strict);
        let first = scanner.next().unwrap().unwrap();
        assert_eq!(first.key, FourCC::TYPE);
        assert_eq!(scanner.current_schema(), Some(&[TypeCode::F32, TypeCode::I16, TypeCode::I32][..]));

        let second = scanner.next().unwrap().unwrap();
        let decoded = second.decode(scanner.current_schema()).unwrap();
        match decoded {
            crate::value::Value::Complex(tuples) => assert_eq!(tuples.len(), 1),
            other => panic!("expected Complex, got {other:?}"),
        }
    }

    #[test]
    fn type_record_trims_trailing_nul_before_building_schema() {
        // repeat=4 declares a trailing NUL as part of the payload, as a
        // NUL-terminated "fsl" schema string would be encoded.
        let type_rec = record_bytes(b"TYPE", b'c', 1, 4, b"fsl\0");
        let mut scanner = iter_records(&type_rec, Mode::Strict);
        let record = scanner.next().unwrap().unwrap();
        assert_eq!(record.key, FourCC::TYPE);
        assert_eq!(
            scanner.current_schema(),
            Some(&[TypeCode::F32, TypeCode::I16, TypeCode::I32][..])
        );
    }

    #[test]
    fn zero_byte_buffer_yields_an_empty_sequence() {
        let buf = vec![0u8; 8];
        let records: Vec<_> = iter_records(&buf, Mode::Strict).collect::<Result<_, _>>().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn empty_buffer_yields_an_empty_sequence() {
        let records: Vec<_> = iter_records(&[], Mode::Strict).collect::<Result<_, _>>().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn repeat_zero_yields_an_empty_numeric_array_not_an_error() {
        let buf = record_bytes(b"TSMP", b'L', 4, 0, &[]);
        let records: Vec<_> = iter_records(&buf, Mode::Strict).collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 1);
        let value = records[0].decode(None).unwrap();
        assert_eq!(value.as_f64_flat(), Some(Vec::new()));
    }

    #[test]
    fn payload_of_four_needs_exactly_one_pad_byte() {
        // element_size=1, repeat=3 -> payload len 3, padded to 4: one pad byte.
        let buf = record_bytes(b"STNM", b'c', 1, 3, b"abc");
        assert_eq!(buf.len(), 8 + 4);
        let mut scanner = iter_records(&buf, Mode::Strict);
        let record = scanner.next().unwrap().unwrap();
        assert_eq!(record.payload, b"abc");
        assert!(scanner.next().is_none());
    }

    #[test]
    fn missing_trailing_pad_byte_is_truncated_not_silently_accepted() {
        // element_size=1, repeat=3 -> payload "abc" needs one pad byte, but
        // the buffer ends right after the payload.
        let mut buf = Vec::new();
        buf.extend_from_slice(b"STNM");
        buf.push(b'c');
        buf.push(1);
        buf.extend_from_slice(&3u16.to_be_bytes());
        buf.extend_from_slice(b"abc");

        let mut scanner = iter_records(&buf, Mode::Strict);
        assert!(matches!(scanner.next(), Some(Err(GpmfError::TruncatedRecord { .. }))));

        let mut lenient = iter_records(&buf, Mode::Lenient);
        assert_eq!(lenient.next(), None);
    }

    #[test]
    fn round_trip_preserves_the_scanned_sequence() {
        // Assembling a KLV buffer from scratch, rather than reusing the
        // helper above, keeps this test honest about what "round-trip"
        // means: scan, reassemble the same bytes, rescan, same sequence.
        let fields: [(&[u8; 4], u8, u8, u16, &[u8]); 2] = [
            (b"TSMP", b'L', 4, 1, &[0, 0, 0, 42]),
            (b"STNM", b'c', 1, 4, b"GPS5"),
        ];
        let mut buf = Vec::new();
        for &(key, ty, size, repeat, payload) in &fields {
            buf.extend(record_bytes(key, ty, size, repeat, payload));
        }

        let first_pass: Vec<_> = iter_records(&buf, Mode::Strict)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
            .into_iter()
            .map(|r| (r.key, r.payload.to_vec()))
            .collect();

        let mut reassembled = Vec::new();
        for &(key, ty, size, repeat, payload) in &fields {
            reassembled.extend(record_bytes(key, ty, size, repeat, payload));
        }
        assert_eq!(reassembled, buf);

        let second_pass: Vec<_> = iter_records(&reassembled, Mode::Strict)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
            .into_iter()
            .map(|r| (r.key, r.payload.to_vec()))
            .collect();
        assert_eq!(second_pass, first_pass);
    }
}
