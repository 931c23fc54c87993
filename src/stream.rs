//! Sample-stream joining (component C4): walking `DEVC -> STRM` containers
//! and grouping each `STRM`'s records into a lookup table keyed by fourcc,
//! ready for a materializer (see [`crate::gps`], [`crate::imu`]) to pull
//! from.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::GpmfError;
use crate::fourcc::FourCC;
use crate::record::Record;
use crate::scanner::{iter_records, Mode};
use crate::type_code::TypeCode;

/// One `STRM` container's records, keyed by fourcc.
///
/// When a fourcc repeats within a single `STRM` (rare, but the format does
/// not forbid it) the last record wins, matching how a single pass over the
/// stream naturally overwrites earlier entries.
#[derive(Debug, Default)]
pub struct StreamBlock<'a> {
    records: HashMap<FourCC, Record<'a>>,
    schema: Option<Vec<TypeCode>>,
}

impl<'a> StreamBlock<'a> {
    pub fn get(&self, key: &FourCC) -> Option<&Record<'a>> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &FourCC) -> bool {
        self.records.contains_key(key)
    }

    /// Decodes the record at `key`, if present, using this block's
    /// `TYPE` schema (if one was declared in the stream).
    pub fn decode(&self, key: &FourCC) -> Option<Result<crate::value::Value, GpmfError>> {
        self.records.get(key).map(|r| r.decode(self.schema.as_deref()))
    }
}

/// Lazily walks `buf` for `DEVC` containers, then each container's `STRM`
/// children, yielding one [`StreamBlock`] per stream that contains at
/// least one of `data_keys`.
///
/// A block with none of `data_keys` (e.g. a `STRM` carrying only face
/// detection boxes when the caller wants `GPS5`/`GPS9`) is skipped rather
/// than yielded empty, so a GPS-only consumer never sees IMU-only blocks.
pub fn iter_stream_blocks<'a>(
    buf: &'a [u8],
    data_keys: &'a [FourCC],
    mode: Mode,
) -> impl Iterator<Item = Result<StreamBlock<'a>, GpmfError>> + 'a {
    StreamBlocks {
        devices: iter_records(buf, mode),
        current_device_streams: None,
        data_keys,
        mode,
    }
}

struct StreamBlocks<'a> {
    devices: crate::scanner::Records<'a>,
    current_device_streams: Option<crate::scanner::Records<'a>>,
    data_keys: &'a [FourCC],
    mode: Mode,
}

impl<'a> Iterator for StreamBlocks<'a> {
    type Item = Result<StreamBlock<'a>, GpmfError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(streams) = &mut self.current_device_streams {
                match streams.next() {
                    Some(Ok(record)) if record.key == FourCC::STRM => {
                        let block = match build_block(streams, &record, self.mode) {
                            Ok(block) => block,
                            Err(err) => return Some(Err(err)),
                        };
                        if self.data_keys.iter().any(|k| block.contains(k)) {
                            trace!(fields = block.records.len(), "joined stream block");
                            return Some(Ok(block));
                        }
                        continue;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => return Some(Err(err)),
                    None => {
                        self.current_device_streams = None;
                        continue;
                    }
                }
            }

            match self.devices.next() {
                Some(Ok(record)) if record.key == FourCC::DEVC => {
                    debug!("entering DEVC container");
                    self.current_device_streams = Some(self.devices.children(&record));
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Some(Err(err)),
                None => return None,
            }
        }
    }
}

/// Scans one `STRM` record's payload and groups it into a [`StreamBlock`].
fn build_block<'a>(
    parent: &crate::scanner::Records<'a>,
    strm: &Record<'a>,
    _mode: Mode,
) -> Result<StreamBlock<'a>, GpmfError> {
    let mut block = StreamBlock::default();
    let mut scanner = parent.children(strm);
    while let Some(record) = scanner.next() {
        let record = record?;
        if record.key != FourCC::TYPE {
            block.records.insert(record.key.clone(), record);
        }
    }
    block.schema = scanner.current_schema().map(|s| s.to_vec());
    Ok(block)
}
