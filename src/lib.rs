//! # Parser for GoPro Metadata Format (GPMF)
//!
//! GPMF is the self-describing, nested KLV (Key/Length/Value) binary
//! format GoPro cameras use to carry GPS, gyroscope, accelerometer and
//! other telemetry alongside video. This crate decodes a raw GPMF byte
//! stream (the contents of an MP4 `gpmd` track, already demuxed by the
//! caller) into structured telemetry.
//!
//! # Design Goals
//!
//! * Lazy by default: [`scanner::iter_records`] pulls one record at a
//!   time from the caller's buffer; nothing is copied or decoded until
//!   asked for.
//! * Memory safe parser, no `unsafe`.
//! * Never panics on malformed input; [`scanner::Mode::Lenient`] degrades
//!   gracefully on truncated or unknown-typed records instead of failing
//!   the whole scan.
//! * Roundtrip sensor data without loss of precision: fixed-point values
//!   are decoded with the `fixed` crate rather than ad-hoc float math.
//! * Demuxing an MP4 container, writing GPX/KML, and plotting are left to
//!   calling code; this crate's job stops at structured telemetry (see
//!   the optional `gpx` feature for a thin GPX export built on top of
//!   that boundary).
//!
//! # Example
//!
//! ```no_run
//! use gpmf::fourcc::FourCC;
//! use gpmf::scanner::Mode;
//! use gpmf::stream::iter_stream_blocks;
//! use gpmf::gps::materialize_gps;
//!
//! fn main() -> Result<(), gpmf::error::GpmfError> {
//!     let buf = std::fs::read("telemetry.raw")?;
//!     for block in iter_stream_blocks(&buf, &[FourCC::GPS5, FourCC::GPS9], Mode::Strict) {
//!         let block = block?;
//!         let gps = materialize_gps(&block)?;
//!         println!("{} samples, first lat/lon {:?}/{:?}", gps.npoints(), gps.latitude.first(), gps.longitude.first());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Example with logging
//!
//! ```no_run
//! use tracing::Level;
//! use tracing_subscriber::FmtSubscriber;
//!
//! let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
//! tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items, clippy::missing_errors_doc)]

pub mod error;
pub mod fourcc;
#[cfg(feature = "gpx")]
pub mod gpx_export;
pub mod gps;
pub mod imu;
pub mod record;
pub mod scanner;
pub mod stream;
pub mod type_code;
pub mod value;

pub use error::GpmfError;
pub use fourcc::FourCC;
pub use gps::{GpsRecord, Gps9Extended};
pub use imu::{ImuRecord, Orientation};
pub use record::Record;
pub use scanner::{find, iter_records, Mode};
pub use stream::{iter_stream_blocks, StreamBlock};
pub use type_code::TypeCode;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_round_trips_a_gps5_block() {
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
        fn i32_payload(values: &[i32]) -> Vec<u8> {
            values.iter().flat_map(|v| v.to_be_bytes()).collect()
        }

        let gps5 = i32_payload(&[441287283, 54277150, 833759, 9221, 10123]);
        let scal = i32_payload(&[10000000, 10000000, 1000, 1000, 1000]);
        let mut strm_payload = Vec::new();
        strm_payload.extend(record_bytes(b"SCAL", b'l', 4, 5, &scal));
        strm_payload.extend(record_bytes(b"GPS5", b'l', 20, 1, &gps5));
        let strm = record_bytes(b"STRM", 0, 0, strm_payload.len() as u16, &strm_payload);
        let buf = record_bytes(b"DEVC", 0, 0, strm.len() as u16, &strm);

        let block = iter_stream_blocks(&buf, &[FourCC::GPS5, FourCC::GPS9], Mode::Strict)
            .next()
            .unwrap()
            .unwrap();
        let gps = gps::materialize_gps(&block).unwrap();
        assert_eq!(gps.npoints(), 1);
    }
}
