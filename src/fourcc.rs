//! The 4-byte ASCII key ("fourcc") that opens every KLV record.
//!
//! Most fourcc codes are documented by GoPro's own GPMF spec and are
//! enumerated here so callers can match on them instead of comparing raw
//! strings. Anything undocumented (or camera-generation-specific and not
//! worth naming) falls through to [`FourCC::Other`].

use std::fmt;

use strum::EnumString;

/// A 4-byte GPMF fourcc key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
pub enum FourCC {
    /// Unique device source for metadata. Opens a device container.
    #[strum(serialize = "DEVC")]
    DEVC,
    /// Device/track ID.
    #[strum(serialize = "DVID")]
    DVID,
    /// Device name.
    #[strum(serialize = "DVNM")]
    DVNM,
    /// Nested signal stream of metadata/telemetry.
    #[strum(serialize = "STRM")]
    STRM,
    /// Stream name.
    #[strum(serialize = "STNM")]
    STNM,
    /// Free-text comment for a stream.
    #[strum(serialize = "RMRK")]
    RMRK,
    /// Per-column scaling divisor applied to a sibling data record.
    #[strum(serialize = "SCAL")]
    SCAL,
    /// SI unit string.
    #[strum(serialize = "SIUN")]
    SIUN,
    /// Display unit string.
    #[strum(serialize = "UNIT")]
    UNIT,
    /// Typedef for the following complex (`?`) record.
    #[strum(serialize = "TYPE")]
    TYPE,
    /// Running count of samples delivered for this stream.
    #[strum(serialize = "TSMP")]
    TSMP,
    /// Time offset, rare.
    #[strum(serialize = "TIMO")]
    TIMO,
    /// Count of empty payloads.
    #[strum(serialize = "EMPT")]
    EMPT,
    /// Start timestamp.
    #[strum(serialize = "TICK")]
    TICK,
    /// End timestamp.
    #[strum(serialize = "TOCK")]
    TOCK,
    /// Thermal sensor temperature, used to scale gyro/accel drift.
    #[strum(serialize = "TMPC")]
    TMPC,
    /// 3-axis accelerometer.
    #[strum(serialize = "ACCL")]
    ACCL,
    /// 3-axis gyroscope.
    #[strum(serialize = "GYRO")]
    GYRO,
    /// Image sensor gain.
    #[strum(serialize = "ISOG")]
    ISOG,
    /// Exposure time (shutter speed).
    #[strum(serialize = "SHUT")]
    SHUT,
    /// GPS5: latitude, longitude, altitude, 2D speed, 3D speed.
    #[strum(serialize = "GPS5")]
    GPS5,
    /// GPS9: GPS5 fields plus days-since-2000, seconds-since-midnight, DOP, fix.
    #[strum(serialize = "GPS9")]
    GPS9,
    /// UTC time and date for a GPS5 cluster.
    #[strum(serialize = "GPSU")]
    GPSU,
    /// GPS fix: 0 none, 2 2D, 3 3D.
    #[strum(serialize = "GPSF")]
    GPSF,
    /// GPS dilution of precision x100.
    #[strum(serialize = "GPSP")]
    GPSP,
    /// GPS altitude system (Hero8+, mean sea level vs. ellipsoid).
    #[strum(serialize = "GPSA")]
    GPSA,
    /// Magnetometer.
    #[strum(serialize = "MAGN")]
    MAGN,
    /// Microsecond timestamps (Fusion and later).
    #[strum(serialize = "STMP")]
    STMP,
    /// Face detection bounding boxes.
    #[strum(serialize = "FACE")]
    FACE,
    /// Faces counted per frame.
    #[strum(serialize = "FCNM")]
    FCNM,
    /// Sensor ISO (replaces ISOG).
    #[strum(serialize = "ISOE")]
    ISOE,
    /// Auto low-light frame duration.
    #[strum(serialize = "ALLD")]
    ALLD,
    /// White balance in Kelvin.
    #[strum(serialize = "WBAL")]
    WBAL,
    /// White balance RGB gains.
    #[strum(serialize = "WRGB")]
    WRGB,
    /// Luma (Y) average over the frame.
    #[strum(serialize = "YAVG")]
    YAVG,
    /// Predominant hues over the frame.
    #[strum(serialize = "HUES")]
    HUES,
    /// Image uniformity.
    #[strum(serialize = "UNIF")]
    UNIF,
    /// Scene classifier probabilities.
    #[strum(serialize = "SCEN")]
    SCEN,
    /// Sensor readout time.
    #[strum(serialize = "SROT")]
    SROT,
    /// Camera orientation quaternions.
    #[strum(serialize = "CORI")]
    CORI,
    /// Image orientation quaternions.
    #[strum(serialize = "IORI")]
    IORI,
    /// Gravity vector.
    #[strum(serialize = "GRAV")]
    GRAV,
    /// Wind processing active flag.
    #[strum(serialize = "WNDM")]
    WNDM,
    /// Microphone-wet flag.
    #[strum(serialize = "MWET")]
    MWET,
    /// Audio RMS/peak levels in dBFS.
    #[strum(serialize = "AALP")]
    AALP,
    /// 360-mode disparity map.
    #[strum(serialize = "DISP")]
    DISP,
    /// Main-video frame skip.
    #[strum(serialize = "MSKP")]
    MSKP,
    /// Low-res-video frame skip.
    #[strum(serialize = "LSKP")]
    LSKP,
    /// HiLight tag markers.
    #[strum(serialize = "HMMT")]
    HMMT,
    /// Battery status.
    #[strum(serialize = "KBAT")]
    KBAT,
    /// Undocumented or camera-specific fourcc, kept verbatim.
    #[strum(default)]
    Other(String),
}

impl FourCC {
    /// Reads a fourcc from a raw 4-byte big-endian key.
    ///
    /// A key starting with a NUL byte is end-of-stream padding, not a real
    /// fourcc; callers scanning a buffer should check for that case before
    /// calling this (see [`crate::scanner::Mode`]).
    pub fn from_bytes(bytes: &[u8; 4]) -> Self {
        // ASCII by contract; fall back to lossy conversion rather than
        // failing outright since undocumented fourcc still need to round-trip.
        let s = String::from_utf8_lossy(bytes);
        s.parse().unwrap_or_else(|_| FourCC::Other(s.into_owned()))
    }

    /// True if this key marks zero-padding rather than a record.
    pub fn is_padding(bytes: &[u8; 4]) -> bool {
        bytes[0] == 0
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FourCC::Other(s) => write!(f, "{s}"),
            named => write!(f, "{named:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fourcc_round_trips() {
        assert_eq!(FourCC::from_bytes(b"GPS5"), FourCC::GPS5);
        assert_eq!(FourCC::from_bytes(b"STRM"), FourCC::STRM);
        assert_eq!(FourCC::from_bytes(b"GPS9"), FourCC::GPS9);
    }

    #[test]
    fn unknown_fourcc_falls_through_to_other() {
        match FourCC::from_bytes(b"ZZZZ") {
            FourCC::Other(s) => assert_eq!(s, "ZZZZ"),
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn padding_detection() {
        assert!(FourCC::is_padding(&[0, 0, 0, 0]));
        assert!(!FourCC::is_padding(b"GPS5"));
    }
}
