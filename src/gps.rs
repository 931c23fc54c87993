//! GPS materialization (component C5): turns a joined [`StreamBlock`]
//! into rider-facing GPS samples, preferring the richer `GPS9` record over
//! the legacy `GPS5` one when a stream carries both (Hero11+).

use tracing::warn;

use crate::error::GpmfError;
use crate::fourcc::FourCC;
use crate::stream::StreamBlock;

/// One GPS sample cluster, scaled and labeled, in the `GPS5`-compatible
/// shape: whether the source was `GPS5` or `GPS9`, only the first five
/// columns are surfaced here. See [`Gps9Extended`] for the full `GPS9`
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsRecord {
    pub description: String,
    /// Units string as reported by `SIUN`/`UNIT`, e.g. `"deg,deg,m,m/s,m/s"`.
    pub units: String,
    /// UTC timestamp from the stream's `GPSU` record, if present.
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    /// Dilution of precision, `GPSP / 100.0`.
    pub precision: Option<f64>,
    /// GPS fix quality: 0 none, 2 2D, 3 3D.
    pub fix: Option<u32>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub altitude: Vec<f64>,
    pub speed_2d: Vec<f64>,
    pub speed_3d: Vec<f64>,
    /// True if any sample's `GPSF` indicated no fix; the data is still
    /// returned, just flagged rather than treated as a hard error.
    pub out_of_range: bool,
}

impl GpsRecord {
    pub fn npoints(&self) -> usize {
        self.latitude.len()
    }
}

/// The full `GPS9` column set (Hero11+): GPS5's five columns plus a
/// per-sample date, time-of-day, dilution of precision and fix.
#[derive(Debug, Clone, PartialEq)]
pub struct Gps9Extended {
    pub base: GpsRecord,
    /// Seconds since UTC midnight, one per sample (`GPS9` column 6).
    pub time_of_day_s: Vec<f64>,
    /// Per-sample dilution of precision (`GPS9` column 7).
    pub dop: Vec<f64>,
    /// Per-sample fix quality (`GPS9` column 8).
    pub fix_per_sample: Vec<f64>,
}

const GPS5_WIDTH: usize = 5;
const GPS9_WIDTH: usize = 9;

/// Builds the GPS5-compatible record from a joined stream block,
/// preferring `GPS9` over `GPS5` when both are present.
pub fn materialize_gps(block: &StreamBlock<'_>) -> Result<GpsRecord, GpmfError> {
    let (key, width) = source_key(block)?;
    let rows = scaled_rows(block, &key, width)?;

    let latitude = column(&rows, 0);
    let longitude = column(&rows, 1);
    let altitude = column(&rows, 2);
    let speed_2d = column(&rows, 3);
    let speed_3d = column(&rows, 4);

    let fix = block.decode(&FourCC::GPSF).and_then(|v| v.ok()).and_then(|v| v.first_f64()).map(|f| f as u32);
    let checks_range = fix.map_or(false, |f| f >= 2);
    let out_of_range = checks_range
        && latitude.iter().zip(&longitude).any(|(&lat, &lon)| {
            !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon)
        });
    if out_of_range {
        warn!("GPS block has a fix but latitude/longitude fall outside the valid geodetic range");
    }

    Ok(GpsRecord {
        description: description(block),
        units: units(block),
        timestamp: block.decode(&FourCC::GPSU).and_then(|v| v.ok()).and_then(|v| v.as_datetime()),
        precision: block.decode(&FourCC::GPSP).and_then(|v| v.ok()).and_then(|v| v.first_f64()).map(|p| p / 100.0),
        fix,
        latitude,
        longitude,
        altitude,
        speed_2d,
        speed_3d,
        out_of_range,
    })
}

/// Builds the full 9-column `GPS9` record. Errors with [`GpmfError::NoGps`]
/// if the block has no `GPS9` record (use [`materialize_gps`] for a block
/// that might only have `GPS5`).
pub fn materialize_gps9_extended(block: &StreamBlock<'_>) -> Result<Gps9Extended, GpmfError> {
    if !block.contains(&FourCC::GPS9) {
        return Err(GpmfError::NoGps);
    }
    let base = materialize_gps(block)?;
    let rows = scaled_rows(block, &FourCC::GPS9, GPS9_WIDTH)?;
    Ok(Gps9Extended {
        base,
        time_of_day_s: column(&rows, 6),
        dop: column(&rows, 7),
        fix_per_sample: column(&rows, 8),
    })
}

/// Picks `GPS9` over `GPS5` when both are present.
fn source_key(block: &StreamBlock<'_>) -> Result<(FourCC, usize), GpmfError> {
    if block.contains(&FourCC::GPS9) {
        Ok((FourCC::GPS9, GPS9_WIDTH))
    } else if block.contains(&FourCC::GPS5) {
        Ok((FourCC::GPS5, GPS5_WIDTH))
    } else {
        Err(GpmfError::NoGps)
    }
}

/// Decodes the data record at `key`, reshapes it to `width` columns, divides
/// elementwise by the block's `SCAL` record, and returns the scaled rows.
fn scaled_rows(block: &StreamBlock<'_>, key: &FourCC, width: usize) -> Result<Vec<Vec<f64>>, GpmfError> {
    let data = block
        .decode(key)
        .ok_or_else(|| GpmfError::MissingData(key.clone()))??;
    let rows = data.rows_f64(width).ok_or(GpmfError::ShapeMismatch {
        scal_len: 0,
        data_arity: width,
    })?;

    let scal = block.decode(&FourCC::SCAL).ok_or(GpmfError::MissingScale)??;
    let scal = scal.as_f64_flat().ok_or(GpmfError::MissingScale)?;
    if scal.len() != width {
        return Err(GpmfError::ShapeMismatch {
            scal_len: scal.len(),
            data_arity: width,
        });
    }

    Ok(rows
        .into_iter()
        .map(|row| row.iter().zip(&scal).map(|(v, s)| v / s).collect())
        .collect())
}

fn column(rows: &[Vec<f64>], index: usize) -> Vec<f64> {
    rows.iter().map(|row| row[index]).collect()
}

fn description(block: &StreamBlock<'_>) -> String {
    block
        .decode(&FourCC::STNM)
        .and_then(|v| v.ok())
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_else(|| "GPS".to_owned())
}

fn units(block: &StreamBlock<'_>) -> String {
    block
        .decode(&FourCC::SIUN)
        .or_else(|| block.decode(&FourCC::UNIT))
        .and_then(|v| v.ok())
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}
