//! Gyroscope/accelerometer materialization (component C6): reshapes a
//! `GYRO`/`ACCL` record into per-axis samples, scaled by the stream's
//! `SCAL` record.

use crate::error::GpmfError;
use crate::fourcc::FourCC;
use crate::stream::StreamBlock;

const IMU_WIDTH: usize = 3;

/// Column ordering applied to a 3-axis sample before it is split into
/// `x`/`y`/`z`. The GPMF baseline is [`Orientation::Xyz`] (columns mapped
/// straight through); some camera/mount combinations report axes in a
/// different order, which callers can correct for with
/// [`materialize_imu_oriented`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl Orientation {
    fn column_order(self) -> [usize; 3] {
        match self {
            Orientation::Xyz => [0, 1, 2],
            Orientation::Xzy => [0, 2, 1],
            Orientation::Yxz => [1, 0, 2],
            Orientation::Yzx => [1, 2, 0],
            Orientation::Zxy => [2, 0, 1],
            Orientation::Zyx => [2, 1, 0],
        }
    }
}

/// One gyroscope or accelerometer stream, scaled and labeled.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuRecord {
    pub description: String,
    pub units: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// Sensor temperature from the stream's `TMPC` record, if present.
    pub temperature: Option<f64>,
}

impl ImuRecord {
    pub fn npoints(&self) -> usize {
        self.x.len()
    }
}

/// Materializes a `GYRO` or `ACCL` block with the GPMF baseline axis
/// order (component C6). Use [`materialize_imu_oriented`] when the device
/// is known to report axes in a different order.
pub fn materialize_imu(block: &StreamBlock<'_>, key: FourCC) -> Result<ImuRecord, GpmfError> {
    materialize_imu_oriented(block, key, Orientation::Xyz)
}

/// Materializes a `GYRO` or `ACCL` block, permuting its three columns
/// according to `orientation` before splitting into `x`/`y`/`z`.
pub fn materialize_imu_oriented(
    block: &StreamBlock<'_>,
    key: FourCC,
    orientation: Orientation,
) -> Result<ImuRecord, GpmfError> {
    let data = block
        .decode(&key)
        .ok_or_else(|| GpmfError::MissingData(key.clone()))??;
    let rows = data.rows_f64(IMU_WIDTH).ok_or(GpmfError::ShapeMismatch {
        scal_len: 0,
        data_arity: IMU_WIDTH,
    })?;

    let scal = block
        .decode(&FourCC::SCAL)
        .ok_or(GpmfError::MissingScale)??
        .as_f64_flat()
        .ok_or(GpmfError::MissingScale)?;
    // A stream may carry a fourth SCAL entry to scale TMPC; anything else is
    // a genuine shape mismatch against the 3-axis data record.
    if scal.len() != IMU_WIDTH && scal.len() != IMU_WIDTH + 1 {
        return Err(GpmfError::ShapeMismatch {
            scal_len: scal.len(),
            data_arity: IMU_WIDTH,
        });
    }

    let order = orientation.column_order();
    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    let mut z = Vec::with_capacity(rows.len());
    for row in &rows {
        x.push(row[order[0]] / scal[order[0]]);
        y.push(row[order[1]] / scal[order[1]]);
        z.push(row[order[2]] / scal[order[2]]);
    }

    let default_description = if key == FourCC::GYRO { "Gyroscope" } else { "Accelerometer" };
    let default_units = if key == FourCC::GYRO { "rad/s" } else { "m/s\u{b2}" };

    Ok(ImuRecord {
        description: block
            .decode(&FourCC::STNM)
            .and_then(|v| v.ok())
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| default_description.to_owned()),
        units: block
            .decode(&FourCC::SIUN)
            .or_else(|| block.decode(&FourCC::UNIT))
            .and_then(|v| v.ok())
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| default_units.to_owned()),
        x,
        y,
        z,
        temperature: block
            .decode(&FourCC::TMPC)
            .and_then(|v| v.ok())
            .and_then(|v| v.first_f64())
            .map(|raw| match scal.get(IMU_WIDTH) {
                Some(&scale) => raw / scale,
                None => raw,
            }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Mode;
    use crate::stream::iter_stream_blocks;

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

    fn f32_payload(values: &[f32]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in values {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    fn devc_with_strm(strm_payload: Vec<u8>) -> Vec<u8> {
        let strm = record_bytes(b"STRM", 0, 0, strm_payload.len() as u16, &strm_payload);
        record_bytes(b"DEVC", 0, 0, strm.len() as u16, &strm)
    }

    #[test]
    fn materializes_gyro_with_scale_and_temperature() {
        let gyro = f32_payload(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]); // two samples
        let scal = f32_payload(&[2.0, 2.0, 2.0]);
        let tmpc = f32_payload(&[23.5]);

        let mut strm_payload = Vec::new();
        strm_payload.extend(record_bytes(b"SCAL", b'f', 4, 3, &scal));
        strm_payload.extend(record_bytes(b"TMPC", b'f', 4, 1, &tmpc));
        strm_payload.extend(record_bytes(b"GYRO", b'f', 12, 2, &gyro));
        let buf = devc_with_strm(strm_payload);

        let block = iter_stream_blocks(&buf, &[FourCC::GYRO], Mode::Strict)
            .next()
            .unwrap()
            .unwrap();
        let record = materialize_imu(&block, FourCC::GYRO).unwrap();
        assert_eq!(record.npoints(), 2);
        assert_eq!(record.x, vec![0.5, 2.0]);
        assert_eq!(record.y, vec![1.0, 2.5]);
        assert_eq!(record.z, vec![1.5, 3.0]);
        assert_eq!(record.temperature, Some(23.5));
        assert_eq!(record.description, "Gyroscope");
    }

    #[test]
    fn fourth_scal_entry_scales_temperature() {
        let accl = f32_payload(&[1.0, 2.0, 3.0]);
        let scal = f32_payload(&[1.0, 1.0, 1.0, 10.0]);
        let tmpc = f32_payload(&[235.0]);
        let mut strm_payload = Vec::new();
        strm_payload.extend(record_bytes(b"SCAL", b'f', 4, 4, &scal));
        strm_payload.extend(record_bytes(b"TMPC", b'f', 4, 1, &tmpc));
        strm_payload.extend(record_bytes(b"ACCL", b'f', 12, 1, &accl));
        let buf = devc_with_strm(strm_payload);

        let block = iter_stream_blocks(&buf, &[FourCC::ACCL], Mode::Strict)
            .next()
            .unwrap()
            .unwrap();
        let record = materialize_imu(&block, FourCC::ACCL).unwrap();
        assert_eq!(record.temperature, Some(23.5));
    }

    #[test]
    fn orientation_permutes_columns_before_scaling() {
        let accl = f32_payload(&[1.0, 2.0, 3.0]);
        let scal = f32_payload(&[1.0, 1.0, 1.0]);
        let mut strm_payload = Vec::new();
        strm_payload.extend(record_bytes(b"SCAL", b'f', 4, 3, &scal));
        strm_payload.extend(record_bytes(b"ACCL", b'f', 12, 1, &accl));
        let buf = devc_with_strm(strm_payload);

        let block = iter_stream_blocks(&buf, &[FourCC::ACCL], Mode::Strict)
            .next()
            .unwrap()
            .unwrap();
        let record = materialize_imu_oriented(&block, FourCC::ACCL, Orientation::Zxy).unwrap();
        assert_eq!((record.x[0], record.y[0], record.z[0]), (3.0, 1.0, 2.0));
    }
}
