//! GPX export (external collaborator, feature `gpx`): turns materialized
//! [`GpsRecord`]s into a [`gpx::Gpx`] document. This module is the only
//! place in the crate that depends on the `gpx` crate; the decoder and
//! materializers never import GPX types.

use geo_types::Point;
use gpx::{Fix, Gpx, GpxVersion, Time, Track, TrackSegment, Waypoint};
use time::OffsetDateTime;

use crate::gps::GpsRecord;

/// Builds one [`TrackSegment`] from a run of [`GpsRecord`]s.
///
/// `first_only` keeps only the first sample of each record (useful when a
/// record represents a burst of samples taken at the same nominal instant
/// and only one waypoint per `DEVC` is wanted). `include_speed` sets each
/// waypoint's `speed` field from `speed_3d`, which some GPX consumers read
/// even though it's formally a GPX 1.0 field.
pub fn make_segment(records: &[GpsRecord], first_only: bool, include_speed: bool) -> TrackSegment {
    let mut segment = TrackSegment::new();
    for record in records {
        let count = if first_only { record.npoints().min(1) } else { record.npoints() };
        for i in 0..count {
            let mut waypoint = Waypoint::new(Point::new(record.longitude[i], record.latitude[i]));
            waypoint.elevation = Some(record.altitude[i]);
            waypoint.fix = record.fix.and_then(fix_from_gpsf);
            waypoint.time = record.timestamp.and_then(|dt| {
                OffsetDateTime::from_unix_timestamp(dt.timestamp())
                    .ok()
                    .map(Time::from)
            });
            if include_speed {
                waypoint.speed = Some(record.speed_3d[i]);
            }
            segment.points.push(waypoint);
        }
    }
    segment
}

/// Wraps one or more segments into a complete GPX 1.1 document with a
/// single track.
pub fn make_gpx(segments: Vec<TrackSegment>) -> Gpx {
    let mut track = Track::new();
    track.segments = segments;
    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.tracks.push(track);
    gpx
}

fn fix_from_gpsf(gpsf: u32) -> Option<Fix> {
    match gpsf {
        0 => Some(Fix::None),
        2 => Some(Fix::TwoDimensional),
        3 => Some(Fix::ThreeDimensional),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> GpsRecord {
        GpsRecord {
            description: "GPS".into(),
            units: "deg,deg,m,m/s,m/s".into(),
            timestamp: None,
            precision: Some(1.5),
            fix: Some(3),
            latitude: vec![44.1287283],
            longitude: vec![5.4277150],
            altitude: vec![833.759],
            speed_2d: vec![9.221],
            speed_3d: vec![10.123],
            out_of_range: false,
        }
    }

    #[test]
    fn builds_one_waypoint_per_sample() {
        let segment = make_segment(&[sample_record()], false, true);
        assert_eq!(segment.points.len(), 1);
        assert_eq!(segment.points[0].fix, Some(Fix::ThreeDimensional));
        assert_eq!(segment.points[0].speed, Some(10.123));
    }

    #[test]
    fn first_only_caps_one_waypoint_per_record() {
        let mut record = sample_record();
        record.latitude.push(44.2);
        record.longitude.push(5.5);
        record.altitude.push(834.0);
        record.speed_2d.push(9.0);
        record.speed_3d.push(10.0);

        let segment = make_segment(&[record], true, false);
        assert_eq!(segment.points.len(), 1);
    }
}
