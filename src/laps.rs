//! Lap-row construction for final structural spans
//!
//! Metrics are computed over the raw, unsmoothed streams. Unlike the
//! candidate filter, which drops blocks with missing endpoint data, row
//! emission falls back to an index-count duration when a time is missing;
//! the two policies intentionally differ.

use crate::models::{Lap, LapType, StreamPoint};

/// Build one lap row over the inclusive index span `[start, end]`.
pub fn build_lap(
    activity_id: i64,
    lap_type: LapType,
    lap_index: u32,
    points: &[StreamPoint],
    start: usize,
    end: usize,
) -> Lap {
    let first = &points[start];
    let last = &points[end];

    let duration_s = match (first.time_s, last.time_s) {
        (Some(t0), Some(t1)) => (t1 - t0).max(0),
        _ => (end - start) as i64,
    };

    let distance_m = match (first.distance_m, last.distance_m) {
        (Some(d0), Some(d1)) => Some((d1 - d0).max(0.0)),
        _ => None,
    };

    let pace_s_per_km = distance_m.and_then(|d| pace_from_duration_distance(duration_s, d));

    let span = &points[start..=end];
    let avg_hr = mean(span.iter().filter_map(|p| p.heartrate_bpm.map(f64::from)));
    let avg_grade = mean(span.iter().filter_map(|p| p.grade));

    Lap {
        activity_id,
        lap_type,
        lap_index,
        start_idx: first.idx,
        end_idx: last.idx,
        start_time_s: first.time_s,
        end_time_s: last.time_s,
        duration_s,
        distance_m,
        pace_s_per_km,
        avg_hr,
        avg_grade,
    }
}

/// Pace in seconds per kilometer; undefined for non-positive distances.
fn pace_from_duration_distance(duration_s: i64, distance_m: f64) -> Option<f64> {
    if distance_m <= 0.0 {
        return None;
    }
    Some(duration_s as f64 / distance_m * 1000.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(idx: usize, time_s: Option<i64>, distance_m: Option<f64>) -> StreamPoint {
        StreamPoint {
            idx,
            time_s,
            distance_m,
            velocity_m_s: Some(3.0),
            heartrate_bpm: Some(140 + idx as u16),
            grade: Some(1.0),
        }
    }

    #[test]
    fn test_full_metrics() {
        let points: Vec<StreamPoint> = (0..10)
            .map(|i| point(i, Some(i as i64), Some(i as f64 * 3.0)))
            .collect();

        let lap = build_lap(1, LapType::Effort, 1, &points, 2, 8);

        assert_eq!(lap.start_idx, 2);
        assert_eq!(lap.end_idx, 8);
        assert_eq!(lap.duration_s, 6);
        assert_eq!(lap.distance_m, Some(18.0));
        // 6s over 18m => 333.33 s/km
        let pace = lap.pace_s_per_km.unwrap();
        assert!((pace - 1000.0 / 3.0).abs() < 1e-9);
        // HR ramps 142..=148 over the span
        assert_eq!(lap.avg_hr, Some(145.0));
        assert_eq!(lap.avg_grade, Some(1.0));
    }

    #[test]
    fn test_missing_time_falls_back_to_index_count() {
        let mut points: Vec<StreamPoint> = (0..5)
            .map(|i| point(i, Some(i as i64), Some(i as f64)))
            .collect();
        points[4].time_s = None;

        let lap = build_lap(1, LapType::Recup, 1, &points, 0, 4);
        assert_eq!(lap.duration_s, 4);
        assert_eq!(lap.start_time_s, Some(0));
        assert_eq!(lap.end_time_s, None);
    }

    #[test]
    fn test_missing_distance_drops_pace() {
        let mut points: Vec<StreamPoint> = (0..5)
            .map(|i| point(i, Some(i as i64), Some(i as f64)))
            .collect();
        points[0].distance_m = None;

        let lap = build_lap(1, LapType::Warmup, 1, &points, 0, 4);
        assert_eq!(lap.distance_m, None);
        assert_eq!(lap.pace_s_per_km, None);
    }

    #[test]
    fn test_zero_distance_has_no_pace() {
        let points: Vec<StreamPoint> = (0..5)
            .map(|i| point(i, Some(i as i64), Some(100.0)))
            .collect();

        let lap = build_lap(1, LapType::Effort, 1, &points, 0, 4);
        assert_eq!(lap.distance_m, Some(0.0));
        assert_eq!(lap.pace_s_per_km, None);
    }

    #[test]
    fn test_negative_deltas_clamp_to_zero() {
        let points = vec![
            point(0, Some(10), Some(50.0)),
            point(1, Some(8), Some(40.0)),
        ];

        let lap = build_lap(1, LapType::Effort, 1, &points, 0, 1);
        assert_eq!(lap.duration_s, 0);
        assert_eq!(lap.distance_m, Some(0.0));
        assert_eq!(lap.pace_s_per_km, None);
    }

    #[test]
    fn test_absent_streams_yield_no_averages() {
        let points: Vec<StreamPoint> = (0..3)
            .map(|i| StreamPoint {
                idx: i,
                time_s: Some(i as i64),
                distance_m: Some(i as f64),
                velocity_m_s: None,
                heartrate_bpm: None,
                grade: None,
            })
            .collect();

        let lap = build_lap(1, LapType::Cooldown, 1, &points, 0, 2);
        assert_eq!(lap.avg_hr, None);
        assert_eq!(lap.avg_grade, None);
    }
}
