use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;

/// One sample of an activity's per-second recording streams.
///
/// Samples are ordered by `idx`, which is strictly increasing, contiguous
/// and zero-based. Any of the optional streams may be missing per sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPoint {
    /// Position of the sample within the activity stream
    pub idx: usize,

    /// Elapsed time since activity start, in seconds
    pub time_s: Option<i64>,

    /// Cumulative distance since activity start, in meters
    pub distance_m: Option<f64>,

    /// Instantaneous velocity in meters per second
    pub velocity_m_s: Option<f64>,

    /// Heart rate in beats per minute
    pub heartrate_bpm: Option<u16>,

    /// Terrain grade as a percentage
    pub grade: Option<f64>,
}

/// Structural role of a detected lap within the workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LapType {
    Warmup,
    Effort,
    Recup,
    Cooldown,
}

impl LapType {
    /// Stable string form used in the database and in display output
    pub fn as_str(&self) -> &'static str {
        match self {
            LapType::Warmup => "WARMUP",
            LapType::Effort => "EFFORT",
            LapType::Recup => "RECUP",
            LapType::Cooldown => "COOLDOWN",
        }
    }

    /// All structural lap types replaced together on each detection run
    pub fn structural() -> [LapType; 4] {
        [
            LapType::Warmup,
            LapType::Effort,
            LapType::Recup,
            LapType::Cooldown,
        ]
    }
}

impl std::str::FromStr for LapType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WARMUP" => Ok(LapType::Warmup),
            "EFFORT" => Ok(LapType::Effort),
            "RECUP" => Ok(LapType::Recup),
            "COOLDOWN" => Ok(LapType::Cooldown),
            _ => Err(format!("Invalid lap type: {}", s)),
        }
    }
}

impl std::fmt::Display for LapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One detected lap of an activity.
///
/// Laps of the same activity never overlap in index range. An activity has
/// at most one WARMUP (starting at idx 0) and at most one COOLDOWN (ending
/// at the last idx); RECUP laps are exactly the gaps between consecutive
/// EFFORT laps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    /// Activity this lap belongs to
    pub activity_id: i64,

    /// Structural role of the lap
    pub lap_type: LapType,

    /// 1-based sequence number within the lap's type
    pub lap_index: u32,

    /// First sample index covered by the lap (inclusive)
    pub start_idx: usize,

    /// Last sample index covered by the lap (inclusive)
    pub end_idx: usize,

    /// Elapsed time at the first sample, if recorded
    pub start_time_s: Option<i64>,

    /// Elapsed time at the last sample, if recorded
    pub end_time_s: Option<i64>,

    /// Lap duration in seconds, never negative
    pub duration_s: i64,

    /// Distance covered by the lap in meters
    pub distance_m: Option<f64>,

    /// Average pace in seconds per kilometer
    pub pace_s_per_km: Option<f64>,

    /// Mean heart rate over the lap
    pub avg_hr: Option<f64>,

    /// Mean terrain grade over the lap
    pub avg_grade: Option<f64>,
}

/// A group of effort durations considered repetitions of the same interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Rounded median duration of the group, in seconds
    pub median_s: i64,

    /// Number of efforts in the group
    pub count: usize,

    /// Member durations, sorted ascending
    pub members: Vec<i64>,
}

/// A maximal run of consecutive efforts falling in the same duration cluster,
/// e.g. "4 × ~90s"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortSet {
    /// Median duration of the underlying cluster, in seconds
    pub median_s: i64,

    /// Number of consecutive efforts in the set
    pub count: usize,
}

/// Summary of one structure-detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Number of effort laps detected
    pub effort_count: usize,

    /// Number of recovery laps detected
    pub recup_count: usize,

    /// Whether a warmup span precedes the first effort
    pub warmup: bool,

    /// Whether a cooldown span follows the last effort
    pub cooldown: bool,

    /// Median of the valid smoothed velocities
    pub v_median: Option<f64>,

    /// Median absolute deviation of the valid smoothed velocities
    pub v_mad: Option<f64>,

    /// Parameters the detection ran with
    pub params: DetectionConfig,

    /// Effort-duration clusters, sorted by median descending
    pub clusters: Vec<Cluster>,

    /// Chronological set structure of the efforts
    pub sets: Vec<EffortSet>,

    /// Reason the activity could not be structured, if any
    pub note: Option<String>,
}

impl DetectionResult {
    /// Soft result for activities with too few valid speed samples.
    /// Persisted laps must be left untouched in this case.
    pub fn insufficient_data(params: DetectionConfig) -> Self {
        DetectionResult {
            effort_count: 0,
            recup_count: 0,
            warmup: false,
            cooldown: false,
            v_median: None,
            v_mad: None,
            params,
            clusters: Vec::new(),
            sets: Vec::new(),
            note: Some("insufficient data".to_string()),
        }
    }

    /// Soft result for activities where no effort survived filtering.
    /// Persisted structural laps are cleared in this case.
    pub fn no_efforts(params: DetectionConfig) -> Self {
        DetectionResult {
            effort_count: 0,
            recup_count: 0,
            warmup: false,
            cooldown: false,
            v_median: None,
            v_mad: None,
            params,
            clusters: Vec::new(),
            sets: Vec::new(),
            note: Some("no efforts detected".to_string()),
        }
    }
}

/// Complete outcome of one detection run: the summary returned to the
/// caller plus the lap rows destined for the storage adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Summary returned to the caller regardless of persistence
    pub summary: DetectionResult,

    /// Laps to persist. `None` leaves stored laps untouched (insufficient
    /// data); `Some` replaces all structural laps, clearing them when empty.
    pub laps: Option<Vec<Lap>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_lap_type_round_trip() {
        for lap_type in LapType::structural() {
            let parsed = LapType::from_str(lap_type.as_str()).unwrap();
            assert_eq!(parsed, lap_type);
        }
        assert!(LapType::from_str("TEMPO").is_err());
    }

    #[test]
    fn test_lap_type_serialization() {
        let json = serde_json::to_string(&LapType::Effort).unwrap();
        assert_eq!(json, "\"Effort\"");
    }

    #[test]
    fn test_stream_point_serialization() {
        let point = StreamPoint {
            idx: 42,
            time_s: Some(42),
            distance_m: Some(120.5),
            velocity_m_s: Some(3.1),
            heartrate_bpm: None,
            grade: Some(-1.2),
        };

        let json = serde_json::to_string(&point).unwrap();
        let deserialized: StreamPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, point);
    }

    #[test]
    fn test_soft_results_carry_notes() {
        let result = DetectionResult::insufficient_data(DetectionConfig::default());
        assert_eq!(result.effort_count, 0);
        assert_eq!(result.note.as_deref(), Some("insufficient data"));

        let result = DetectionResult::no_efforts(DetectionConfig::default());
        assert_eq!(result.recup_count, 0);
        assert_eq!(result.note.as_deref(), Some("no efforts detected"));
    }
}
