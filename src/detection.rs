//! Workout structure detection over per-second activity streams
//!
//! Pipeline: the velocity stream is smoothed with an edge-aware rolling
//! mean, normalized into robust z-scores against a median/MAD baseline,
//! labeled by a two-threshold hysteresis state machine, and run-length
//! encoded into candidate blocks. Candidates below the duration/distance
//! minimums are discarded, near-adjacent survivors merged, and the
//! remaining efforts anchor the warmup, recovery and cooldown spans.
//! Effort durations are finally clustered into repeated "N × ~Ts" sets.
//!
//! The detector is pure: it reads one in-memory snapshot of an activity
//! and performs no I/O. Persistence of the resulting laps is the caller's
//! concern, driven by the `Detection::laps` contract.

use tracing::{debug, info};

use crate::clustering;
use crate::config::DetectionConfig;
use crate::error::{LapRsError, Result};
use crate::laps;
use crate::models::{Detection, DetectionResult, Lap, LapType, StreamPoint};
use crate::smoothing;
use crate::stats;

/// Smoothed velocities at or below this floor are treated as stopped and
/// excluded from the baseline.
const VALID_SPEED_FLOOR_M_S: f64 = 0.5;

/// Minimum number of valid smoothed samples for a usable baseline; median
/// and MAD are unreliable on very short or mostly-stopped activities.
const MIN_VALID_SAMPLES: usize = 60;

/// Per-sample label produced by the hysteresis state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EffortState {
    Neutral,
    Effort,
}

/// Detect the workout structure of one activity.
///
/// Hard-fails only on an empty stream. Returns a soft result (see
/// `DetectionResult::note`) when the baseline is unreliable or when no
/// effort survives filtering; all other malformed samples degrade to
/// missing metrics on individual laps.
pub fn detect(
    activity_id: i64,
    points: &[StreamPoint],
    config: &DetectionConfig,
) -> Result<Detection> {
    if points.is_empty() {
        return Err(LapRsError::Data("no points for this activity".to_string()));
    }

    let velocities: Vec<Option<f64>> = points.iter().map(|p| p.velocity_m_s).collect();
    let smoothed = smoothing::rolling_mean(&velocities, config.smooth_window);

    let valid: Vec<f64> = smoothed
        .iter()
        .flatten()
        .copied()
        .filter(|v| *v > VALID_SPEED_FLOOR_M_S)
        .collect();
    if valid.len() < MIN_VALID_SAMPLES {
        debug!(
            activity_id,
            valid = valid.len(),
            "not enough valid speed samples"
        );
        return Ok(Detection {
            summary: DetectionResult::insufficient_data(config.clone()),
            laps: None,
        });
    }

    let (v_median, v_mad) = stats::median_mad(&valid);
    let z_scores: Vec<Option<f64>> = smoothed
        .iter()
        .map(|v| stats::robust_z(*v, v_median, v_mad))
        .collect();

    let labels = label_states(&z_scores, config);
    let blocks = run_length_blocks(&labels);
    let candidates = filter_candidates(&blocks, points, config);
    let efforts = merge_blocks(candidates, config.merge_gap_s);

    if efforts.is_empty() {
        debug!(activity_id, "no efforts survived filtering");
        return Ok(Detection {
            summary: DetectionResult::no_efforts(config.clone()),
            laps: Some(Vec::new()),
        });
    }

    let last_idx = points.len() - 1;
    let (first_start, _) = efforts[0];
    let (_, last_end) = efforts[efforts.len() - 1];

    let warmup = (first_start > 0).then(|| (0, first_start - 1));
    let cooldown = (last_end < last_idx).then(|| (last_end + 1, last_idx));
    let recups = recovery_gaps(&efforts);

    let mut rows: Vec<Lap> = Vec::new();
    if let Some((s, e)) = warmup {
        rows.push(laps::build_lap(activity_id, LapType::Warmup, 1, points, s, e));
    }
    for (i, &(s, e)) in efforts.iter().enumerate() {
        rows.push(laps::build_lap(
            activity_id,
            LapType::Effort,
            i as u32 + 1,
            points,
            s,
            e,
        ));
    }
    for (i, &(s, e)) in recups.iter().enumerate() {
        rows.push(laps::build_lap(
            activity_id,
            LapType::Recup,
            i as u32 + 1,
            points,
            s,
            e,
        ));
    }
    if let Some((s, e)) = cooldown {
        rows.push(laps::build_lap(
            activity_id,
            LapType::Cooldown,
            1,
            points,
            s,
            e,
        ));
    }

    let durations = effort_durations(&efforts, points);
    let clusters = clustering::cluster_durations(&durations);
    let sets = clustering::encode_sets(&durations, &clusters);

    info!(
        activity_id,
        efforts = efforts.len(),
        recups = recups.len(),
        warmup = warmup.is_some(),
        cooldown = cooldown.is_some(),
        "structure detected"
    );

    Ok(Detection {
        summary: DetectionResult {
            effort_count: efforts.len(),
            recup_count: recups.len(),
            warmup: warmup.is_some(),
            cooldown: cooldown.is_some(),
            v_median: Some(v_median),
            v_mad: Some(v_mad),
            params: config.clone(),
            clusters,
            sets,
            note: None,
        },
        laps: Some(rows),
    })
}

/// Two-threshold hysteresis labeling of per-sample z-scores.
///
/// Entering an effort takes `z >= z_eff_on`, leaving one takes
/// `z <= z_eff_off`; the asymmetry prevents flicker at the boundary of a
/// real effort. A null z-score forces the state back to neutral, since
/// missing data cannot sustain an effort claim. The label recorded for a
/// sample is the state after processing it.
fn label_states(z_scores: &[Option<f64>], config: &DetectionConfig) -> Vec<EffortState> {
    let mut state = EffortState::Neutral;
    z_scores
        .iter()
        .map(|z| {
            match z {
                None => state = EffortState::Neutral,
                Some(z) => match state {
                    EffortState::Neutral => {
                        if *z >= config.z_eff_on {
                            state = EffortState::Effort;
                        }
                    }
                    EffortState::Effort => {
                        if *z <= config.z_eff_off {
                            state = EffortState::Neutral;
                        }
                    }
                },
            }
            state
        })
        .collect()
}

/// Run-length encode labels into contiguous `(label, start, end)` blocks.
fn run_length_blocks(labels: &[EffortState]) -> Vec<(EffortState, usize, usize)> {
    let mut blocks = Vec::new();
    if labels.is_empty() {
        return blocks;
    }

    let mut start = 0;
    let mut current = labels[0];
    for (i, &label) in labels.iter().enumerate().skip(1) {
        if label != current {
            blocks.push((current, start, i - 1));
            start = i;
            current = label;
        }
    }
    blocks.push((current, start, labels.len() - 1));
    blocks
}

/// Keep effort blocks that meet the duration and distance minimums.
///
/// Both checks use the unsmoothed time/distance at the block's own
/// endpoints; a candidate missing either field at either end is dropped
/// entirely, with no index-based fallback at this stage.
fn filter_candidates(
    blocks: &[(EffortState, usize, usize)],
    points: &[StreamPoint],
    config: &DetectionConfig,
) -> Vec<(usize, usize)> {
    let mut accepted = Vec::new();
    for &(label, start, end) in blocks {
        if label != EffortState::Effort {
            continue;
        }
        let (t0, t1) = (points[start].time_s, points[end].time_s);
        let (d0, d1) = (points[start].distance_m, points[end].distance_m);
        let (Some(t0), Some(t1), Some(d0), Some(d1)) = (t0, t1, d0, d1) else {
            continue;
        };

        let duration = (t1 - t0).max(0);
        let distance = (d1 - d0).max(0.0);
        if duration < config.min_eff_s {
            continue;
        }
        if distance < config.min_eff_dist_m {
            continue;
        }
        accepted.push((start, end));
    }
    accepted
}

/// Merge accepted blocks whose index gap is within `merge_gap`.
fn merge_blocks(candidates: Vec<(usize, usize)>, merge_gap: i64) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in candidates {
        if let Some((_, prev_end)) = merged.last_mut() {
            if start as i64 - *prev_end as i64 - 1 <= merge_gap {
                *prev_end = end;
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

/// Index gaps between consecutive efforts; empty or inverted gaps are
/// skipped rather than emitted as zero-length spans.
fn recovery_gaps(efforts: &[(usize, usize)]) -> Vec<(usize, usize)> {
    efforts
        .windows(2)
        .filter_map(|pair| {
            let (_, prev_end) = pair[0];
            let (next_start, _) = pair[1];
            let start = prev_end + 1;
            let end = next_start.saturating_sub(1);
            (start < end).then_some((start, end))
        })
        .collect()
}

/// Effort durations in seconds, falling back to the index span when a
/// block endpoint has no recorded time.
fn effort_durations(efforts: &[(usize, usize)], points: &[StreamPoint]) -> Vec<i64> {
    efforts
        .iter()
        .map(|&(start, end)| match (points[start].time_s, points[end].time_s) {
            (Some(t0), Some(t1)) => (t1 - t0).max(0),
            _ => (end - start) as i64,
        })
        .collect()
}
