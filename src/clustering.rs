//! Effort-duration clustering and repeated-set encoding
//!
//! Groups the chronological effort durations of a session into clusters of
//! similar length (e.g. 180s, 90s, 30s repetitions), then reads the session
//! back in order to summarize maximal runs of same-cluster efforts as
//! "N × ~Ts" sets.

use crate::models::{Cluster, EffortSet};
use crate::stats;

/// Relative tolerance when grouping durations around a seed.
const REL_TOLERANCE: f64 = 0.15;

/// Absolute floor for the grouping tolerance, in seconds.
const MIN_TOLERANCE_S: i64 = 8;

/// Group durations into clusters by relative tolerance.
///
/// Seeds are taken largest-first; every remaining duration within
/// `±max(8s, 15% of seed)` of the seed joins the seed's cluster. The
/// returned clusters are sorted by median duration descending.
pub fn cluster_durations(durations: &[i64]) -> Vec<Cluster> {
    if durations.is_empty() {
        return Vec::new();
    }

    let mut remaining = durations.to_vec();
    remaining.sort_unstable_by(|a, b| b.cmp(a));

    let mut clusters = Vec::new();
    while let Some(&seed) = remaining.first() {
        let tolerance =
            MIN_TOLERANCE_S.max((seed as f64 * REL_TOLERANCE).round_ties_even() as i64);

        let group: Vec<i64> = remaining
            .iter()
            .copied()
            .filter(|d| (d - seed).abs() <= tolerance)
            .collect();
        remaining.retain(|d| (d - seed).abs() > tolerance);

        let group_f: Vec<f64> = group.iter().map(|&d| d as f64).collect();
        let median_s = stats::median(&group_f)
            .map(|m| m.round_ties_even() as i64)
            .unwrap_or(seed);

        let mut members = group;
        members.sort_unstable();

        clusters.push(Cluster {
            median_s,
            count: members.len(),
            members,
        });
    }

    clusters.sort_by(|a, b| b.median_s.cmp(&a.median_s));
    clusters
}

/// Index of the cluster whose median is closest to `duration`.
///
/// Clusters are scanned in their sorted order and only a strictly smaller
/// error wins, so ties resolve to the longer-duration cluster.
pub fn nearest_cluster(duration: i64, clusters: &[Cluster]) -> usize {
    let mut best = 0;
    let mut best_err = i64::MAX;
    for (i, cluster) in clusters.iter().enumerate() {
        let err = (duration - cluster.median_s).abs();
        if err < best_err {
            best_err = err;
            best = i;
        }
    }
    best
}

/// Run-length encode the chronological durations into repeated sets.
///
/// Each duration is assigned to its nearest cluster; every maximal run of
/// identical cluster ids becomes one set.
pub fn encode_sets(durations: &[i64], clusters: &[Cluster]) -> Vec<EffortSet> {
    if durations.is_empty() || clusters.is_empty() {
        return Vec::new();
    }

    let sequence: Vec<usize> = durations
        .iter()
        .map(|&d| nearest_cluster(d, clusters))
        .collect();

    let mut sets = Vec::new();
    let mut current = sequence[0];
    let mut count = 1;
    for &id in &sequence[1..] {
        if id == current {
            count += 1;
        } else {
            sets.push(EffortSet {
                median_s: clusters[current].median_s,
                count,
            });
            current = id;
            count = 1;
        }
    }
    sets.push(EffortSet {
        median_s: clusters[current].median_s,
        count,
    });

    sets
}
