use criterion::{black_box, criterion_group, criterion_main, Criterion};

use laprs::config::DetectionConfig;
use laprs::detection::detect;
use laprs::models::StreamPoint;
use laprs::smoothing::rolling_mean;

/// A one-hour interval session: warmup, repeated ~90s efforts, cooldown
fn interval_session(len: usize) -> Vec<StreamPoint> {
    let mut distance = 0.0;
    (0..len)
        .map(|i| {
            let in_effort = i >= 600 && i < 2400 && (i - 600) % 210 < 90;
            let base = if in_effort { 4.8 } else { 2.6 };
            let v = base + if i % 2 == 0 { 0.05 } else { -0.05 };
            distance += v;
            StreamPoint {
                idx: i,
                time_s: Some(i as i64),
                distance_m: Some(distance),
                velocity_m_s: Some(v),
                heartrate_bpm: Some(if in_effort { 172 } else { 139 }),
                grade: Some(0.3),
            }
        })
        .collect()
}

fn bench_detection(c: &mut Criterion) {
    let points = interval_session(3600);
    let config = DetectionConfig::default();

    c.bench_function("detect_one_hour_session", |b| {
        b.iter(|| detect(black_box(1), black_box(&points), black_box(&config)))
    });
}

fn bench_smoothing(c: &mut Criterion) {
    let velocities: Vec<Option<f64>> = interval_session(3600)
        .iter()
        .map(|p| p.velocity_m_s)
        .collect();

    c.bench_function("rolling_mean_window_9", |b| {
        b.iter(|| rolling_mean(black_box(&velocities), black_box(9)))
    });
}

criterion_group!(benches, bench_detection, bench_smoothing);
criterion_main!(benches);
