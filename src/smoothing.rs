//! Edge-aware rolling mean over sparse velocity series

/// Centered rolling mean over an optionally-sparse series.
///
/// For each position the mean is taken over all non-null values in the
/// window `[i - window/2, i + window/2]`, clipped to the series bounds, so
/// the window shrinks near the edges instead of padding. A position whose
/// window holds no valid value stays null. A window of 1 or less returns
/// the input unchanged.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window <= 1 {
        return values.to_vec();
    }

    let half = window / 2;
    let n = values.len();

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = usize::min(n, i + half + 1);

            let mut sum = 0.0;
            let mut count = 0usize;
            for v in values[start..end].iter().flatten() {
                sum += v;
                count += 1;
            }

            if count == 0 {
                None
            } else {
                Some(sum / count as f64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_one_is_identity() {
        let series = vec![Some(1.0), None, Some(3.0)];
        assert_eq!(rolling_mean(&series, 1), series);
        assert_eq!(rolling_mean(&series, 0), series);
    }

    #[test]
    fn test_centered_mean() {
        let series: Vec<Option<f64>> = (0..5).map(|i| Some(i as f64)).collect();
        let smoothed = rolling_mean(&series, 3);

        // Interior positions average their full window
        assert_eq!(smoothed[2], Some(2.0));
        // Edges shrink: [0,1] and [3,4]
        assert_eq!(smoothed[0], Some(0.5));
        assert_eq!(smoothed[4], Some(3.5));
    }

    #[test]
    fn test_nulls_are_skipped_not_zeroed() {
        let series = vec![Some(2.0), None, Some(4.0)];
        let smoothed = rolling_mean(&series, 3);

        assert_eq!(smoothed[1], Some(3.0));
    }

    #[test]
    fn test_all_null_window_stays_null() {
        let series = vec![None, None, None, Some(1.0)];
        let smoothed = rolling_mean(&series, 3);

        assert_eq!(smoothed[0], None);
        assert_eq!(smoothed[1], None);
        assert_eq!(smoothed[2], Some(1.0));
    }

    #[test]
    fn test_even_window_uses_floor_half() {
        // window 4 behaves like window 5 here: half = 2 on both sides
        let series: Vec<Option<f64>> = (0..7).map(|i| Some(i as f64)).collect();
        assert_eq!(rolling_mean(&series, 4), rolling_mean(&series, 5));
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_rolling_mean_properties(
            values in prop::collection::vec(prop::option::of(0.0f64..12.0), 0..200),
            window in 0usize..20
        ) {
            let smoothed = rolling_mean(&values, window);

            // Length is always preserved
            prop_assert_eq!(smoothed.len(), values.len());

            for (i, v) in smoothed.iter().enumerate() {
                match v {
                    // A smoothed value stays within the input range
                    Some(v) => prop_assert!((0.0..=12.0).contains(v)),
                    // Null output means no valid input anywhere in the window
                    None => {
                        let half = if window <= 1 { 0 } else { window / 2 };
                        let start = i.saturating_sub(half);
                        let end = usize::min(values.len(), i + half + 1);
                        prop_assert!(values[start..end].iter().all(|v| v.is_none()));
                    }
                }
            }
        }
    }
}
