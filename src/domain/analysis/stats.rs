//! Series reducers used by the built-in analysis modules.

/// Arithmetic mean; `None` for an empty series.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Linear-interpolated percentile between nearest ranks; `None` for an empty
/// series. `q` is a fraction, e.g. `0.95`.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    if values.len() == 1 {
        return Some(values[0]);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = rank - lower as f64;

    Some(sorted[lower] + fraction * (sorted[upper] - sorted[lower]))
}

/// Smallest value; `None` for an empty series.
pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

/// Largest value; `None` for an empty series.
pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_simple_series() {
        assert_eq!(mean(&[100.0, 200.0]), Some(150.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        // rank = 0.95 * 1 = 0.95 -> 100 + 0.95 * (200 - 100)
        assert_eq!(percentile(&[100.0, 200.0], 0.95), Some(195.0));
        // median of five
        assert_eq!(percentile(&[5.0, 1.0, 3.0, 2.0, 4.0], 0.5), Some(3.0));
    }

    #[test]
    fn percentile_edges() {
        assert_eq!(percentile(&[], 0.95), None);
        assert_eq!(percentile(&[42.0], 0.95), Some(42.0));
        assert_eq!(percentile(&[1.0, 2.0, 3.0], 0.0), Some(1.0));
        assert_eq!(percentile(&[1.0, 2.0, 3.0], 1.0), Some(3.0));
    }

    #[test]
    fn min_max_over_unsorted_series() {
        let series = [3.0, 1.0, 2.0];
        assert_eq!(min(&series), Some(1.0));
        assert_eq!(max(&series), Some(3.0));
    }

    #[test]
    fn round2_behaviour() {
        assert_eq!(round2(187.346_678), 187.35);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(150.0), 150.0);
    }
}
