/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Compute distribution metrics (mean, median, 25th percentile, 75th percentile) from samples
pub fn compute_metrics(samples: &[f64]) -> Option<(f64, f64, f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let mean = mean(samples)?;
    let median = sorted[n / 2];
    let p25 = sorted[n / 4];
    let p75 = sorted[3 * n / 4];
    Some((mean, median, p25, p75))
}

/// Rough solver runtime in seconds for `decks` matchup decks and `field_entries` weighted
/// field decks.
pub fn estimate_calculation_secs(decks: usize, field_entries: usize) -> u64 {
    let work = (decks * decks * field_entries) as f64;
    (work / 5000.0).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 3.0]), Some(2.0));
    }

    #[test]
    fn metrics_need_two_samples() {
        assert!(compute_metrics(&[0.5]).is_none());
        let (mean, median, p25, p75) = compute_metrics(&[0.4, 0.1, 0.3, 0.2]).unwrap();
        assert!((mean - 0.25).abs() < 1e-12);
        assert_eq!(median, 0.3);
        assert_eq!(p25, 0.2);
        assert_eq!(p75, 0.4);
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_calculation_secs(20, 20), 2);
        assert_eq!(estimate_calculation_secs(0, 20), 0);
    }
}
