//! Sample statistics shared by the return and risk calculators.

use std::cmp::Ordering;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Smallest sample any dispersion or percentile statistic is computed from.
pub const MIN_SAMPLES: usize = 2;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 below [`MIN_SAMPLES`].
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < MIN_SAMPLES {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Percentile `q` in [0, 1] with linear interpolation between closest ranks.
/// Returns `None` below [`MIN_SAMPLES`].
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.len() < MIN_SAMPLES {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Scale a per-period standard deviation to a yearly figure.
pub fn annualize_stddev(stddev: f64) -> f64 {
    stddev * TRADING_DAYS_PER_YEAR.sqrt()
}
