//! Aggregate statistics with the same semantics as the analytical store.
//!
//! Empty inputs yield NaN, as the store's `avg` and quantile functions do.

/// Arithmetic mean.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Quantile at `level` (0.0..=1.0) using linear interpolation between the
/// two closest ranks (position `level * (n - 1)` in sorted order).
pub fn quantile(values: &[f64], level: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = level.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// 95th percentile.
pub fn p95(values: &[f64]) -> f64 {
    quantile(values, 0.95)
}

/// Maps NaN and infinities to `None`.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
