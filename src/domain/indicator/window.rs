//! Plain window statistics: SMA/MEAN, SUM, MIN, MAX, PERCENTILE.
//!
//! All of these are hard: fewer than `window` points is `InsufficientData`.

use crate::domain::error::EvalError;

/// The trailing `window` values of `data`.
pub fn trailing(data: &[f64], window: usize) -> Result<&[f64], EvalError> {
    if data.len() < window {
        return Err(EvalError::InsufficientData {
            needed: window,
            available: data.len(),
        });
    }
    Ok(&data[data.len() - window..])
}

/// Mean taken as an offset from the first value, so a window of identical
/// values averages to exactly that value.
pub fn mean(values: &[f64]) -> f64 {
    match values.first() {
        None => 0.0,
        Some(&anchor) => {
            anchor + values.iter().map(|v| v - anchor).sum::<f64>() / values.len() as f64
        }
    }
}

pub fn sma(data: &[f64], window: usize) -> Result<f64, EvalError> {
    Ok(mean(trailing(data, window)?))
}

pub fn sum(data: &[f64], window: usize) -> Result<f64, EvalError> {
    Ok(trailing(data, window)?.iter().sum())
}

pub fn min(data: &[f64], window: usize) -> Result<f64, EvalError> {
    Ok(trailing(data, window)?
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min))
}

pub fn max(data: &[f64], window: usize) -> Result<f64, EvalError> {
    Ok(trailing(data, window)?
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max))
}

/// Quantile at fraction `pct` with linear interpolation between the two
/// nearest ranks.
pub fn percentile(data: &[f64], window: usize, pct: f64) -> Result<f64, EvalError> {
    let mut sorted = trailing(data, window)?.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = pct * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Ok(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sma_of_identical_values_is_exact() {
        let data = [0.1; 7];
        assert_eq!(sma(&data, 7).unwrap(), 0.1);
        let data = [101.25; 50];
        assert_eq!(sma(&data, 50).unwrap(), 101.25);
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0]), 1.5);
    }

    #[test]
    fn sma_uses_trailing_window_only() {
        let data = [1000.0, 1.0, 2.0, 3.0];
        assert_eq!(sma(&data, 3).unwrap(), 2.0);
    }

    #[test]
    fn short_history_is_insufficient() {
        let data = [1.0, 2.0];
        assert_eq!(
            sma(&data, 3),
            Err(EvalError::InsufficientData {
                needed: 3,
                available: 2
            })
        );
        assert!(sum(&data, 3).is_err());
        assert!(min(&data, 3).is_err());
        assert!(max(&data, 3).is_err());
        assert!(percentile(&data, 3, 0.5).is_err());
    }

    #[test]
    fn sum_min_max() {
        let data = [5.0, 3.0, 8.0, -1.0, 4.0];
        assert_eq!(sum(&data, 3).unwrap(), 11.0);
        assert_eq!(min(&data, 3).unwrap(), -1.0);
        assert_eq!(max(&data, 3).unwrap(), 8.0);
        assert_eq!(max(&data, 5).unwrap(), 8.0);
    }

    #[test]
    fn percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 4, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&data, 4, 1.0).unwrap(), 4.0);
        assert_relative_eq!(percentile(&data, 4, 0.5).unwrap(), 2.5);
        assert_relative_eq!(percentile(&data, 4, 0.9).unwrap(), 3.7, epsilon = 1e-12);
    }

    #[test]
    fn percentile_ignores_order() {
        let data = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(percentile(&data, 4, 0.25).unwrap(), 1.75, epsilon = 1e-12);
    }
}
