//! Standard deviation over a trailing window.
//!
//! Population form: sqrt(sum((x - mean)^2) / n).

use crate::domain::error::EvalError;
use crate::domain::indicator::window::{mean, trailing};

pub fn std(data: &[f64], window: usize) -> Result<f64, EvalError> {
    let w = trailing(data, window)?;
    Ok(population_std(w))
}

/// Population standard deviation of a whole slice. Zero for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let avg = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - avg;
            diff * diff
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}
