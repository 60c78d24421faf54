//! Bollinger band width.
//!
//! Middle = SMA(n), upper/lower = middle ± k * STD(n) (population),
//! width = (upper - lower) / middle. Hard.

use crate::domain::error::EvalError;
use crate::domain::indicator::stddev::population_std;
use crate::domain::indicator::window::{mean, trailing};

pub fn bbwidth(data: &[f64], window: usize, num_std: f64) -> Result<f64, EvalError> {
    let w = trailing(data, window)?;
    let middle = mean(w);
    if middle == 0.0 {
        return Err(EvalError::numeric("BBWIDTH: moving average is zero"));
    }
    let sd = population_std(w);
    let upper = middle + num_std * sd;
    let lower = middle - num_std * sd;
    Ok((upper - lower) / middle)
}
