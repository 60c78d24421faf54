//! Scalar math functions. Out-of-domain inputs are indeterminate.

/// EXP arguments at or above this are treated as overflow.
pub const EXP_LIMIT: f64 = 100.0;

pub fn abs(x: f64) -> f64 {
    x.abs()
}

pub fn sqrt(x: f64) -> Option<f64> {
    (x >= 0.0).then(|| x.sqrt())
}

pub fn exp(x: f64) -> Option<f64> {
    (x < EXP_LIMIT).then(|| x.exp())
}

pub fn log(x: f64) -> Option<f64> {
    (x > 0.0).then(|| x.ln())
}
