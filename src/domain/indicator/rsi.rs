//! RSI (Relative Strength Index).
//!
//! Simple averages over the last `window` price changes (`window + 1` points):
//! RSI = 100 - (100 / (1 + mean_gain / mean_loss)), exactly 100 with no losses.
//! Hard: short history is `InsufficientData`.

use crate::domain::error::EvalError;
use crate::domain::indicator::window::trailing;

pub fn rsi(data: &[f64], window: usize) -> Result<f64, EvalError> {
    let needed = window.checked_add(1).ok_or(EvalError::InsufficientData {
        needed: window,
        available: data.len(),
    })?;
    let prices = trailing(data, needed)?;

    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in prices.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else if change < 0.0 {
            losses -= change;
        }
    }

    let avg_gain = gains / window as f64;
    let avg_loss = losses / window as f64;
    if avg_loss == 0.0 {
        return Ok(100.0);
    }
    Ok(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}
