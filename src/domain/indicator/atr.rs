//! ATR approximation for quote data.
//!
//! There are no bars here, so the true range is approximated by the quoted
//! spread: ATR(n) = mean of the last n spreads. Soft.

pub fn atr(spread: &[f64], window: usize) -> Option<f64> {
    if window == 0 || spread.len() < window {
        return None;
    }
    let tail = &spread[spread.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}
