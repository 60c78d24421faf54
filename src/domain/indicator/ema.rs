//! EMA (Exponential Moving Average).
//!
//! Seeded at the oldest value of the trailing window, then smoothed over the
//! remaining values with alpha = 2 / (window + 1). Soft: short history gives
//! `None`.

pub fn ema(data: &[f64], window: usize) -> Option<f64> {
    if window == 0 || data.len() < window {
        return None;
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let tail = &data[data.len() - window..];
    let seed = tail[0];
    Some(
        tail[1..]
            .iter()
            .fold(seed, |ema, &value| alpha * value + (1.0 - alpha) * ema),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ema_short_history_is_none() {
        assert_eq!(ema(&[1.0, 2.0], 3), None);
        assert_eq!(ema(&[], 1), None);
    }

    #[test]
    fn ema_window_one_is_latest_value() {
        assert_eq!(ema(&[1.0, 2.0, 7.5], 1), Some(7.5));
    }

    #[test]
    fn ema_constant_series() {
        assert_eq!(ema(&[42.0; 10], 5), Some(42.0));
    }

    #[test]
    fn ema_hand_computed() {
        // window 3 over [2, 4, 6]: alpha = 0.5, seed 2 -> 3 -> 4.5
        let value = ema(&[100.0, 2.0, 4.0, 6.0], 3).unwrap();
        assert_relative_eq!(value, 4.5);
    }
}
