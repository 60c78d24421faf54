//! Momentum: fractional change of the latest value against the value exactly
//! `window` steps earlier. Needs `window + 1` points; soft.

use crate::domain::error::EvalError;

pub fn momentum(data: &[f64], window: usize) -> Result<Option<f64>, EvalError> {
    match window.checked_add(1) {
        Some(needed) if data.len() >= needed => {}
        _ => return Ok(None),
    }
    let latest = data[data.len() - 1];
    let base = data[data.len() - 1 - window];
    if base == 0.0 {
        return Err(EvalError::numeric("MOMENTUM: base value is zero"));
    }
    Ok(Some((latest - base) / base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn momentum_needs_window_plus_one() {
        assert_eq!(momentum(&[1.0, 2.0, 3.0], 3), Ok(None));
        assert!(momentum(&[1.0, 2.0, 3.0, 4.0], 3).unwrap().is_some());
    }

    #[test]
    fn momentum_huge_window_is_indeterminate() {
        assert_eq!(momentum(&[1.0, 2.0, 3.0], usize::MAX), Ok(None));
    }

    #[test]
    fn momentum_constant_series_is_zero() {
        assert_eq!(momentum(&[5.0; 6], 5), Ok(Some(0.0)));
    }

    #[test]
    fn momentum_increasing_series_is_positive() {
        let data = [100.0, 101.0, 102.0, 103.0];
        let value = momentum(&data, 2).unwrap().unwrap();
        assert!(value > 0.0);
        assert_relative_eq!(value, (103.0 - 101.0) / 101.0);
    }

    #[test]
    fn momentum_zero_base_is_numeric_error() {
        let err = momentum(&[0.0, 1.0], 1).unwrap_err();
        assert!(matches!(err, EvalError::Numeric { .. }));
    }
}
