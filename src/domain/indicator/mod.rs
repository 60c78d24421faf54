//! Indicator function library.
//!
//! This module provides the closed set of functions an expression may call:
//! - `IndicatorFunction`: function identity, signature and dispatch
//! - `Argument`: a bound call argument, either a named series or a scalar
//!
//! Windowed functions read the trailing `window` observations of a series
//! (`window + 1` where a lag is needed). Hard functions fail with
//! `InsufficientData` when history is short; soft functions return `None`
//! so an under-warmed indicator simply does not trigger.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod math;
pub mod momentum;
pub mod rsi;
pub mod stddev;
pub mod window;

use crate::domain::error::EvalError;
use crate::domain::market::{History, Variable};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorFunction {
    Sma,
    Ema,
    Std,
    Min,
    Max,
    Abs,
    Sqrt,
    Exp,
    Log,
    Momentum,
    Percentile,
    Sum,
    Mean,
    Rsi,
    Atr,
    BbWidth,
}

/// One formal parameter of an indicator function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    pub name: &'static str,
    /// `None` means the argument is required.
    pub default: Option<f64>,
    /// The argument names a history series rather than a number.
    pub series: bool,
}

const fn series(name: &'static str) -> Param {
    Param {
        name,
        default: None,
        series: true,
    }
}

const fn required(name: &'static str) -> Param {
    Param {
        name,
        default: None,
        series: false,
    }
}

const fn optional(name: &'static str, default: f64) -> Param {
    Param {
        name,
        default: Some(default),
        series: false,
    }
}

const WINDOWED: &[Param] = &[series("data"), required("window")];
const PERCENTILE: &[Param] = &[series("data"), required("window"), required("pct")];
const RSI: &[Param] = &[series("data"), optional("window", 14.0)];
const BBWIDTH: &[Param] = &[
    series("data"),
    optional("window", 20.0),
    optional("num_std", 2.0),
];
const ATR_SHORT: &[Param] = &[series("data"), optional("window", 14.0)];
const ATR_LONG: &[Param] = &[
    series("high"),
    series("low"),
    series("close"),
    optional("window", 14.0),
];
const SCALAR: &[Param] = &[required("x")];

/// A call argument after the evaluator has resolved it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Argument {
    /// A bare variable name, looked up in history by name. Carries the
    /// variable's current value for scalar math functions.
    Series { variable: Variable, current: f64 },
    /// A computed number; `None` is indeterminate.
    Scalar(Option<f64>),
}

impl IndicatorFunction {
    pub const ALL: [IndicatorFunction; 16] = [
        IndicatorFunction::Sma,
        IndicatorFunction::Ema,
        IndicatorFunction::Std,
        IndicatorFunction::Min,
        IndicatorFunction::Max,
        IndicatorFunction::Abs,
        IndicatorFunction::Sqrt,
        IndicatorFunction::Exp,
        IndicatorFunction::Log,
        IndicatorFunction::Momentum,
        IndicatorFunction::Percentile,
        IndicatorFunction::Sum,
        IndicatorFunction::Mean,
        IndicatorFunction::Rsi,
        IndicatorFunction::Atr,
        IndicatorFunction::BbWidth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IndicatorFunction::Sma => "SMA",
            IndicatorFunction::Ema => "EMA",
            IndicatorFunction::Std => "STD",
            IndicatorFunction::Min => "MIN",
            IndicatorFunction::Max => "MAX",
            IndicatorFunction::Abs => "ABS",
            IndicatorFunction::Sqrt => "SQRT",
            IndicatorFunction::Exp => "EXP",
            IndicatorFunction::Log => "LOG",
            IndicatorFunction::Momentum => "MOMENTUM",
            IndicatorFunction::Percentile => "PERCENTILE",
            IndicatorFunction::Sum => "SUM",
            IndicatorFunction::Mean => "MEAN",
            IndicatorFunction::Rsi => "RSI",
            IndicatorFunction::Atr => "ATR",
            IndicatorFunction::BbWidth => "BBWIDTH",
        }
    }

    /// Scalar math functions take a single number rather than a series.
    pub fn is_scalar_math(self) -> bool {
        matches!(
            self,
            IndicatorFunction::Abs
                | IndicatorFunction::Sqrt
                | IndicatorFunction::Exp
                | IndicatorFunction::Log
        )
    }

    pub fn is_windowed(self) -> bool {
        !self.is_scalar_math()
    }

    /// Soft functions return indeterminate instead of failing on short history.
    pub fn is_soft(self) -> bool {
        matches!(
            self,
            IndicatorFunction::Ema | IndicatorFunction::Momentum | IndicatorFunction::Atr
        )
    }

    /// Formal parameters for a call with `positional` positional arguments.
    pub fn signature(self, positional: usize) -> &'static [Param] {
        match self {
            IndicatorFunction::Abs
            | IndicatorFunction::Sqrt
            | IndicatorFunction::Exp
            | IndicatorFunction::Log => SCALAR,
            IndicatorFunction::Percentile => PERCENTILE,
            IndicatorFunction::Rsi => RSI,
            IndicatorFunction::BbWidth => BBWIDTH,
            IndicatorFunction::Atr if positional >= 3 => ATR_LONG,
            IndicatorFunction::Atr => ATR_SHORT,
            _ => WINDOWED,
        }
    }

    /// Positional index of the window argument for a call of this shape.
    pub fn window_index(self, positional: usize) -> Option<usize> {
        self.signature(positional)
            .iter()
            .position(|p| p.name == "window")
    }

    pub fn default_window(self) -> Option<usize> {
        self.signature(0)
            .iter()
            .find(|p| p.name == "window")
            .and_then(|p| p.default)
            .map(|w| w as usize)
    }

    /// Applies the function to bound arguments.
    ///
    /// Returns `Ok(None)` when the result is indeterminate: an indeterminate
    /// argument, a soft function short of history, or a scalar function outside
    /// its domain.
    pub fn call(
        self,
        args: &[Argument],
        keywords: &[(String, Argument)],
        history: &dyn History,
    ) -> Result<Option<f64>, EvalError> {
        let bound = self.bind(args, keywords)?;

        if self.is_scalar_math() {
            let x = match bound.scalar(0)? {
                Some(x) => x,
                None => return Ok(None),
            };
            return Ok(match self {
                IndicatorFunction::Abs => Some(math::abs(x)),
                IndicatorFunction::Sqrt => math::sqrt(x),
                IndicatorFunction::Exp => math::exp(x),
                _ => math::log(x),
            });
        }

        let window_slot = bound
            .params
            .iter()
            .position(|p| p.name == "window")
            .unwrap_or(1);
        let window = match bound.scalar(window_slot)? {
            Some(w) => self.check_window(w)?,
            None => return Ok(None),
        };

        let variable = bound.series(0)?;
        if self == IndicatorFunction::Atr {
            // Spread stands in for the true range, whatever series were named.
            let spread = history.series(Variable::Spread);
            return Ok(spread.and_then(|data| atr::atr(data, window)));
        }

        let data = match history.series(variable) {
            Some(data) => data,
            None if self.is_soft() => return Ok(None),
            None => {
                return Err(EvalError::InsufficientData {
                    needed: window,
                    available: 0,
                })
            }
        };

        match self {
            IndicatorFunction::Sma | IndicatorFunction::Mean => window::sma(data, window).map(Some),
            IndicatorFunction::Sum => window::sum(data, window).map(Some),
            IndicatorFunction::Min => window::min(data, window).map(Some),
            IndicatorFunction::Max => window::max(data, window).map(Some),
            IndicatorFunction::Std => stddev::std(data, window).map(Some),
            IndicatorFunction::Ema => Ok(ema::ema(data, window)),
            IndicatorFunction::Momentum => momentum::momentum(data, window),
            IndicatorFunction::Rsi => rsi::rsi(data, window).map(Some),
            IndicatorFunction::Percentile => {
                let pct = match bound.scalar(2)? {
                    Some(pct) => pct,
                    None => return Ok(None),
                };
                if !(0.0..=1.0).contains(&pct) {
                    return Err(EvalError::invalid(format!(
                        "PERCENTILE() pct must be between 0 and 1, got {}",
                        pct
                    )));
                }
                window::percentile(data, window, pct).map(Some)
            }
            IndicatorFunction::BbWidth => {
                let num_std = match bound.scalar(2)? {
                    Some(k) => k,
                    None => return Ok(None),
                };
                bollinger::bbwidth(data, window, num_std).map(Some)
            }
            _ => Err(EvalError::invalid(format!(
                "{}() cannot be applied to a series",
                self.name()
            ))),
        }
    }

    fn check_window(self, value: f64) -> Result<usize, EvalError> {
        if value.is_finite() && value >= 1.0 && value.fract() == 0.0 && value <= usize::MAX as f64 {
            Ok(value as usize)
        } else {
            Err(EvalError::invalid(format!(
                "{}() window must be a positive integer, got {}",
                self.name(),
                value
            )))
        }
    }

    fn bind<'a>(
        self,
        args: &'a [Argument],
        keywords: &'a [(String, Argument)],
    ) -> Result<Bound<'a>, EvalError> {
        let params = self.signature(args.len());
        if args.len() > params.len() {
            return Err(EvalError::invalid(format!(
                "{}() takes at most {} arguments ({} given)",
                self.name(),
                params.len(),
                args.len()
            )));
        }

        let mut slots: Vec<Option<&'a Argument>> = vec![None; params.len()];
        for (slot, arg) in slots.iter_mut().zip(args) {
            *slot = Some(arg);
        }

        for (name, arg) in keywords {
            let idx = params.iter().position(|p| p.name == name).ok_or_else(|| {
                EvalError::invalid(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    self.name(),
                    name
                ))
            })?;
            if slots[idx].is_some() {
                return Err(EvalError::invalid(format!(
                    "{}() got multiple values for argument '{}'",
                    self.name(),
                    name
                )));
            }
            slots[idx] = Some(arg);
        }

        for (param, slot) in params.iter().zip(&slots) {
            if slot.is_none() && param.default.is_none() {
                return Err(EvalError::invalid(format!(
                    "{}() missing required argument '{}'",
                    self.name(),
                    param.name
                )));
            }
        }

        Ok(Bound {
            function: self,
            params,
            slots,
        })
    }
}

struct Bound<'a> {
    function: IndicatorFunction,
    params: &'static [Param],
    slots: Vec<Option<&'a Argument>>,
}

impl Bound<'_> {
    /// Numeric value of a scalar parameter. A series passed to a scalar math
    /// function stands for its current value.
    fn scalar(&self, idx: usize) -> Result<Option<f64>, EvalError> {
        let param = &self.params[idx];
        match self.slots[idx] {
            None => Ok(param.default),
            Some(Argument::Scalar(value)) => Ok(*value),
            Some(Argument::Series { current, .. }) if self.function.is_scalar_math() => {
                Ok(Some(*current))
            }
            Some(Argument::Series { variable, .. }) => Err(EvalError::invalid(format!(
                "{}() argument '{}' must be a number, got variable '{}'",
                self.function.name(),
                param.name,
                variable
            ))),
        }
    }

    fn series(&self, idx: usize) -> Result<Variable, EvalError> {
        match self.slots[idx] {
            Some(Argument::Series { variable, .. }) => Ok(*variable),
            _ => Err(EvalError::invalid(format!(
                "{}() expects a variable name for '{}'",
                self.function.name(),
                self.params[idx].name
            ))),
        }
    }
}

impl fmt::Display for IndicatorFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl serde::Serialize for IndicatorFunction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for IndicatorFunction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorFunction::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or(())
    }
}
