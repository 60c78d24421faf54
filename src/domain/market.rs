//! Market ticks, the variable vocabulary, and trailing history buffers.
//!
//! - `Variable`: the closed set of names an expression may reference
//! - `MarketTick` / `MarketSeries`: the replayed quote series
//! - `MarketValues`: current scalar value of every variable at one tick
//! - `History` / `TickHistory`: trailing per-variable series, strictly prior ticks only

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variable {
    Mid,
    Spread,
    BestBid,
    BestAsk,
    Volume,
    Returns,
}

impl Variable {
    pub const ALL: [Variable; 6] = [
        Variable::Mid,
        Variable::Spread,
        Variable::BestBid,
        Variable::BestAsk,
        Variable::Volume,
        Variable::Returns,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variable::Mid => "mid",
            Variable::Spread => "spread",
            Variable::BestBid => "best_bid",
            Variable::BestAsk => "best_ask",
            Variable::Volume => "volume",
            Variable::Returns => "returns",
        }
    }

    fn index(self) -> usize {
        match self {
            Variable::Mid => 0,
            Variable::Spread => 1,
            Variable::BestBid => 2,
            Variable::BestAsk => 3,
            Variable::Volume => 4,
            Variable::Returns => 5,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl serde::Serialize for Variable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketTick {
    pub time: f64,
    pub mid: f64,
    pub spread: f64,
    pub best_bid: f64,
    pub best_ask: f64,
    pub volume: f64,
}

impl MarketTick {
    /// Tick with quotes derived from mid and spread.
    pub fn from_mid(time: f64, mid: f64, spread: f64) -> Self {
        Self {
            time,
            mid,
            spread,
            best_bid: mid - spread / 2.0,
            best_ask: mid + spread / 2.0,
            volume: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.mid.is_nan() && !self.spread.is_nan()
    }
}

/// Time-ordered tick series as produced by the upstream simulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSeries {
    pub ticks: Vec<MarketTick>,
}

impl MarketSeries {
    pub fn new(ticks: Vec<MarketTick>) -> Self {
        Self { ticks }
    }

    /// Series built from mids with a constant spread, times 0, 1, 2, ...
    pub fn from_mids(mids: &[f64], spread: f64) -> Self {
        Self::new(
            mids.iter()
                .enumerate()
                .map(|(i, &mid)| MarketTick::from_mid(i as f64, mid, spread))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Drops ticks whose mid or spread is NaN. A NaN quote on a kept tick is
    /// rebuilt from mid and spread.
    pub fn filter_valid(&self) -> MarketSeries {
        let ticks = self
            .ticks
            .iter()
            .filter(|t| t.is_valid())
            .map(|t| {
                let mut tick = *t;
                if tick.best_bid.is_nan() {
                    tick.best_bid = tick.mid - tick.spread / 2.0;
                }
                if tick.best_ask.is_nan() {
                    tick.best_ask = tick.mid + tick.spread / 2.0;
                }
                if tick.volume.is_nan() {
                    tick.volume = 0.0;
                }
                tick
            })
            .collect();
        MarketSeries { ticks }
    }
}

/// Current scalar value of each variable at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketValues {
    pub mid: f64,
    pub spread: f64,
    pub best_bid: f64,
    pub best_ask: f64,
    pub volume: f64,
    pub returns: f64,
}

impl MarketValues {
    pub fn from_tick(tick: &MarketTick, previous_mid: Option<f64>) -> Self {
        let returns = match previous_mid {
            Some(prev) if prev != 0.0 => (tick.mid - prev) / prev,
            _ => 0.0,
        };
        Self {
            mid: tick.mid,
            spread: tick.spread,
            best_bid: tick.best_bid,
            best_ask: tick.best_ask,
            volume: tick.volume,
            returns,
        }
    }

    pub fn get(&self, variable: Variable) -> f64 {
        match variable {
            Variable::Mid => self.mid,
            Variable::Spread => self.spread,
            Variable::BestBid => self.best_bid,
            Variable::BestAsk => self.best_ask,
            Variable::Volume => self.volume,
            Variable::Returns => self.returns,
        }
    }
}

/// Read-only access to trailing history, oldest first.
pub trait History {
    fn series(&self, variable: Variable) -> Option<&[f64]>;
}

impl History for HashMap<Variable, Vec<f64>> {
    fn series(&self, variable: Variable) -> Option<&[f64]> {
        self.get(&variable).map(Vec::as_slice)
    }
}

/// Append-only buffer exposing at most `capacity` trailing values as a slice.
#[derive(Debug, Clone)]
struct SeriesBuffer {
    values: Vec<f64>,
    capacity: usize,
}

impl SeriesBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity.saturating_mul(2)),
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        self.values.push(value);
        // Compact once the backing vec holds twice the window.
        if self.values.len() >= self.capacity.saturating_mul(2).max(2) {
            let excess = self.values.len() - self.capacity;
            self.values.drain(..excess);
        }
    }

    fn as_slice(&self) -> &[f64] {
        let start = self.values.len().saturating_sub(self.capacity);
        &self.values[start..]
    }
}

/// Trailing history of every variable for one backtest run.
#[derive(Debug, Clone)]
pub struct TickHistory {
    buffers: Vec<SeriesBuffer>,
    last_mid: Option<f64>,
}

impl TickHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Variable::ALL
                .iter()
                .map(|_| SeriesBuffer::new(capacity))
                .collect(),
            last_mid: None,
        }
    }

    /// Mid of the most recently recorded tick.
    pub fn last_mid(&self) -> Option<f64> {
        self.last_mid
    }

    pub fn len(&self) -> usize {
        self.buffers[Variable::Mid.index()].as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record(&mut self, values: &MarketValues) {
        for variable in Variable::ALL {
            self.buffers[variable.index()].push(values.get(variable));
        }
        self.last_mid = Some(values.mid);
    }
}

impl History for TickHistory {
    fn series(&self, variable: Variable) -> Option<&[f64]> {
        Some(self.buffers[variable.index()].as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_names_round_trip() {
        for v in Variable::ALL {
            assert_eq!(v.name().parse::<Variable>(), Ok(v));
        }
        assert!("price".parse::<Variable>().is_err());
        assert!("Mid".parse::<Variable>().is_err());
    }

    #[test]
    fn from_mid_derives_quotes() {
        let tick = MarketTick::from_mid(0.0, 100.0, 0.2);
        assert!((tick.best_bid - 99.9).abs() < 1e-12);
        assert!((tick.best_ask - 100.1).abs() < 1e-12);
    }

    #[test]
    fn filter_drops_nan_mid_and_spread() {
        let mut ticks = MarketSeries::from_mids(&[100.0, f64::NAN, 101.0, 102.0], 0.2).ticks;
        ticks[3].spread = f64::NAN;
        let series = MarketSeries::new(ticks).filter_valid();
        assert_eq!(series.len(), 2);
        assert_eq!(series.ticks[0].mid, 100.0);
        assert_eq!(series.ticks[1].mid, 101.0);
    }

    #[test]
    fn filter_rebuilds_missing_quotes() {
        let mut tick = MarketTick::from_mid(1.0, 50.0, 1.0);
        tick.best_bid = f64::NAN;
        tick.best_ask = f64::NAN;
        let series = MarketSeries::new(vec![tick]).filter_valid();
        assert_eq!(series.ticks[0].best_bid, 49.5);
        assert_eq!(series.ticks[0].best_ask, 50.5);
    }

    #[test]
    fn values_returns_against_previous_mid() {
        let tick = MarketTick::from_mid(1.0, 101.0, 0.2);
        let first = MarketValues::from_tick(&tick, None);
        assert_eq!(first.returns, 0.0);
        let next = MarketValues::from_tick(&tick, Some(100.0));
        assert!((next.returns - 0.01).abs() < 1e-12);
    }

    #[test]
    fn history_keeps_trailing_window() {
        let mut history = TickHistory::new(3);
        for i in 0..10 {
            let tick = MarketTick::from_mid(i as f64, i as f64, 0.1);
            history.record(&MarketValues::from_tick(&tick, history.last_mid()));
        }
        assert_eq!(history.series(Variable::Mid).unwrap(), &[7.0, 8.0, 9.0]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.last_mid(), Some(9.0));
    }

    #[test]
    fn history_starts_empty() {
        let history = TickHistory::new(100);
        assert!(history.is_empty());
        assert_eq!(history.series(Variable::Spread).unwrap().len(), 0);
    }
}
