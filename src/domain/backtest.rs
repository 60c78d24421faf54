//! Backtest engine and tick loop.
//!
//! Replays a decision policy over a market series:
//! - the policy sees the tick's own values and strictly prior history
//! - a changed target becomes a trade at the ask (exposure up) or bid (down)
//! - the position held over interval i is the one decided at tick i-1
//! - `|Δposition| × transaction_cost` is charged in the period of the change;
//!   a change at tick 0 is charged in period 1

use crate::domain::error::LobtraderError;
use crate::domain::market::{MarketSeries, MarketTick, MarketValues, TickHistory};
use crate::domain::metrics::{Metrics, cumulative_returns_pct};
use crate::domain::position::Position;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Fraction of one unit charged per unit of position change.
    pub transaction_cost: f64,
    /// Trailing values kept per variable.
    pub history_length: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            transaction_cost: 0.0001,
            history_length: 100,
        }
    }
}

/// What a policy may look at when deciding the target for one tick.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub index: usize,
    pub time: f64,
    pub current: &'a MarketValues,
    pub history: &'a TickHistory,
    pub position: Position,
}

/// Produces the target position for a tick. `None` keeps the current position.
pub trait DecisionPolicy {
    fn target_position(&mut self, ctx: &DecisionContext<'_>) -> Option<i32>;
}

impl<F> DecisionPolicy for F
where
    F: FnMut(&DecisionContext<'_>) -> Option<i32>,
{
    fn target_position(&mut self, ctx: &DecisionContext<'_>) -> Option<i32> {
        self(ctx)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub time: f64,
    pub position_before: Position,
    pub position_after: Position,
    /// Signed change in position.
    pub size: i8,
    pub price: f64,
}

impl Trade {
    fn new(tick: &MarketTick, before: Position, after: Position) -> Self {
        let size = before.delta_to(after);
        Trade {
            time: tick.time,
            position_before: before,
            position_after: after,
            size,
            price: if size > 0 { tick.best_ask } else { tick.best_bid },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub times: Vec<f64>,
    pub mids: Vec<f64>,
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub returns: Vec<f64>,
    /// `(growth - 1) * 100` at every tick.
    pub cumulative_returns: Vec<f64>,
    pub metrics: Metrics,
}

pub fn run_backtest<P>(
    series: &MarketSeries,
    policy: &mut P,
    config: &BacktestConfig,
) -> Result<BacktestResult, LobtraderError>
where
    P: DecisionPolicy + ?Sized,
{
    let valid = series.filter_valid();
    if valid.len() < 2 {
        return Err(LobtraderError::DegenerateInput {
            valid_ticks: valid.len(),
        });
    }
    if valid.len() < series.len() {
        debug!(
            dropped = series.len() - valid.len(),
            "dropped ticks with missing mid or spread"
        );
    }

    let mut history = TickHistory::new(config.history_length.max(1));
    let mut position = Position::Flat;
    let mut positions = Vec::with_capacity(valid.len());
    let mut trades = Vec::new();

    for (index, tick) in valid.ticks.iter().enumerate() {
        let current = MarketValues::from_tick(tick, history.last_mid());
        let ctx = DecisionContext {
            index,
            time: tick.time,
            current: &current,
            history: &history,
            position,
        };

        if let Some(target) = policy.target_position(&ctx) {
            let next = Position::from_target(target);
            if next != position {
                let trade = Trade::new(tick, position, next);
                debug!(
                    time = trade.time,
                    size = trade.size,
                    price = trade.price,
                    "trade"
                );
                trades.push(trade);
                position = next;
            }
        }

        positions.push(position);
        history.record(&current);
    }

    let mids: Vec<f64> = valid.ticks.iter().map(|t| t.mid).collect();
    let returns = strategy_returns(&mids, &positions, config.transaction_cost);
    let cumulative_returns = cumulative_returns_pct(&returns);
    let metrics = Metrics::compute(&returns, &positions, trades.len());

    info!(
        ticks = mids.len(),
        trades = trades.len(),
        total_return_pct = metrics.total_return_pct,
        "backtest complete"
    );

    Ok(BacktestResult {
        times: valid.ticks.iter().map(|t| t.time).collect(),
        mids,
        positions,
        trades,
        returns,
        cumulative_returns,
        metrics,
    })
}

/// Simple return between consecutive mids; 0 for the first tick.
pub fn price_returns(mids: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(mids.len());
    if mids.is_empty() {
        return out;
    }
    out.push(0.0);
    for pair in mids.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        out.push(if prev != 0.0 { (curr - prev) / prev } else { 0.0 });
    }
    out
}

/// Lagged, cost-adjusted strategy return per period.
pub fn strategy_returns(mids: &[f64], positions: &[Position], transaction_cost: f64) -> Vec<f64> {
    let prices = price_returns(mids);
    let mut out = vec![0.0; prices.len()];
    for i in 1..prices.len().min(positions.len()) {
        let held = positions[i - 1].as_f64();
        let mut change = f64::from(positions[i - 1].delta_to(positions[i]).unsigned_abs());
        if i == 1 {
            change += f64::from(positions[0].as_i8().unsigned_abs());
        }
        out[i] = held * prices[i] - change * transaction_cost;
    }
    out
}

/// Benchmark: long one unit from the first tick, no costs.
pub fn buy_and_hold(series: &MarketSeries) -> Result<BacktestResult, LobtraderError> {
    let mut always_long = |_: &DecisionContext<'_>| Some(1);
    run_backtest(
        series,
        &mut always_long,
        &BacktestConfig {
            transaction_cost: 0.0,
            history_length: 1,
        },
    )
}
