//! Strategy runs: one at a time, or many in parallel.
//!
//! Every run owns its rule engine, history buffers and diagnostics, so
//! parallel runs share nothing.

use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::error::LobtraderError;
use crate::domain::market::MarketSeries;
use crate::domain::rule_eval::{Diagnostics, RuleEngine};
use crate::domain::strategy::StrategyDefinition;
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub strategy: String,
    pub result: BacktestResult,
    pub diagnostics: Diagnostics,
}

pub fn run_strategy(
    series: &MarketSeries,
    strategy: &StrategyDefinition,
    config: &BacktestConfig,
) -> Result<StrategyRun, LobtraderError> {
    let mut engine = RuleEngine::new(strategy.clone())?;
    let result = run_backtest(series, &mut engine, config)?;
    Ok(StrategyRun {
        strategy: strategy.name.clone(),
        result,
        diagnostics: engine.into_diagnostics(),
    })
}

/// Runs each strategy over the same series. Results keep input order.
pub fn run_strategies(
    series: &MarketSeries,
    strategies: &[StrategyDefinition],
    config: &BacktestConfig,
) -> Vec<Result<StrategyRun, LobtraderError>> {
    strategies
        .par_iter()
        .map(|strategy| run_strategy(series, strategy, config))
        .collect()
}

/// Runs one strategy over independently simulated series.
pub fn run_across_series(
    series_set: &[MarketSeries],
    strategy: &StrategyDefinition,
    config: &BacktestConfig,
) -> Vec<Result<StrategyRun, LobtraderError>> {
    series_set
        .par_iter()
        .map(|series| run_strategy(series, strategy, config))
        .collect()
}
