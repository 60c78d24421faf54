#![allow(dead_code)]

use lobtrader::domain::backtest::BacktestConfig;
use lobtrader::domain::error::LobtraderError;
use lobtrader::domain::market::{MarketSeries, MarketTick};
use lobtrader::domain::strategy::{ConditionSpec, FunctionSpec, RuleSpec, StrategySpec};
use lobtrader::ports::market_data_port::MarketDataPort;
use std::io::Write;
use std::path::Path;

pub struct MockMarketPort {
    pub series: MarketSeries,
    pub error: Option<String>,
}

impl MockMarketPort {
    pub fn new() -> Self {
        Self {
            series: MarketSeries::default(),
            error: None,
        }
    }

    pub fn with_series(mut self, series: MarketSeries) -> Self {
        self.series = series;
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketPort {
    fn fetch_series(&self) -> Result<MarketSeries, LobtraderError> {
        if let Some(reason) = &self.error {
            return Err(LobtraderError::MarketData {
                reason: reason.clone(),
            });
        }
        Ok(self.series.clone())
    }
}

pub fn zero_cost() -> BacktestConfig {
    BacktestConfig {
        transaction_cost: 0.0,
        ..BacktestConfig::default()
    }
}

pub fn with_cost(transaction_cost: f64) -> BacktestConfig {
    BacktestConfig {
        transaction_cost,
        ..BacktestConfig::default()
    }
}

/// Five ticks, spread 0.2, that take `mid - SMA(mid, 2)` through one dip.
pub fn dip_series() -> MarketSeries {
    MarketSeries::from_mids(&[100.0, 101.0, 99.0, 100.0, 102.0], 0.2)
}

/// Buy when mid is below its 2-tick mean, flatten once it is back.
pub fn dip_strategy() -> StrategySpec {
    StrategySpec {
        name: Some("Dip buyer".into()),
        functions: vec![FunctionSpec::new("f", "Distance", "mid - SMA(mid, 2)")],
        entry_rules: vec![RuleSpec::new(
            vec![ConditionSpec::new("f", "<", 0.0)],
            "AND",
            "BUY",
        )],
        exit_rules: vec![RuleSpec::new(
            vec![ConditionSpec::new("f", ">=", 0.0)],
            "AND",
            "FLAT",
        )],
    }
}

/// Ten ticks at 100, five at 99, five more at 99, then back to 100.
pub fn mean_reversion_series() -> MarketSeries {
    let mut mids = vec![100.0; 10];
    mids.extend(vec![99.0; 10]);
    mids.extend(vec![100.0; 5]);
    MarketSeries::from_mids(&mids, 0.02)
}

pub fn mean_reversion_strategy() -> StrategySpec {
    StrategySpec {
        name: Some("SMA mean reversion".into()),
        functions: vec![FunctionSpec::new("ratio", "Mid over SMA", "mid / SMA(mid, 5)")],
        entry_rules: vec![RuleSpec::new(
            vec![ConditionSpec::new("ratio", "<", 0.998)],
            "AND",
            "BUY",
        )],
        exit_rules: vec![RuleSpec::new(
            vec![
                ConditionSpec::new("ratio", ">=", 0.9995),
                ConditionSpec::new("ratio", "<=", 1.0005),
            ],
            "AND",
            "FLAT",
        )],
    }
}

pub fn tick(time: f64, mid: f64, spread: f64) -> MarketTick {
    MarketTick::from_mid(time, mid, spread)
}

pub fn series_to_csv(series: &MarketSeries) -> String {
    let mut out = String::from("t,mid,spread,best_bid,best_ask,quantity\n");
    for t in &series.ticks {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            t.time, t.mid, t.spread, t.best_bid, t.best_ask, t.volume
        ));
    }
    out
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    path
}

pub fn write_strategy(dir: &Path, name: &str, spec: &StrategySpec) -> std::path::PathBuf {
    write_file(dir, name, &serde_json::to_string_pretty(spec).unwrap())
}
