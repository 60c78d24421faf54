//! JSON adapters: market column arrays and strategy documents.

use crate::domain::error::LobtraderError;
use crate::domain::market::{MarketSeries, MarketTick};
use crate::domain::strategy::StrategySpec;
use crate::ports::market_data_port::MarketDataPort;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Simulator output: one equal-length array per field, `null` for a missing value.
#[derive(Debug, Deserialize)]
struct MarketColumns {
    t: Vec<Option<f64>>,
    mid: Vec<Option<f64>>,
    spread: Vec<Option<f64>>,
    #[serde(default)]
    best_bid: Option<Vec<Option<f64>>>,
    #[serde(default)]
    best_ask: Option<Vec<Option<f64>>>,
    #[serde(default)]
    quantity: Option<Vec<Option<f64>>>,
}

impl MarketColumns {
    fn into_series(self) -> Result<MarketSeries, LobtraderError> {
        let n = self.t.len();
        let optional = [
            ("best_bid", self.best_bid.as_ref()),
            ("best_ask", self.best_ask.as_ref()),
            ("quantity", self.quantity.as_ref()),
        ];
        let lengths = [("mid", Some(&self.mid)), ("spread", Some(&self.spread))]
            .into_iter()
            .chain(optional)
            .filter_map(|(name, col)| col.map(|c| (name, c.len())));
        for (name, len) in lengths {
            if len != n {
                return Err(LobtraderError::MarketData {
                    reason: format!("column {} has {} values, expected {}", name, len, n),
                });
            }
        }

        let value = |col: Option<&Vec<Option<f64>>>, i: usize, missing: f64| {
            col.and_then(|c| c[i]).unwrap_or(missing)
        };
        let ticks = (0..n)
            .map(|i| MarketTick {
                time: self.t[i].unwrap_or(f64::NAN),
                mid: self.mid[i].unwrap_or(f64::NAN),
                spread: self.spread[i].unwrap_or(f64::NAN),
                best_bid: value(self.best_bid.as_ref(), i, f64::NAN),
                best_ask: value(self.best_ask.as_ref(), i, f64::NAN),
                volume: value(self.quantity.as_ref(), i, 0.0),
            })
            .collect();
        Ok(MarketSeries::new(ticks))
    }
}

pub struct JsonMarketAdapter {
    path: PathBuf,
}

impl JsonMarketAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn parse(content: &str) -> Result<MarketSeries, LobtraderError> {
        let columns: MarketColumns =
            serde_json::from_str(content).map_err(|e| LobtraderError::MarketData {
                reason: format!("invalid market JSON: {}", e),
            })?;
        columns.into_series()
    }
}

impl MarketDataPort for JsonMarketAdapter {
    fn fetch_series(&self) -> Result<MarketSeries, LobtraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| LobtraderError::MarketData {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        Self::parse(&content)
    }
}

/// Picks the market adapter from the file extension; anything but `.json` is CSV.
pub fn market_source(path: &Path) -> Box<dyn MarketDataPort> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Box::new(JsonMarketAdapter::new(path.to_path_buf()))
    } else {
        Box::new(crate::adapters::csv_adapter::CsvAdapter::new(
            path.to_path_buf(),
        ))
    }
}

pub fn parse_strategy(content: &str, file: &str) -> Result<StrategySpec, LobtraderError> {
    serde_json::from_str(content).map_err(|e| LobtraderError::StrategyLoad {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

pub fn load_strategy(path: &Path) -> Result<StrategySpec, LobtraderError> {
    let file = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| LobtraderError::StrategyLoad {
        file: file.clone(),
        reason: e.to_string(),
    })?;
    parse_strategy(&content, &file)
}
