//! CSV market data adapter.
//!
//! Columns are addressed by header: `t`, `mid` and `spread` are required;
//! `best_bid`, `best_ask` and `quantity` are optional. Any other column
//! (`regime`, `event_type`, ...) is ignored. Empty and `nan` cells are NaN
//! placeholders.

use crate::domain::error::LobtraderError;
use crate::domain::market::{MarketSeries, MarketTick};
use crate::ports::market_data_port::MarketDataPort;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn parse(content: &str) -> Result<MarketSeries, LobtraderError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr.headers().map_err(|e| LobtraderError::MarketData {
            reason: format!("CSV header error: {}", e),
        })?;
        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let required = |name: &str| {
            column(name).ok_or_else(|| LobtraderError::MarketData {
                reason: format!("missing {} column", name),
            })
        };

        let time_col = match column("t") {
            Some(idx) => idx,
            None => required("time")?,
        };
        let mid_col = required("mid")?;
        let spread_col = required("spread")?;
        let bid_col = column("best_bid");
        let ask_col = column("best_ask");
        let qty_col = column("quantity").or_else(|| column("volume"));

        let mut ticks = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| LobtraderError::MarketData {
                reason: format!("CSV parse error: {}", e),
            })?;
            let cell = |idx: Option<usize>, name: &str| -> Result<f64, LobtraderError> {
                match idx.and_then(|i| record.get(i)) {
                    None => Ok(f64::NAN),
                    Some(raw) => parse_cell(raw).ok_or_else(|| LobtraderError::MarketData {
                        reason: format!("invalid {} value '{}' on row {}", name, raw, row + 1),
                    }),
                }
            };

            ticks.push(MarketTick {
                time: cell(Some(time_col), "t")?,
                mid: cell(Some(mid_col), "mid")?,
                spread: cell(Some(spread_col), "spread")?,
                best_bid: cell(bid_col, "best_bid")?,
                best_ask: cell(ask_col, "best_ask")?,
                volume: match qty_col {
                    Some(_) => cell(qty_col, "quantity")?,
                    None => 0.0,
                },
            });
        }

        Ok(MarketSeries::new(ticks))
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    raw.parse().ok()
}

impl MarketDataPort for CsvAdapter {
    fn fetch_series(&self) -> Result<MarketSeries, LobtraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| LobtraderError::MarketData {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        Self::parse(&content)
    }
}
