//! JSON backtest report adapter.

use crate::domain::backtest::{BacktestResult, Trade};
use crate::domain::batch::StrategyRun;
use crate::domain::error::LobtraderError;
use crate::domain::metrics::Metrics;
use crate::domain::position::Position;
use crate::domain::rule_eval::Diagnostics;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    generated_at: String,
    strategy: &'a str,
    metrics: &'a Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    benchmark: Option<&'a Metrics>,
    times: &'a [f64],
    cumulative_returns: &'a [f64],
    positions: &'a [Position],
    trades: &'a [Trade],
    trades_total: usize,
    trades_truncated: bool,
    diagnostics: &'a Diagnostics,
}

pub struct JsonReportAdapter {
    max_trades: usize,
}

impl JsonReportAdapter {
    pub fn new(max_trades: usize) -> Self {
        Self { max_trades }
    }

    /// Pretty JSON for one run; the trade list is cut at `max_trades`.
    pub fn render(
        &self,
        run: &StrategyRun,
        benchmark: Option<&BacktestResult>,
    ) -> Result<String, LobtraderError> {
        let result = &run.result;
        let shown = result.trades.len().min(self.max_trades);
        let doc = ReportDocument {
            generated_at: chrono::Utc::now().to_rfc3339(),
            strategy: &run.strategy,
            metrics: &result.metrics,
            benchmark: benchmark.map(|b| &b.metrics),
            times: &result.times,
            cumulative_returns: &result.cumulative_returns,
            positions: &result.positions,
            trades: &result.trades[..shown],
            trades_total: result.trades.len(),
            trades_truncated: shown < result.trades.len(),
            diagnostics: &run.diagnostics,
        };
        serde_json::to_string_pretty(&doc).map_err(|e| LobtraderError::Report {
            reason: format!("failed to serialize report: {}", e),
        })
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        run: &StrategyRun,
        benchmark: Option<&BacktestResult>,
        output_path: &str,
    ) -> Result<(), LobtraderError> {
        let json = self.render(run, benchmark)?;
        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LobtraderError::Report {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        fs::write(path, json).map_err(|e| LobtraderError::Report {
            reason: format!("failed to write {}: {}", output_path, e),
        })
    }
}
