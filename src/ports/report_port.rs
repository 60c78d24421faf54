//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::batch::StrategyRun;
use crate::domain::error::LobtraderError;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        run: &StrategyRun,
        benchmark: Option<&BacktestResult>,
        output_path: &str,
    ) -> Result<(), LobtraderError>;
}
