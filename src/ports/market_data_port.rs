//! Market data port trait.

use crate::domain::error::LobtraderError;
use crate::domain::market::MarketSeries;

/// Source of a recorded or simulated tick series.
///
/// Implementations return ticks in time order and keep NaN placeholders;
/// filtering is the backtest's job.
pub trait MarketDataPort {
    fn fetch_series(&self) -> Result<MarketSeries, LobtraderError>;
}
