//! Performance metrics over a per-period return series.
//!
//! Percentages throughout: returns, drawdowns and time-in-position are scaled
//! by 100. Ratios (Sharpe, Sortino, Calmar, profit factor, win/loss) are not.

use crate::domain::indicator::stddev::population_std;
use crate::domain::indicator::window::mean;
use crate::domain::position::Position;
use serde::Serialize;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub num_trades: usize,
    pub win_rate: f64,
    pub time_long_pct: f64,
    pub time_short_pct: f64,
    pub time_flat_pct: f64,
    pub avg_return_per_period: f64,
    pub volatility: f64,
    pub final_position: i8,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub win_loss_ratio: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub expectancy: f64,
    pub ulcer_index: f64,
}

/// Running product of `1 + r`.
pub fn growth_curve(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0_f64, |growth, r| {
            *growth *= 1.0 + r;
            Some(*growth)
        })
        .collect()
}

/// `(growth - 1) * 100` at every period.
pub fn cumulative_returns_pct(returns: &[f64]) -> Vec<f64> {
    growth_curve(returns)
        .into_iter()
        .map(|g| (g - 1.0) * 100.0)
        .collect()
}

/// Fractional drawdown from the running peak (zero or negative) at every period.
pub fn drawdowns(growth: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    growth
        .iter()
        .map(|&g| {
            peak = peak.max(g);
            if peak > 0.0 { (g - peak) / peak } else { 0.0 }
        })
        .collect()
}

impl Metrics {
    pub fn compute(returns: &[f64], positions: &[Position], num_trades: usize) -> Self {
        let growth = growth_curve(returns);
        let total_return = growth.last().map(|g| g - 1.0).unwrap_or(0.0);

        let volatility = population_std(returns);
        let avg_return_per_period = mean(returns);
        let sharpe_ratio = if returns.len() > 1 && volatility > 0.0 {
            avg_return_per_period / volatility * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        let dd = drawdowns(&growth);
        let worst_drawdown = dd.iter().copied().fold(0.0_f64, f64::min);
        let max_drawdown = worst_drawdown * 100.0;

        let wins: Vec<f64> = returns.iter().copied().filter(|&r| r > 0.0).collect();
        let losses: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let nonzero = wins.len() + losses.len();

        let win_rate = if nonzero > 0 {
            wins.len() as f64 / nonzero as f64 * 100.0
        } else {
            0.0
        };

        let share = |pred: fn(Position) -> bool| {
            if positions.is_empty() {
                0.0
            } else {
                positions.iter().filter(|&&p| pred(p)).count() as f64 / positions.len() as f64
                    * 100.0
            }
        };

        let sortino_ratio = {
            let downside = population_std(&losses);
            if !losses.is_empty() && downside > 0.0 {
                avg_return_per_period / downside * TRADING_DAYS_PER_YEAR.sqrt()
            } else {
                0.0
            }
        };

        let calmar_ratio = if worst_drawdown < 0.0 {
            total_return / worst_drawdown.abs()
        } else {
            0.0
        };

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss = losses.iter().sum::<f64>().abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        };

        let avg_win = if wins.is_empty() { 0.0 } else { mean(&wins) };
        let avg_loss = if losses.is_empty() { 0.0 } else { mean(&losses) };
        let win_loss_ratio = if avg_loss != 0.0 {
            (avg_win / avg_loss).abs()
        } else {
            0.0
        };

        let (max_consecutive_wins, max_consecutive_losses) = streaks(returns);

        let expectancy = if nonzero > 0 {
            (gross_profit - gross_loss) / nonzero as f64
        } else {
            0.0
        };

        let ulcer_index = if dd.is_empty() {
            0.0
        } else {
            (dd.iter().map(|d| d * d).sum::<f64>() / dd.len() as f64).sqrt()
        };

        Metrics {
            total_return_pct: total_return * 100.0,
            sharpe_ratio,
            max_drawdown,
            num_trades,
            win_rate,
            time_long_pct: share(Position::is_long),
            time_short_pct: share(Position::is_short),
            time_flat_pct: share(Position::is_flat),
            avg_return_per_period,
            volatility,
            final_position: positions.last().map(|p| p.as_i8()).unwrap_or(0),
            sortino_ratio,
            calmar_ratio,
            profit_factor,
            avg_win: avg_win * 100.0,
            avg_loss: avg_loss * 100.0,
            win_loss_ratio,
            max_consecutive_wins,
            max_consecutive_losses,
            expectancy: expectancy * 100.0,
            ulcer_index: ulcer_index * 100.0,
        }
    }
}

/// Longest runs of positive and of negative returns. Zero returns leave both
/// runs untouched.
fn streaks(returns: &[f64]) -> (usize, usize) {
    let mut best_wins = 0;
    let mut best_losses = 0;
    let mut wins = 0;
    let mut losses = 0;
    for &r in returns {
        if r > 0.0 {
            wins += 1;
            losses = 0;
            best_wins = best_wins.max(wins);
        } else if r < 0.0 {
            losses += 1;
            wins = 0;
            best_losses = best_losses.max(losses);
        }
    }
    (best_wins, best_losses)
}
