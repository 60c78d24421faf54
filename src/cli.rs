//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_adapter::{load_strategy, market_source};
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{BacktestResult, buy_and_hold};
use crate::domain::batch::{StrategyRun, run_strategies, run_strategy};
use crate::domain::config_validation::{
    PreflightReport, RunConfig, StrategySummary, build_strategy, expression_requirements,
    summarize, validate_strategy,
};
use crate::domain::error::LobtraderError;
use crate::domain::expr_parser;
use crate::domain::market::MarketSeries;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{StrategyDefinition, StrategySpec};
use crate::domain::templates::{all_templates, get_template};
use crate::domain::validator;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "lobtrader",
    about = "Sandboxed strategy expressions and tick-level backtests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a strategy over a market series and write a JSON report
    Backtest {
        /// Market series (.csv, or .json column arrays)
        #[arg(short, long)]
        market: PathBuf,
        /// Strategy definition (JSON)
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Report path; `-` writes the report to stdout
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long)]
        transaction_cost: Option<f64>,
    },
    /// Pre-flight check a strategy definition
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Validate a single expression
    CheckExpr {
        expression: String,
        /// Also list variables, functions and data requirements
        #[arg(long)]
        explain: bool,
    },
    /// List built-in strategy templates
    Templates {
        /// Print one template as a strategy definition
        #[arg(long)]
        show: Option<String>,
    },
    /// Run several strategies in parallel against buy-and-hold
    Compare {
        #[arg(short, long)]
        market: PathBuf,
        #[arg(short, long, num_args = 1.., required = true)]
        strategy: Vec<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Dispatches one command. Verdict-style failures (an invalid strategy or
/// expression) come back as a non-zero `ExitCode`, everything else as `Err`.
pub fn execute(cli: Cli) -> Result<ExitCode, LobtraderError> {
    match cli.command {
        Command::Backtest {
            market,
            strategy,
            config,
            output,
            transaction_cost,
        } => run_backtest(
            &market,
            &strategy,
            config.as_deref(),
            output,
            transaction_cost,
        ),
        Command::Validate { strategy, json } => run_validate(&strategy, json),
        Command::CheckExpr {
            expression,
            explain,
        } => Ok(if run_check_expr(&expression, explain) {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(4)
        }),
        Command::Templates { show } => run_templates(show.as_deref()),
        Command::Compare {
            market,
            strategy,
            config,
        } => run_compare(&market, &strategy, config.as_deref()),
    }
}

pub fn load_run_config(path: Option<&Path>) -> Result<RunConfig, LobtraderError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            RunConfig::from_config(&FileConfigAdapter::from_file(path)?)
        }
        None => RunConfig::from_config(&FileConfigAdapter::empty()),
    }
}

/// Loads a strategy and runs pre-flight, printing warnings. Errors block the run.
pub fn load_definition(path: &Path) -> Result<(StrategySpec, StrategyDefinition), LobtraderError> {
    eprintln!("Loading strategy from {}", path.display());
    let spec = load_strategy(path)?;
    for warning in validate_strategy(&spec).warnings {
        eprintln!("warning: {warning}");
    }
    let definition = build_strategy(&spec)?;
    Ok((spec, definition))
}

fn load_market(path: &Path) -> Result<MarketSeries, LobtraderError> {
    eprintln!("Loading market data from {}", path.display());
    let series = market_source(path).fetch_series()?;
    eprintln!("  {} ticks", series.len());
    Ok(series)
}

fn run_backtest(
    market_path: &Path,
    strategy_path: &Path,
    config_path: Option<&Path>,
    output: Option<String>,
    transaction_cost: Option<f64>,
) -> Result<ExitCode, LobtraderError> {
    // Stage 1: Run configuration, with flag overrides
    let mut config = load_run_config(config_path)?;
    if let Some(cost) = transaction_cost {
        if !(0.0..1.0).contains(&cost) {
            return Err(LobtraderError::ConfigInvalid {
                section: "backtest".into(),
                key: "transaction_cost".into(),
                reason: "transaction_cost must be between 0 and 1".into(),
            });
        }
        config.backtest.transaction_cost = cost;
    }
    if let Some(output) = output {
        config.output = output;
    }

    // Stage 2: Strategy pre-flight
    let (spec, definition) = load_definition(strategy_path)?;
    let requirements = summarize(&spec).requirements;
    if requirements.max_window > config.backtest.history_length {
        warn!(
            max_window = requirements.max_window,
            history_length = config.backtest.history_length,
            "history_length is shorter than the largest indicator window"
        );
    }

    // Stage 3: Market data
    let series = load_market(market_path)?;

    // Stage 4: Run strategy and benchmark
    eprintln!("Running backtest: {}", definition.name);
    let run = run_strategy(&series, &definition, &config.backtest)?;
    let benchmark = buy_and_hold(&series).ok();

    print_summary(&run, benchmark.as_ref());

    // Stage 5: Report
    let reporter = JsonReportAdapter::new(config.max_trades);
    if config.output == "-" {
        println!("{}", reporter.render(&run, benchmark.as_ref())?);
    } else {
        reporter.write(&run, benchmark.as_ref(), &config.output)?;
        eprintln!("Report written to {}", config.output);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(run: &StrategyRun, benchmark: Option<&BacktestResult>) {
    let m = &run.result.metrics;
    eprintln!("\n{}", run.strategy);
    eprintln!("  Total return:   {:>10.4}%", m.total_return_pct);
    eprintln!("  Sharpe ratio:   {:>10.4}", m.sharpe_ratio);
    eprintln!("  Sortino ratio:  {:>10.4}", m.sortino_ratio);
    eprintln!("  Max drawdown:   {:>10.4}%", m.max_drawdown);
    eprintln!("  Trades:         {:>10}", m.num_trades);
    eprintln!("  Win rate:       {:>10.2}%", m.win_rate);
    eprintln!(
        "  Time long/short/flat: {:.1}% / {:.1}% / {:.1}%",
        m.time_long_pct, m.time_short_pct, m.time_flat_pct
    );
    if let Some(b) = benchmark {
        eprintln!(
            "  Buy and hold:   {:>10.4}%",
            b.metrics.total_return_pct
        );
    }
    for (id, diag) in &run.diagnostics {
        eprintln!(
            "  warning: function '{}' failed on {} ticks (first: {})",
            id, diag.failures, diag.first_error
        );
    }
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    valid: bool,
    #[serde(flatten)]
    report: PreflightReport,
    summary: StrategySummary,
}

fn run_validate(strategy_path: &Path, json: bool) -> Result<ExitCode, LobtraderError> {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let spec = load_strategy(strategy_path)?;
    let report = validate_strategy(&spec);
    let summary = summarize(&spec);
    let valid = report.is_valid();

    if json {
        let output = ValidationOutput {
            valid,
            report,
            summary,
        };
        let text = serde_json::to_string_pretty(&output).map_err(|e| LobtraderError::Report {
            reason: e.to_string(),
        })?;
        println!("{text}");
    } else {
        for error in &report.errors {
            eprintln!("  error: {error}");
        }
        for warning in &report.warnings {
            eprintln!("  warning: {warning}");
        }
        eprintln!("\n{}", summary.name);
        eprintln!("  {}", summary.description);
        eprintln!(
            "  {} function(s), {} entry rule(s), {} exit rule(s)",
            summary.num_functions, summary.num_entry_rules, summary.num_exit_rules
        );
        eprintln!(
            "  Needs at least {} data points (largest window {})",
            summary.requirements.min_data_points, summary.requirements.max_window
        );
        if valid {
            eprintln!("\nStrategy definition is valid.");
        }
    }

    if valid {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(4))
    }
}

/// Prints the verdict for one expression; returns whether it is valid.
fn run_check_expr(expression: &str, explain: bool) -> bool {
    let result = validator::validate(expression);
    if !result.ok {
        match expr_parser::parse(expression) {
            Err(parse_err) if !expr_parser::is_nesting_limit(&parse_err) => {
                eprintln!("error: {}", parse_err.display_with_context(expression));
            }
            _ => eprintln!("error: {}", result.error.unwrap_or_default()),
        }
        if let Some(suggestion) = result.suggestion {
            eprintln!("suggestion: {suggestion}");
        }
        return false;
    }

    println!("Expression is valid.");
    if explain {
        let req = expression_requirements(expression);
        let join = |items: Vec<String>| {
            if items.is_empty() {
                "(none)".to_string()
            } else {
                items.join(", ")
            }
        };
        println!(
            "  Variables: {}",
            join(req.variables_used.iter().map(|v| v.to_string()).collect())
        );
        println!(
            "  Functions: {}",
            join(req.functions_used.iter().map(|f| f.to_string()).collect())
        );
        println!("  Largest window: {}", req.max_window);
        println!("  Minimum data points: {}", req.min_data_points);
    }
    true
}

fn run_templates(show: Option<&str>) -> Result<ExitCode, LobtraderError> {
    match show {
        None => {
            for t in all_templates() {
                println!(
                    "{:<20} {:<16} {:<13} {}",
                    t.id, t.category, t.difficulty, t.description
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(id) => match get_template(id) {
            Some(t) => {
                let text = serde_json::to_string_pretty(&t.strategy).map_err(|e| {
                    LobtraderError::Report {
                        reason: e.to_string(),
                    }
                })?;
                println!("{text}");
                Ok(ExitCode::SUCCESS)
            }
            None => Err(LobtraderError::StrategyLoad {
                file: id.to_string(),
                reason: "no such template".into(),
            }),
        },
    }
}

fn run_compare(
    market_path: &Path,
    strategy_paths: &[PathBuf],
    config_path: Option<&Path>,
) -> Result<ExitCode, LobtraderError> {
    let config = load_run_config(config_path)?;
    let definitions = strategy_paths
        .iter()
        .map(|p| load_definition(p).map(|(_, def)| def))
        .collect::<Result<Vec<_>, _>>()?;
    let series = load_market(market_path)?;

    eprintln!("Running {} strategies...", definitions.len());
    let runs = run_strategies(&series, &definitions, &config.backtest);
    let benchmark = buy_and_hold(&series)?;

    println!(
        "{:<32} {:>12} {:>10} {:>12} {:>8} {:>10}",
        "strategy", "return %", "sharpe", "max dd %", "trades", "win %"
    );
    for (definition, run) in definitions.iter().zip(&runs) {
        match run {
            Ok(run) => print_row(&run.strategy, &run.result.metrics),
            Err(e) => println!("{:<32} error: {}", definition.name, e),
        }
    }
    print_row("buy and hold", &benchmark.metrics);

    if runs.iter().any(|r| r.is_err()) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_row(name: &str, m: &Metrics) {
    println!(
        "{:<32} {:>12.4} {:>10.4} {:>12.4} {:>8} {:>10.2}",
        name, m.total_return_pct, m.sharpe_ratio, m.max_drawdown, m.num_trades, m.win_rate
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backtest_flags() {
        let cli = Cli::try_parse_from([
            "lobtrader",
            "backtest",
            "--market",
            "ticks.csv",
            "--strategy",
            "s.json",
            "--transaction-cost",
            "0.001",
            "-o",
            "-",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                market,
                transaction_cost,
                output,
                config,
                ..
            } => {
                assert_eq!(market, PathBuf::from("ticks.csv"));
                assert_eq!(transaction_cost, Some(0.001));
                assert_eq!(output.as_deref(), Some("-"));
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn compare_takes_several_strategies() {
        let cli = Cli::try_parse_from([
            "lobtrader", "compare", "-m", "t.csv", "-s", "a.json", "b.json",
        ])
        .unwrap();
        match cli.command {
            Command::Compare { strategy, .. } => assert_eq!(strategy.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["lobtrader", "compare", "-m", "t.csv"]).is_err());
    }

    #[test]
    fn check_expr_verdicts() {
        assert!(run_check_expr("mid / SMA(mid, 5)", true));
        assert!(!run_check_expr("price > 1", false));
        assert!(!run_check_expr("SMA(mid,", false));
    }

    #[test]
    fn unknown_template_is_an_error() {
        assert!(run_templates(Some("nope")).is_err());
        assert!(run_templates(None).is_ok());
    }

    #[test]
    fn default_run_config_without_file() {
        let config = load_run_config(None).unwrap();
        assert_eq!(config, RunConfig::default());
    }
}
