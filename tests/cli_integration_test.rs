//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Run configuration from INI files on disk (load_run_config)
//! - Strategy loading with pre-flight (load_definition)
//! - Full backtest command writing a JSON report
//! - Validate, check-expr, templates and compare commands
//! - Error categories surfaced to the exit code

mod common;

use clap::Parser;
use common::*;
use lobtrader::cli::{self, Cli};
use lobtrader::domain::error::LobtraderError;
use lobtrader::domain::strategy::StrategySpec;
use std::io::Write;
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn same_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{:?}", a) == format!("{:?}", b)
}

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["lobtrader"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

const VALID_INI: &str = r#"
[backtest]
transaction_cost = 0.0005
history_length = 50

[report]
max_trades = 1
output = out/report.json
"#;

mod config_loading {
    use super::*;

    #[test]
    fn load_run_config_valid_full() {
        let file = write_temp_ini(VALID_INI);
        let config = cli::load_run_config(Some(file.path())).unwrap();
        assert!((config.backtest.transaction_cost - 0.0005).abs() < f64::EPSILON);
        assert_eq!(config.backtest.history_length, 50);
        assert_eq!(config.max_trades, 1);
        assert_eq!(config.output, "out/report.json");
    }

    #[test]
    fn load_run_config_uses_defaults() {
        let file = write_temp_ini("[backtest]\nhistory_length = 20\n");
        let config = cli::load_run_config(Some(file.path())).unwrap();
        assert!((config.backtest.transaction_cost - 0.0001).abs() < f64::EPSILON);
        assert_eq!(config.backtest.history_length, 20);
        assert_eq!(config.max_trades, 100);
        assert_eq!(config.output, "report.json");
    }

    #[test]
    fn load_run_config_rejects_out_of_range_cost() {
        let file = write_temp_ini("[backtest]\ntransaction_cost = 1.5\n");
        let err = cli::load_run_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, LobtraderError::ConfigInvalid { ref key, .. } if key == "transaction_cost"));
        assert_eq!(err.exit_status(), 2);
    }

    #[test]
    fn load_run_config_rejects_zero_history() {
        let file = write_temp_ini("[backtest]\nhistory_length = 0\n");
        let err = cli::load_run_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("history_length must be at least 1"));
    }

    #[test]
    fn load_run_config_missing_file() {
        let err = cli::load_run_config(Some(std::path::Path::new("/nonexistent/lobtrader.ini")))
            .unwrap_err();
        assert!(matches!(err, LobtraderError::ConfigParse { .. }));
    }
}

mod strategy_loading {
    use super::*;

    #[test]
    fn load_definition_builds_typed_strategy() {
        let dir = TempDir::new().unwrap();
        let path = write_strategy(dir.path(), "dip.json", &dip_strategy());
        let (spec, def) = cli::load_definition(&path).unwrap();
        assert_eq!(spec, dip_strategy());
        assert_eq!(def.name, "Dip buyer");
        assert_eq!(def.functions.len(), 1);
        assert_eq!(def.entry_rules.len(), 1);
        assert_eq!(def.exit_rules.len(), 1);
    }

    #[test]
    fn load_definition_rejects_invalid_strategy() {
        let dir = TempDir::new().unwrap();
        let mut spec = dip_strategy();
        spec.functions[0].expression = Some("price > 1".into());
        spec.entry_rules[0].action = Some("HODL".into());
        let path = write_strategy(dir.path(), "bad.json", &spec);

        match cli::load_definition(&path).unwrap_err() {
            LobtraderError::StrategyDefinition(err) => {
                assert_eq!(err.errors.len(), 2, "errors: {:?}", err.errors);
            }
            other => panic!("expected StrategyDefinition, got {:?}", other),
        }
    }

    #[test]
    fn load_definition_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "broken.json", "{\"functions\": [");
        let err = cli::load_definition(&path).unwrap_err();
        assert!(matches!(err, LobtraderError::StrategyLoad { .. }));
        assert_eq!(err.exit_status(), 4);
    }
}

mod backtest_command {
    use super::*;

    fn fixture(dir: &TempDir) -> (String, String) {
        let market = write_file(dir.path(), "ticks.csv", &series_to_csv(&dip_series()));
        let strategy = write_strategy(dir.path(), "dip.json", &dip_strategy());
        (
            market.to_str().unwrap().to_string(),
            strategy.to_str().unwrap().to_string(),
        )
    }

    #[test]
    fn writes_json_report() {
        let dir = TempDir::new().unwrap();
        let (market, strategy) = fixture(&dir);
        let out = dir.path().join("reports/run.json");

        let code = cli::execute(parse(&[
            "backtest",
            "-m",
            &market,
            "-s",
            &strategy,
            "-o",
            out.to_str().unwrap(),
            "--transaction-cost",
            "0",
        ]))
        .unwrap();
        assert!(same_code(code, ExitCode::SUCCESS));

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report["strategy"], "Dip buyer");
        assert_eq!(report["metrics"]["num_trades"], 2);
        assert_eq!(report["trades_total"], 2);
        assert_eq!(report["positions"], serde_json::json!([0, 0, 1, 0, 0]));
        assert!(report["benchmark"]["total_return_pct"].is_number());
        assert_eq!(report["diagnostics"]["f"]["failures"], 2);
    }

    #[test]
    fn config_file_caps_trades() {
        let dir = TempDir::new().unwrap();
        let (market, strategy) = fixture(&dir);
        let out = dir.path().join("capped.json");
        let ini = write_file(dir.path(), "run.ini", VALID_INI);

        cli::execute(parse(&[
            "backtest",
            "-m",
            &market,
            "-s",
            &strategy,
            "-c",
            ini.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]))
        .unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report["trades"].as_array().unwrap().len(), 1);
        assert_eq!(report["trades_truncated"], true);
    }

    #[test]
    fn json_market_file_is_accepted() {
        let dir = TempDir::new().unwrap();
        let market = write_file(
            dir.path(),
            "ticks.json",
            r#"{"t":[0,1,2,3,4],"mid":[100,101,99,100,102],"spread":[0.2,0.2,0.2,0.2,0.2]}"#,
        );
        let strategy = write_strategy(dir.path(), "dip.json", &dip_strategy());
        let out = dir.path().join("report.json");

        cli::execute(parse(&[
            "backtest",
            "-m",
            market.to_str().unwrap(),
            "-s",
            strategy.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]))
        .unwrap();
        assert!(out.exists());
    }

    #[test]
    fn rejects_out_of_range_cost_flag() {
        let dir = TempDir::new().unwrap();
        let (market, strategy) = fixture(&dir);
        let err = cli::execute(parse(&[
            "backtest",
            "-m",
            &market,
            "-s",
            &strategy,
            "--transaction-cost",
            "2",
        ]))
        .unwrap_err();
        assert!(matches!(err, LobtraderError::ConfigInvalid { .. }));
    }

    #[test]
    fn degenerate_market_is_an_error() {
        let dir = TempDir::new().unwrap();
        let market = write_file(dir.path(), "ticks.csv", "t,mid,spread\n0,100,0.2\n1,nan,0.2\n");
        let strategy = write_strategy(dir.path(), "dip.json", &dip_strategy());
        let err = cli::execute(parse(&[
            "backtest",
            "-m",
            market.to_str().unwrap(),
            "-s",
            strategy.to_str().unwrap(),
            "-o",
            dir.path().join("never.json").to_str().unwrap(),
        ]))
        .unwrap_err();
        assert_eq!(err.exit_status(), 5);
        assert!(!dir.path().join("never.json").exists());
    }

    #[test]
    fn missing_market_file() {
        let dir = TempDir::new().unwrap();
        let strategy = write_strategy(dir.path(), "dip.json", &dip_strategy());
        let err = cli::execute(parse(&[
            "backtest",
            "-m",
            "/nonexistent/ticks.csv",
            "-s",
            strategy.to_str().unwrap(),
        ]))
        .unwrap_err();
        assert!(matches!(err, LobtraderError::MarketData { .. }));
    }
}

mod other_commands {
    use super::*;

    #[test]
    fn validate_reports_verdict_as_exit_code() {
        let dir = TempDir::new().unwrap();
        let good = write_strategy(dir.path(), "good.json", &dip_strategy());
        let bad = write_strategy(dir.path(), "bad.json", &StrategySpec::default());

        let code = cli::execute(parse(&["validate", "-s", good.to_str().unwrap()])).unwrap();
        assert!(same_code(code, ExitCode::SUCCESS));

        let code = cli::execute(parse(&["validate", "-s", bad.to_str().unwrap(), "--json"]))
            .unwrap();
        assert!(same_code(code, ExitCode::from(4)));
    }

    #[test]
    fn check_expr_verdicts() {
        let code = cli::execute(parse(&["check-expr", "mid / SMA(mid, 20)", "--explain"])).unwrap();
        assert!(same_code(code, ExitCode::SUCCESS));

        let code = cli::execute(parse(&["check-expr", "__import__('os')"])).unwrap();
        assert!(same_code(code, ExitCode::from(4)));
    }

    #[test]
    fn templates_list_and_show() {
        assert!(cli::execute(parse(&["templates"])).is_ok());
        assert!(cli::execute(parse(&["templates", "--show", "bollinger_bands"])).is_ok());
        let err = cli::execute(parse(&["templates", "--show", "martingale"])).unwrap_err();
        assert!(matches!(err, LobtraderError::StrategyLoad { .. }));
    }

    #[test]
    fn compare_runs_every_strategy() {
        let dir = TempDir::new().unwrap();
        let market = write_file(
            dir.path(),
            "ticks.csv",
            &series_to_csv(&mean_reversion_series()),
        );
        let a = write_strategy(dir.path(), "a.json", &dip_strategy());
        let b = write_strategy(dir.path(), "b.json", &mean_reversion_strategy());
        let code = cli::execute(parse(&[
            "compare",
            "-m",
            market.to_str().unwrap(),
            "-s",
            a.to_str().unwrap(),
            b.to_str().unwrap(),
        ]))
        .unwrap();
        assert!(same_code(code, ExitCode::SUCCESS));
    }
}
