//! Configuration and strategy validation.
//!
//! Run configuration is checked key by key before a backtest and fails on
//! the first bad value. Strategy pre-flight is exhaustive: every problem in
//! every function and rule is collected in one pass.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::{LobtraderError, StrategyDefinitionError};
use crate::domain::expr::{CompareOp, Node};
use crate::domain::expr_parser;
use crate::domain::indicator::IndicatorFunction;
use crate::domain::market::Variable;
use crate::domain::strategy::{
    Action, Condition, FunctionDefinition, Logic, Rule, RuleSpec, StrategyDefinition, StrategySpec,
};
use crate::domain::validator;
use crate::ports::config_port::ConfigPort;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

pub const DEFAULT_TRANSACTION_COST: f64 = 0.0001;
pub const DEFAULT_HISTORY_LENGTH: usize = 100;
pub const DEFAULT_MAX_TRADES: usize = 100;
pub const DEFAULT_REPORT_OUTPUT: &str = "report.json";

/// Extra ticks on top of the largest window before a strategy is warmed up.
const WARMUP_BUFFER: usize = 10;

/// Everything a run needs from the INI file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub backtest: BacktestConfig,
    pub max_trades: usize,
    pub output: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            backtest: BacktestConfig::default(),
            max_trades: DEFAULT_MAX_TRADES,
            output: DEFAULT_REPORT_OUTPUT.to_string(),
        }
    }
}

impl RunConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LobtraderError> {
        validate_run_config(config)?;
        Ok(Self {
            backtest: BacktestConfig {
                transaction_cost: read_double(
                    config,
                    "backtest",
                    "transaction_cost",
                    DEFAULT_TRANSACTION_COST,
                )?,
                history_length: read_count(
                    config,
                    "backtest",
                    "history_length",
                    DEFAULT_HISTORY_LENGTH,
                )?,
            },
            max_trades: read_count(config, "report", "max_trades", DEFAULT_MAX_TRADES)?,
            output: config
                .get_string("report", "output")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REPORT_OUTPUT.to_string()),
        })
    }
}

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), LobtraderError> {
    validate_transaction_cost(config)?;
    validate_history_length(config)?;
    validate_max_trades(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> LobtraderError {
    LobtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, LobtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(section, key, format!("{} must be a number", key))),
    }
}

fn read_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, LobtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid(section, key, format!("{} must be a non-negative integer", key))),
    }
}

fn validate_transaction_cost(config: &dyn ConfigPort) -> Result<(), LobtraderError> {
    let value = read_double(
        config,
        "backtest",
        "transaction_cost",
        DEFAULT_TRANSACTION_COST,
    )?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "transaction_cost",
            "transaction_cost must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_history_length(config: &dyn ConfigPort) -> Result<(), LobtraderError> {
    let value = read_count(config, "backtest", "history_length", DEFAULT_HISTORY_LENGTH)?;
    if value < 1 {
        return Err(invalid(
            "backtest",
            "history_length",
            "history_length must be at least 1",
        ));
    }
    Ok(())
}

fn validate_max_trades(config: &dyn ConfigPort) -> Result<(), LobtraderError> {
    read_count(config, "report", "max_trades", DEFAULT_MAX_TRADES)?;
    Ok(())
}

/// Errors and warnings from strategy pre-flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreflightReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PreflightReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

pub fn validate_strategy(spec: &StrategySpec) -> PreflightReport {
    let mut report = PreflightReport::default();

    if present(&spec.name).is_none_or(|n| n.trim().is_empty()) {
        report.warnings.push("Strategy has no name".to_string());
    }

    if spec.functions.is_empty() {
        report
            .errors
            .push("Strategy must define at least one function".to_string());
    }

    let mut function_ids: HashSet<&str> = HashSet::new();
    for (i, func) in spec.functions.iter().enumerate() {
        let label = present(&func.name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Function {}", i + 1));

        let id = match present(&func.id) {
            Some(id) => id,
            None => {
                report
                    .errors
                    .push(format!("Function '{}' missing 'id' field", label));
                continue;
            }
        };
        if !function_ids.insert(id) {
            report.errors.push(format!("Duplicate function id: '{}'", id));
        }

        let expression = match present(&func.expression) {
            Some(expr) => expr,
            None => {
                report
                    .errors
                    .push(format!("Function '{}' missing 'expression' field", label));
                continue;
            }
        };

        let validation = validator::validate(expression);
        if !validation.ok {
            report.errors.push(format!(
                "Function '{}': {}",
                label,
                validation.error.unwrap_or_default()
            ));
            if let Some(suggestion) = validation.suggestion {
                report
                    .warnings
                    .push(format!("Function '{}': {}", label, suggestion));
            }
        }
    }

    if spec.entry_rules.is_empty() {
        report
            .warnings
            .push("Strategy has no entry rules - will never enter positions".to_string());
    }
    for (i, rule) in spec.entry_rules.iter().enumerate() {
        check_rule(
            rule,
            &function_ids,
            &format!("Entry rule {}", i + 1),
            &mut report.errors,
        );
    }

    if spec.exit_rules.is_empty() {
        report
            .warnings
            .push("Strategy has no exit rules - positions may not close properly".to_string());
    }
    for (i, rule) in spec.exit_rules.iter().enumerate() {
        check_rule(
            rule,
            &function_ids,
            &format!("Exit rule {}", i + 1),
            &mut report.errors,
        );
    }

    if !spec.entry_rules.is_empty() && !spec.exit_rules.is_empty() {
        let has_action = |rules: &[RuleSpec], action: &str| {
            rules.iter().any(|r| r.action.as_deref() == Some(action))
        };
        if has_action(&spec.entry_rules, "FLAT") {
            report
                .warnings
                .push("Entry rule with action 'FLAT' is unusual".to_string());
        }
        if has_action(&spec.exit_rules, "BUY") || has_action(&spec.exit_rules, "SELL") {
            report.warnings.push(
                "Exit rule with 'BUY' or 'SELL' action is unusual - consider using 'FLAT'"
                    .to_string(),
            );
        }
    }

    report
}

fn check_rule(rule: &RuleSpec, function_ids: &HashSet<&str>, label: &str, errors: &mut Vec<String>) {
    if rule.conditions.is_empty() {
        errors.push(format!("{}: must have at least one condition", label));
    }

    for (i, condition) in rule.conditions.iter().enumerate() {
        let at = format!("{}, condition {}", label, i + 1);

        match present(&condition.function_id) {
            None => errors.push(format!("{}: missing 'function_id'", at)),
            Some(id) if !function_ids.contains(id) => {
                errors.push(format!("{}: references unknown function '{}'", at, id))
            }
            Some(_) => {}
        }

        match present(&condition.operator) {
            None => errors.push(format!("{}: missing 'operator'", at)),
            Some(op) if op.parse::<CompareOp>().is_err() => errors.push(format!(
                "{}: invalid operator '{}'. Must be one of: {}",
                at,
                op,
                CompareOp::ALL
                    .iter()
                    .map(|o| o.symbol())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Some(_) => {}
        }

        match &condition.threshold {
            None | Some(serde_json::Value::Null) => {
                errors.push(format!("{}: missing 'threshold'", at))
            }
            Some(value) if value.as_f64().is_none() => {
                errors.push(format!("{}: threshold must be a number", at))
            }
            Some(_) => {}
        }
    }

    let logic = rule.logic.as_deref().unwrap_or("AND");
    if logic.parse::<Logic>().is_err() {
        errors.push(format!(
            "{}: logic must be 'AND' or 'OR', got '{}'",
            label, logic
        ));
    }

    match present(&rule.action) {
        None => errors.push(format!("{}: missing 'action'", label)),
        Some(action) if action.parse::<Action>().is_err() => errors.push(format!(
            "{}: invalid action '{}'. Must be one of: {}",
            label,
            action,
            Action::ALL
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
        Some(_) => {}
    }
}

/// Runs pre-flight and converts the wire form into the typed definition.
pub fn build_strategy(spec: &StrategySpec) -> Result<StrategyDefinition, StrategyDefinitionError> {
    let report = validate_strategy(spec);
    if !report.is_valid() {
        return Err(StrategyDefinitionError {
            errors: report.errors,
        });
    }

    let mut problems = Vec::new();

    let functions = spec
        .functions
        .iter()
        .enumerate()
        .map(|(i, f)| FunctionDefinition {
            id: f.id.clone().unwrap_or_default(),
            name: present(&f.name)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Function {}", i + 1)),
            expression: f.expression.clone().unwrap_or_default(),
        })
        .collect();

    let mut convert = |rules: &[RuleSpec], kind: &str| -> Vec<Rule> {
        rules
            .iter()
            .enumerate()
            .filter_map(|(i, r)| match typed_rule(r) {
                Some(rule) => Some(rule),
                None => {
                    problems.push(format!("{} rule {}: could not be converted", kind, i + 1));
                    None
                }
            })
            .collect()
    };
    let entry_rules = convert(&spec.entry_rules, "Entry");
    let exit_rules = convert(&spec.exit_rules, "Exit");

    if !problems.is_empty() {
        return Err(StrategyDefinitionError { errors: problems });
    }

    Ok(StrategyDefinition {
        name: present(&spec.name)
            .map(str::to_string)
            .unwrap_or_else(|| "Unnamed Strategy".to_string()),
        functions,
        entry_rules,
        exit_rules,
    })
}

fn typed_rule(rule: &RuleSpec) -> Option<Rule> {
    let conditions = rule
        .conditions
        .iter()
        .map(|c| {
            Some(Condition {
                function_id: c.function_id.clone()?,
                operator: c.operator.as_deref()?.parse().ok()?,
                threshold: c.threshold.as_ref()?.as_f64()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Rule {
        conditions,
        logic: rule.logic.as_deref().unwrap_or("AND").parse().ok()?,
        action: rule.action.as_deref()?.parse().ok()?,
    })
}

/// Data a strategy needs before its indicators are warmed up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub min_data_points: usize,
    pub max_window: usize,
    pub variables_used: Vec<Variable>,
    pub functions_used: Vec<IndicatorFunction>,
}

/// Requirements of a single expression. Unparseable text contributes nothing.
pub fn expression_requirements(expression: &str) -> Requirements {
    let mut variables = BTreeSet::new();
    let mut functions = BTreeSet::new();
    let mut max_window = 0usize;

    if let Ok(node) = expr_parser::parse(expression) {
        node.walk(&mut |n| match n {
            Node::Name(name) => {
                if let Ok(v) = name.parse::<Variable>() {
                    variables.insert(v);
                }
            }
            Node::Call {
                callee,
                args,
                keywords,
            } => {
                let function = match callee.as_ref() {
                    Node::Name(name) => match name.parse::<IndicatorFunction>() {
                        Ok(f) => f,
                        Err(_) => return,
                    },
                    _ => return,
                };
                functions.insert(function);
                if let Some(window) = call_window(function, args, keywords) {
                    max_window = max_window.max(window);
                }
            }
            _ => {}
        });
    }

    Requirements {
        min_data_points: max_window.saturating_add(WARMUP_BUFFER),
        max_window,
        variables_used: variables.into_iter().collect(),
        functions_used: functions.into_iter().collect(),
    }
}

/// Literal window of a call, falling back to the function's default.
fn call_window(
    function: IndicatorFunction,
    args: &[Node],
    keywords: &[crate::domain::expr::Keyword],
) -> Option<usize> {
    if !function.is_windowed() {
        return None;
    }
    let literal = keywords
        .iter()
        .find(|k| k.name == "window")
        .map(|k| &k.value)
        .or_else(|| {
            function
                .window_index(args.len())
                .and_then(|idx| args.get(idx))
        });
    match literal {
        Some(Node::Number(w)) if w.is_finite() && *w >= 1.0 => Some(*w as usize),
        Some(_) => None,
        None => function.default_window(),
    }
}

pub fn estimate_requirements(spec: &StrategySpec) -> Requirements {
    let mut variables = BTreeSet::new();
    let mut functions = BTreeSet::new();
    let mut max_window = 0usize;

    for func in &spec.functions {
        if let Some(expr) = present(&func.expression) {
            let req = expression_requirements(expr);
            variables.extend(req.variables_used);
            functions.extend(req.functions_used);
            max_window = max_window.max(req.max_window);
        }
    }

    Requirements {
        min_data_points: max_window.saturating_add(WARMUP_BUFFER),
        max_window,
        variables_used: variables.into_iter().collect(),
        functions_used: functions.into_iter().collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub name: String,
    pub num_functions: usize,
    pub num_entry_rules: usize,
    pub num_exit_rules: usize,
    pub requirements: Requirements,
    pub description: String,
}

pub fn summarize(spec: &StrategySpec) -> StrategySummary {
    StrategySummary {
        name: present(&spec.name)
            .map(str::to_string)
            .unwrap_or_else(|| "Unnamed Strategy".to_string()),
        num_functions: spec.functions.len(),
        num_entry_rules: spec.entry_rules.len(),
        num_exit_rules: spec.exit_rules.len(),
        requirements: estimate_requirements(spec),
        description: describe(spec),
    }
}

fn describe(spec: &StrategySpec) -> String {
    let mut parts = Vec::new();
    if !spec.functions.is_empty() {
        parts.push(format!(
            "Uses {} custom indicator(s)",
            spec.functions.len()
        ));
    }
    let count = |action: &str| {
        spec.entry_rules
            .iter()
            .filter(|r| r.action.as_deref() == Some(action))
            .count()
    };
    let buys = count("BUY");
    let sells = count("SELL");
    if buys > 0 {
        parts.push(format!("Enters long on {} condition(s)", buys));
    }
    if sells > 0 {
        parts.push(format!("Enters short on {} condition(s)", sells));
    }
    if !spec.exit_rules.is_empty() {
        parts.push(format!("Exits on {} condition(s)", spec.exit_rules.len()));
    }
    format!("{}.", parts.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::strategy::{ConditionSpec, FunctionSpec};

    fn valid_spec() -> StrategySpec {
        StrategySpec {
            name: Some("Mean reversion".into()),
            functions: vec![FunctionSpec::new("ratio", "SMA ratio", "mid / SMA(mid, 50)")],
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

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn run_config_defaults() {
        let rc = RunConfig::from_config(&config("[backtest]\n")).unwrap();
        assert_eq!(rc, RunConfig::default());
        assert_eq!(rc.backtest.transaction_cost, 0.0001);
        assert_eq!(rc.backtest.history_length, 100);
        assert_eq!(rc.max_trades, 100);
        assert_eq!(rc.output, "report.json");
    }

    #[test]
    fn run_config_reads_values() {
        let rc = RunConfig::from_config(&config(
            "[backtest]\ntransaction_cost = 0.001\nhistory_length = 250\n[report]\nmax_trades = 5\noutput = out.json\n",
        ))
        .unwrap();
        assert_eq!(rc.backtest.transaction_cost, 0.001);
        assert_eq!(rc.backtest.history_length, 250);
        assert_eq!(rc.max_trades, 5);
        assert_eq!(rc.output, "out.json");
    }

    #[test]
    fn transaction_cost_out_of_range() {
        for bad in ["-0.1", "1.0", "abc"] {
            let err = validate_run_config(&config(&format!(
                "[backtest]\ntransaction_cost = {}\n",
                bad
            )))
            .unwrap_err();
            match err {
                LobtraderError::ConfigInvalid { key, .. } => assert_eq!(key, "transaction_cost"),
                other => panic!("expected ConfigInvalid, got {:?}", other),
            }
        }
    }

    #[test]
    fn history_length_must_be_positive() {
        let err = validate_run_config(&config("[backtest]\nhistory_length = 0\n")).unwrap_err();
        assert!(matches!(err, LobtraderError::ConfigInvalid { ref key, .. } if key == "history_length"));
        let err = validate_run_config(&config("[backtest]\nhistory_length = -5\n")).unwrap_err();
        assert!(matches!(err, LobtraderError::ConfigInvalid { .. }));
    }

    #[test]
    fn valid_strategy_has_no_errors() {
        let report = validate_strategy(&valid_spec());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn preflight_collects_every_problem() {
        let spec = StrategySpec {
            name: None,
            functions: vec![
                FunctionSpec::new("a", "A", "mid"),
                FunctionSpec::new("a", "A again", "price / 2"),
                FunctionSpec {
                    id: None,
                    name: Some("No id".into()),
                    expression: Some("mid".into()),
                },
            ],
            entry_rules: vec![
                RuleSpec {
                    conditions: vec![ConditionSpec {
                        function_id: Some("missing".into()),
                        operator: Some("=>".into()),
                        threshold: Some(serde_json::Value::from("x")),
                    }],
                    logic: Some("XOR".into()),
                    action: Some("JUMP".into()),
                },
                RuleSpec {
                    conditions: vec![],
                    logic: None,
                    action: None,
                },
            ],
            exit_rules: vec![],
        };
        let report = validate_strategy(&spec);
        let errors = report.errors.join("\n");
        assert!(errors.contains("Duplicate function id: 'a'"));
        assert!(errors.contains("Function 'A again': Variable 'price' not allowed"));
        assert!(errors.contains("Function 'No id' missing 'id' field"));
        assert!(errors.contains("Entry rule 1, condition 1: references unknown function 'missing'"));
        assert!(errors.contains("Entry rule 1, condition 1: invalid operator '=>'"));
        assert!(errors.contains("Entry rule 1, condition 1: threshold must be a number"));
        assert!(errors.contains("Entry rule 1: logic must be 'AND' or 'OR', got 'XOR'"));
        assert!(errors.contains("Entry rule 1: invalid action 'JUMP'"));
        assert!(errors.contains("Entry rule 2: must have at least one condition"));
        assert!(errors.contains("Entry rule 2: missing 'action'"));

        let warnings = report.warnings.join("\n");
        assert!(warnings.contains("Strategy has no name"));
        assert!(warnings.contains("Use 'mid' instead of 'price'"));
        assert!(warnings.contains("no exit rules"));
    }

    #[test]
    fn missing_condition_fields() {
        let mut spec = valid_spec();
        spec.entry_rules[0].conditions = vec![ConditionSpec::default()];
        let errors = validate_strategy(&spec).errors.join("\n");
        assert!(errors.contains("missing 'function_id'"));
        assert!(errors.contains("missing 'operator'"));
        assert!(errors.contains("missing 'threshold'"));
    }

    #[test]
    fn no_functions_is_an_error() {
        let spec = StrategySpec::default();
        let report = validate_strategy(&spec);
        assert!(report
            .errors
            .contains(&"Strategy must define at least one function".to_string()));
        assert!(report.warnings.iter().any(|w| w.contains("no entry rules")));
    }

    #[test]
    fn unusual_actions_are_warnings() {
        let mut spec = valid_spec();
        spec.entry_rules[0].action = Some("FLAT".into());
        spec.exit_rules[0].action = Some("SELL".into());
        let report = validate_strategy(&spec);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("'FLAT' is unusual")));
        assert!(report.warnings.iter().any(|w| w.contains("consider using 'FLAT'")));
    }

    #[test]
    fn build_strategy_produces_typed_rules() {
        let def = build_strategy(&valid_spec()).unwrap();
        assert_eq!(def.name, "Mean reversion");
        assert_eq!(def.functions[0].id, "ratio");
        assert_eq!(def.entry_rules[0].action, Action::Buy);
        assert_eq!(def.entry_rules[0].conditions[0].operator, CompareOp::Lt);
        assert_eq!(def.entry_rules[0].conditions[0].threshold, 0.998);
        assert_eq!(def.exit_rules[0].logic, Logic::And);
        assert_eq!(def.exit_rules[0].conditions.len(), 2);
    }

    #[test]
    fn build_strategy_defaults_logic_to_and() {
        let mut spec = valid_spec();
        spec.entry_rules[0].logic = None;
        let def = build_strategy(&spec).unwrap();
        assert_eq!(def.entry_rules[0].logic, Logic::And);
    }

    #[test]
    fn build_strategy_rejects_invalid() {
        let mut spec = valid_spec();
        spec.functions.push(FunctionSpec::new("ratio", "dup", "mid"));
        let err = build_strategy(&spec).unwrap_err();
        assert_eq!(err.errors, vec!["Duplicate function id: 'ratio'".to_string()]);
    }

    #[test]
    fn integer_threshold_is_accepted() {
        let mut spec = valid_spec();
        spec.entry_rules[0].conditions[0].threshold = Some(serde_json::json!(1));
        let def = build_strategy(&spec).unwrap();
        assert_eq!(def.entry_rules[0].conditions[0].threshold, 1.0);
    }

    #[test]
    fn requirements_cover_windows_and_defaults() {
        let req = expression_requirements("RSI(mid) + SMA(spread, 30) - ABS(returns)");
        assert_eq!(req.max_window, 30);
        assert_eq!(req.min_data_points, 40);
        assert_eq!(
            req.variables_used,
            vec![Variable::Mid, Variable::Spread, Variable::Returns]
        );
        assert_eq!(
            req.functions_used,
            vec![
                IndicatorFunction::Sma,
                IndicatorFunction::Abs,
                IndicatorFunction::Rsi
            ]
        );

        let req = expression_requirements("BBWIDTH(mid, num_std=1)");
        assert_eq!(req.max_window, 20);
        let req = expression_requirements("ATR(best_ask, best_bid, mid, window=60)");
        assert_eq!(req.max_window, 60);
        let req = expression_requirements("PERCENTILE(mid, 75, 0.9)");
        assert_eq!(req.max_window, 75);
    }

    #[test]
    fn requirements_with_huge_window_saturate() {
        let req = expression_requirements("SMA(mid, 1e30)");
        assert_eq!(req.max_window, usize::MAX);
        assert_eq!(req.min_data_points, usize::MAX);

        let mut spec = valid_spec();
        spec.functions[0].expression = Some("MOMENTUM(mid, 1e30) + SMA(mid, 5)".into());
        let req = estimate_requirements(&spec);
        assert_eq!(req.min_data_points, usize::MAX);
        assert!(validate_strategy(&spec).is_valid());
    }

    #[test]
    fn requirements_of_unparseable_expression_are_empty() {
        let req = expression_requirements("SMA(mid,");
        assert_eq!(req.max_window, 0);
        assert_eq!(req.min_data_points, 10);
        assert!(req.variables_used.is_empty());
    }

    #[test]
    fn strategy_summary() {
        let summary = summarize(&valid_spec());
        assert_eq!(summary.num_functions, 1);
        assert_eq!(summary.num_entry_rules, 1);
        assert_eq!(summary.num_exit_rules, 1);
        assert_eq!(summary.requirements.min_data_points, 60);
        assert_eq!(
            summary.description,
            "Uses 1 custom indicator(s). Enters long on 1 condition(s). Exits on 1 condition(s)."
        );
    }
}
