//! Built-in strategy templates.

use crate::domain::strategy::{ConditionSpec, FunctionSpec, RuleSpec, StrategySpec};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub category: &'static str,
    pub difficulty: &'static str,
    pub description: &'static str,
    pub strategy: StrategySpec,
}

fn when(id: &str, op: &str, threshold: f64) -> ConditionSpec {
    ConditionSpec::new(id, op, threshold)
}

fn all(conditions: Vec<ConditionSpec>, action: &str) -> RuleSpec {
    RuleSpec::new(conditions, "AND", action)
}

/// FLAT once `id` is back inside `[lo, hi]`.
fn flat_between(id: &str, lo: f64, hi: f64) -> RuleSpec {
    all(vec![when(id, ">=", lo), when(id, "<=", hi)], "FLAT")
}

fn sma_mean_reversion() -> Template {
    Template {
        id: "sma_mean_reversion",
        category: "Mean Reversion",
        difficulty: "Beginner",
        description: "Buy when price drops below moving average, sell when above",
        strategy: StrategySpec {
            name: Some("SMA Mean Reversion".into()),
            functions: vec![FunctionSpec::new(
                "sma_ratio",
                "Price/SMA Ratio",
                "mid / SMA(mid, 50)",
            )],
            entry_rules: vec![
                all(vec![when("sma_ratio", "<", 0.998)], "BUY"),
                all(vec![when("sma_ratio", ">", 1.002)], "SELL"),
            ],
            exit_rules: vec![flat_between("sma_ratio", 0.9995, 1.0005)],
        },
    }
}

fn bollinger_bands() -> Template {
    Template {
        id: "bollinger_bands",
        category: "Volatility",
        difficulty: "Intermediate",
        description: "Trade when price breaks out of Bollinger Bands",
        strategy: StrategySpec {
            name: Some("Bollinger Band Position".into()),
            functions: vec![
                FunctionSpec::new(
                    "upper_band",
                    "Upper Bollinger Band",
                    "SMA(mid, 20) + 2 * STD(mid, 20)",
                ),
                FunctionSpec::new(
                    "lower_band",
                    "Lower Bollinger Band",
                    "SMA(mid, 20) - 2 * STD(mid, 20)",
                ),
                FunctionSpec::new(
                    "bb_position",
                    "BB Position",
                    "(mid - (SMA(mid, 20) - 2 * STD(mid, 20))) / (4 * STD(mid, 20))",
                ),
            ],
            entry_rules: vec![
                all(vec![when("bb_position", "<", 0.1)], "BUY"),
                all(vec![when("bb_position", ">", 0.9)], "SELL"),
            ],
            exit_rules: vec![flat_between("bb_position", 0.45, 0.55)],
        },
    }
}

fn momentum_trend() -> Template {
    Template {
        id: "momentum_trend",
        category: "Momentum",
        difficulty: "Beginner",
        description: "Follow strong momentum trends",
        strategy: StrategySpec {
            name: Some("Momentum Trend Following".into()),
            functions: vec![
                FunctionSpec::new("momentum_short", "Short-term Momentum", "MOMENTUM(mid, 10)"),
                FunctionSpec::new("momentum_long", "Long-term Momentum", "MOMENTUM(mid, 30)"),
            ],
            entry_rules: vec![
                all(
                    vec![
                        when("momentum_short", ">", 0.001),
                        when("momentum_long", ">", 0.0005),
                    ],
                    "BUY",
                ),
                all(
                    vec![
                        when("momentum_short", "<", -0.001),
                        when("momentum_long", "<", -0.0005),
                    ],
                    "SELL",
                ),
            ],
            exit_rules: vec![flat_between("momentum_short", -0.0002, 0.0002)],
        },
    }
}

fn spread_aware_mean_reversion() -> Template {
    Template {
        id: "spread_aware_mr",
        category: "Mean Reversion",
        difficulty: "Intermediate",
        description: "Mean reversion that only trades when spread is tight",
        strategy: StrategySpec {
            name: Some("Spread-Aware Mean Reversion".into()),
            functions: vec![
                FunctionSpec::new(
                    "price_deviation",
                    "Price Deviation",
                    "(mid - SMA(mid, 40)) / SMA(mid, 40)",
                ),
                FunctionSpec::new("spread_quality", "Spread Quality", "spread / SMA(spread, 20)"),
            ],
            entry_rules: vec![
                all(
                    vec![
                        when("price_deviation", "<", -0.0003),
                        when("spread_quality", "<", 0.8),
                    ],
                    "BUY",
                ),
                all(
                    vec![
                        when("price_deviation", ">", 0.0003),
                        when("spread_quality", "<", 0.8),
                    ],
                    "SELL",
                ),
            ],
            exit_rules: vec![
                flat_between("price_deviation", -0.0001, 0.0001),
                all(vec![when("spread_quality", ">", 2.0)], "FLAT"),
            ],
        },
    }
}

fn ema_crossover() -> Template {
    Template {
        id: "ema_crossover",
        category: "Trend Following",
        difficulty: "Beginner",
        description: "Trade on exponential moving average crossovers",
        strategy: StrategySpec {
            name: Some("EMA Crossover".into()),
            functions: vec![
                FunctionSpec::new("ema_fast", "Fast EMA", "EMA(mid, 12)"),
                FunctionSpec::new("ema_slow", "Slow EMA", "EMA(mid, 26)"),
                FunctionSpec::new("ema_ratio", "EMA Ratio", "EMA(mid, 12) / EMA(mid, 26)"),
            ],
            entry_rules: vec![
                all(vec![when("ema_ratio", ">", 1.0005)], "BUY"),
                all(vec![when("ema_ratio", "<", 0.9995)], "SELL"),
            ],
            exit_rules: vec![flat_between("ema_ratio", 0.9998, 1.0002)],
        },
    }
}

pub fn all_templates() -> Vec<Template> {
    vec![
        sma_mean_reversion(),
        bollinger_bands(),
        momentum_trend(),
        spread_aware_mean_reversion(),
        ema_crossover(),
    ]
}

pub fn get_template(id: &str) -> Option<Template> {
    all_templates().into_iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config_validation::{build_strategy, validate_strategy};
    use std::collections::HashSet;

    #[test]
    fn every_template_passes_preflight_cleanly() {
        for template in all_templates() {
            let report = validate_strategy(&template.strategy);
            assert!(report.is_valid(), "{}: {:?}", template.id, report.errors);
            assert!(report.warnings.is_empty(), "{}: {:?}", template.id, report.warnings);
            assert!(build_strategy(&template.strategy).is_ok());
        }
    }

    #[test]
    fn ids_are_unique() {
        let templates = all_templates();
        let ids: HashSet<_> = templates.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), templates.len());
    }

    #[test]
    fn lookup_by_id() {
        let t = get_template("sma_mean_reversion").unwrap();
        assert_eq!(t.strategy.functions[0].expression.as_deref(), Some("mid / SMA(mid, 50)"));
        assert_eq!(t.strategy.entry_rules.len(), 2);
        assert!(get_template("nope").is_none());
    }
}
