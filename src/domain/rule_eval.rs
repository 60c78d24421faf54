//! Rule evaluation engine.
//!
//! # Evaluation Semantics
//!
//! - Every function is evaluated once per tick into a cache keyed by id
//! - A failing function is indeterminate for that tick; the failure is logged
//!   once per id and counted in the diagnostics
//! - Entry rules are tried in order; the first that fires decides
//! - Exit rules are tried only when no entry rule fired and a position is held
//! - HOLD, or nothing firing, yields `None`: keep the current position

use crate::domain::backtest::{DecisionContext, DecisionPolicy};
use crate::domain::error::EvalError;
use crate::domain::evaluator::CompiledExpression;
use crate::domain::market::{History, MarketValues};
use crate::domain::position::Position;
use crate::domain::strategy::{Rule, StrategyDefinition};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Per-function failure record for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDiagnostic {
    pub first_error: String,
    pub failures: usize,
}

pub type Diagnostics = BTreeMap<String, FunctionDiagnostic>;

/// Decision state owned by a single backtest run.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    strategy: StrategyDefinition,
    compiled: Vec<(String, CompiledExpression)>,
    diagnostics: Diagnostics,
}

impl RuleEngine {
    /// Compiles every function expression once.
    pub fn new(strategy: StrategyDefinition) -> Result<Self, EvalError> {
        let compiled = strategy
            .functions
            .iter()
            .map(|f| Ok((f.id.clone(), CompiledExpression::compile(&f.expression)?)))
            .collect::<Result<Vec<_>, EvalError>>()?;
        Ok(Self {
            strategy,
            compiled,
            diagnostics: Diagnostics::new(),
        })
    }

    pub fn strategy(&self) -> &StrategyDefinition {
        &self.strategy
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Values of every function for the current tick. Failures are `None`.
    pub fn evaluate_functions(
        &mut self,
        values: &MarketValues,
        history: &dyn History,
    ) -> HashMap<String, Option<f64>> {
        let mut cache = HashMap::with_capacity(self.compiled.len());
        for (id, expr) in &self.compiled {
            let value = match expr.evaluate(values, history) {
                Ok(v) => v,
                Err(err) => {
                    record_failure(&mut self.diagnostics, id, &err);
                    None
                }
            };
            cache.insert(id.clone(), value);
        }
        cache
    }

    /// Target position for this tick, or `None` to keep the current one.
    pub fn decide(
        &mut self,
        current_position: Position,
        values: &MarketValues,
        history: &dyn History,
    ) -> Option<i32> {
        let cache = self.evaluate_functions(values, history);
        let lookup = |id: &str| cache.get(id).copied().flatten();

        if let Some(rule) = first_firing(&self.strategy.entry_rules, lookup) {
            return rule.action.target();
        }
        if current_position != Position::Flat {
            if let Some(rule) = first_firing(&self.strategy.exit_rules, lookup) {
                return rule.action.target();
            }
        }
        None
    }
}

fn first_firing(rules: &[Rule], lookup: impl Fn(&str) -> Option<f64> + Copy) -> Option<&Rule> {
    rules.iter().find(|rule| rule.fires(lookup))
}

fn record_failure(diagnostics: &mut Diagnostics, id: &str, err: &EvalError) {
    match diagnostics.get_mut(id) {
        Some(entry) => entry.failures += 1,
        None => {
            warn!(function = id, error = %err, "function evaluation failed");
            diagnostics.insert(
                id.to_string(),
                FunctionDiagnostic {
                    first_error: err.to_string(),
                    failures: 1,
                },
            );
        }
    }
}

impl DecisionPolicy for RuleEngine {
    fn target_position(&mut self, ctx: &DecisionContext<'_>) -> Option<i32> {
        self.decide(ctx.position, ctx.current, ctx.history)
    }
}
