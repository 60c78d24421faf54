//! Strategy definitions.
//!
//! Two shapes:
//! - `StrategySpec`: the loosely typed wire form, as authored in JSON. Every
//!   field is optional so pre-flight can report all problems at once.
//! - `StrategyDefinition`: the closed typed form the rule engine consumes,
//!   produced only by a successful pre-flight.

use crate::domain::expr::CompareOp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tolerance for `==` / `!=` in rule conditions.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
    #[serde(default)]
    pub entry_rules: Vec<RuleSpec>,
    #[serde(default)]
    pub exit_rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<serde_json::Value>,
}

impl FunctionSpec {
    pub fn new(id: &str, name: &str, expression: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            expression: Some(expression.to_string()),
        }
    }
}

impl ConditionSpec {
    pub fn new(function_id: &str, operator: &str, threshold: f64) -> Self {
        Self {
            function_id: Some(function_id.to_string()),
            operator: Some(operator.to_string()),
            threshold: Some(serde_json::Value::from(threshold)),
        }
    }
}

impl RuleSpec {
    pub fn new(conditions: Vec<ConditionSpec>, logic: &str, action: &str) -> Self {
        Self {
            conditions,
            logic: Some(logic.to_string()),
            action: Some(action.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Logic {
    pub fn as_str(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Logic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(Logic::And),
            "OR" => Ok(Logic::Or),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "FLAT")]
    Flat,
    #[serde(rename = "HOLD")]
    Hold,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Buy, Action::Sell, Action::Flat, Action::Hold];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Flat => "FLAT",
            Action::Hold => "HOLD",
        }
    }

    /// Target position for this action; HOLD keeps whatever is held.
    pub fn target(self) -> Option<i32> {
        match self {
            Action::Buy => Some(1),
            Action::Sell => Some(-1),
            Action::Flat => Some(0),
            Action::Hold => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub id: String,
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub function_id: String,
    pub operator: CompareOp,
    pub threshold: f64,
}

impl Condition {
    /// True iff a value is present and satisfies `value OP threshold`.
    pub fn is_met(&self, value: Option<f64>) -> bool {
        match value {
            Some(v) => self
                .operator
                .apply_with_tolerance(v, self.threshold, EPSILON),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub conditions: Vec<Condition>,
    pub logic: Logic,
    pub action: Action,
}

impl Rule {
    /// Combines condition results per the rule's logic. An empty rule never fires.
    pub fn fires(&self, lookup: impl Fn(&str) -> Option<f64>) -> bool {
        if self.conditions.is_empty() {
            return false;
        }
        let mut results = self
            .conditions
            .iter()
            .map(|c| c.is_met(lookup(&c.function_id)));
        match self.logic {
            Logic::And => results.all(|met| met),
            Logic::Or => results.any(|met| met),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyDefinition {
    pub name: String,
    pub functions: Vec<FunctionDefinition>,
    pub entry_rules: Vec<Rule>,
    pub exit_rules: Vec<Rule>,
}
