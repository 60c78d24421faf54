//! Expression validation.
//!
//! Accepts only the whitelisted grammar: numeric literals, the fixed variable
//! set, `+ - * / ^ %`, unary `- +`, calls to the fixed function set, and
//! comparisons. Everything else the parser can represent is rejected by kind.

use crate::domain::error::EvalError;
use crate::domain::expr::Node;
use crate::domain::expr_parser;
use crate::domain::indicator::IndicatorFunction;
use crate::domain::market::Variable;

/// Deepest node level an expression may reach, counting the root as 0.
pub const MAX_DEPTH: usize = 15;

/// Lowercase substrings that are never part of a legitimate expression.
const FORBIDDEN_PATTERNS: &[&str] = &[
    "__",
    "import",
    "eval",
    "exec",
    "compile",
    "open",
    "file",
    "input",
    "raw_input",
    "__builtins__",
    "globals",
    "locals",
    "vars",
    "dir",
    "help",
    "quit",
    "exit",
];

/// Outcome of validating one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub ok: bool,
    pub error: Option<String>,
    pub suggestion: Option<String>,
}

impl Validation {
    fn valid() -> Self {
        Self {
            ok: true,
            error: None,
            suggestion: None,
        }
    }
}

pub fn validate(expression: &str) -> Validation {
    match parse_validated(expression) {
        Ok(_) => Validation::valid(),
        Err(EvalError::InvalidExpression { reason, suggestion }) => Validation {
            ok: false,
            error: Some(reason),
            suggestion,
        },
        Err(other) => Validation {
            ok: false,
            error: Some(other.to_string()),
            suggestion: None,
        },
    }
}

/// Parses and validates, returning the raw tree on success.
pub fn parse_validated(expression: &str) -> Result<Node, EvalError> {
    if expression.trim().is_empty() {
        return Err(EvalError::invalid("Expression cannot be empty"));
    }

    let lower = expression.to_lowercase();
    if let Some(pattern) = FORBIDDEN_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(EvalError::invalid(format!(
            "Forbidden pattern detected: '{}'",
            pattern
        )));
    }

    let node = match expr_parser::parse(expression) {
        Ok(node) => node,
        Err(err) if expr_parser::is_nesting_limit(&err) => {
            return Err(EvalError::invalid(too_complex()));
        }
        Err(err) => {
            return Err(EvalError::InvalidExpression {
                reason: format!("Syntax error: {}", err),
                suggestion: suggest_fix(expression),
            })
        }
    };

    check_node(&node, 0).map_err(|reason| {
        let suggestion = suggest_fix(expression).or_else(|| did_you_mean(&node));
        EvalError::InvalidExpression { reason, suggestion }
    })?;

    Ok(node)
}

fn too_complex() -> String {
    format!("Expression too complex (max depth: {})", MAX_DEPTH)
}

fn check_node(node: &Node, depth: usize) -> Result<(), String> {
    if depth > MAX_DEPTH {
        return Err(too_complex());
    }

    match node {
        Node::Number(_) => Ok(()),
        Node::Str(_) => Err("Only numeric constants allowed, got string".to_string()),
        Node::Name(name) => {
            if name.parse::<Variable>().is_ok() {
                return Ok(());
            }
            match similar_variable(name) {
                Some(v) => Err(format!(
                    "Variable '{}' not allowed. Did you mean '{}'?",
                    name, v
                )),
                None => Err(format!(
                    "Variable '{}' not allowed. Available: {}",
                    name,
                    variable_names().join(", ")
                )),
            }
        }
        Node::Binary { op, left, right } => {
            if !op.is_allowed() {
                return Err(format!("Operation '{}' not allowed", op.symbol()));
            }
            check_node(left, depth + 1)?;
            check_node(right, depth + 1)
        }
        Node::Unary { operand, .. } => check_node(operand, depth + 1),
        Node::Call {
            callee,
            args,
            keywords,
        } => {
            let name = match callee.as_ref() {
                Node::Name(name) => name,
                _ => return Err("Complex function calls not allowed".to_string()),
            };
            if name.parse::<IndicatorFunction>().is_err() {
                return Err(match similar_function(name) {
                    Some(f) => format!("Function '{}' not allowed. Did you mean '{}'?", name, f),
                    None => format!(
                        "Function '{}' not allowed. Available: {}",
                        name,
                        function_names().join(", ")
                    ),
                });
            }
            for arg in args {
                check_node(arg, depth + 1)?;
            }
            for kw in keywords {
                check_node(&kw.value, depth + 1)?;
            }
            Ok(())
        }
        Node::Compare { left, comparisons } => {
            check_node(left, depth + 1)?;
            for (_, right) in comparisons {
                check_node(right, depth + 1)?;
            }
            Ok(())
        }
        Node::Attribute { .. } | Node::Subscript { .. } | Node::List(_) => Err(format!(
            "Expression type '{}' not allowed",
            node.kind_name()
        )),
    }
}

fn variable_names() -> Vec<&'static str> {
    Variable::ALL.iter().map(|v| v.name()).collect()
}

fn function_names() -> Vec<&'static str> {
    IndicatorFunction::ALL.iter().map(|f| f.name()).collect()
}

fn prefix(name: &str) -> String {
    name.to_lowercase().chars().take(3).collect()
}

fn similar_variable(name: &str) -> Option<Variable> {
    let p = prefix(name);
    Variable::ALL
        .into_iter()
        .find(|v| v.name().to_lowercase().starts_with(&p))
}

fn similar_function(name: &str) -> Option<IndicatorFunction> {
    let p = prefix(name);
    IndicatorFunction::ALL
        .into_iter()
        .find(|f| f.name().to_lowercase().starts_with(&p))
}

/// Fix-ups for common wording mistakes.
fn suggest_fix(expression: &str) -> Option<String> {
    let lower = expression.to_lowercase();
    if lower.contains("price") {
        Some("Use 'mid' instead of 'price'".to_string())
    } else if lower.contains("average") || lower.contains("avg") {
        Some("Use 'SMA(mid, window)' for moving average".to_string())
    } else if lower.contains("stddev") {
        Some("Use 'STD(mid, window)' for standard deviation".to_string())
    } else {
        None
    }
}

/// First unknown name in the tree that has a close whitelisted match.
fn did_you_mean(node: &Node) -> Option<String> {
    let mut found = None;
    node.walk(&mut |n| {
        if found.is_some() {
            return;
        }
        if let Node::Call { callee, .. } = n {
            if let Node::Name(name) = callee.as_ref() {
                if name.parse::<IndicatorFunction>().is_err() {
                    found = similar_function(name).map(|f| format!("Did you mean '{}'?", f));
                }
            }
        }
    });
    if found.is_some() {
        return found;
    }
    node.walk(&mut |n| {
        if found.is_some() {
            return;
        }
        if let Node::Name(name) = n {
            let known = name.parse::<Variable>().is_ok() || name.parse::<IndicatorFunction>().is_ok();
            if !known {
                found = similar_variable(name).map(|v| format!("Did you mean '{}'?", v));
            }
        }
    });
    found
}
