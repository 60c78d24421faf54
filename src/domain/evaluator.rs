//! Expression evaluation.
//!
//! Evaluation is two-phase. After validation, bare variable names passed
//! positionally to an indicator call are rewritten into series tags (look the
//! history up by name); everywhere else a variable is its current scalar. The
//! rewritten tree is then walked directly. `None` is an indeterminate value
//! and propagates through arithmetic.

use crate::domain::error::EvalError;
use crate::domain::expr::{BinaryOp, Expr, Node, UnaryOp};
use crate::domain::indicator::{Argument, IndicatorFunction};
use crate::domain::market::{History, MarketValues, Variable};
use crate::domain::validator;

/// A validated, rewritten expression that can be evaluated repeatedly.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    root: Expr,
}

impl CompiledExpression {
    pub fn compile(expression: &str) -> Result<Self, EvalError> {
        let node = validator::parse_validated(expression)?;
        let root = rewrite(&node)?;
        Ok(Self {
            source: expression.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Evaluates against the current tick values and prior-tick history.
    ///
    /// `Ok(None)` is indeterminate: a soft indicator short of history, a math
    /// function outside its domain, or a non-finite result.
    pub fn evaluate(
        &self,
        values: &MarketValues,
        history: &dyn History,
    ) -> Result<Option<f64>, EvalError> {
        let result = eval(&self.root, values, history)?;
        Ok(result.filter(|v| v.is_finite()))
    }
}

/// One-shot validate, rewrite and evaluate.
pub fn evaluate(
    expression: &str,
    values: &MarketValues,
    history: &dyn History,
) -> Result<Option<f64>, EvalError> {
    CompiledExpression::compile(expression)?.evaluate(values, history)
}

fn variable(name: &str) -> Result<Variable, EvalError> {
    name.parse::<Variable>()
        .map_err(|_| EvalError::invalid(format!("Variable '{}' not allowed", name)))
}

fn rewrite(node: &Node) -> Result<Expr, EvalError> {
    match node {
        Node::Number(v) => Ok(Expr::Number(*v)),
        Node::Name(name) => Ok(Expr::Variable(variable(name)?)),
        Node::Binary { op, left, right } => Ok(Expr::Binary {
            op: *op,
            left: Box::new(rewrite(left)?),
            right: Box::new(rewrite(right)?),
        }),
        Node::Unary { op, operand } => Ok(Expr::Unary {
            op: *op,
            operand: Box::new(rewrite(operand)?),
        }),
        Node::Call {
            callee,
            args,
            keywords,
        } => {
            let function = match callee.as_ref() {
                Node::Name(name) => name.parse::<IndicatorFunction>().map_err(|_| {
                    EvalError::invalid(format!("Function '{}' not allowed", name))
                })?,
                _ => return Err(EvalError::invalid("Complex function calls not allowed")),
            };
            let args = args
                .iter()
                .map(|arg| match arg {
                    Node::Name(name) => Ok(Expr::Series(variable(name)?)),
                    other => rewrite(other),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let keywords = keywords
                .iter()
                .map(|kw| Ok((kw.name.clone(), rewrite(&kw.value)?)))
                .collect::<Result<Vec<_>, EvalError>>()?;
            Ok(Expr::Call {
                function,
                args,
                keywords,
            })
        }
        Node::Compare { left, comparisons } => Ok(Expr::Compare {
            left: Box::new(rewrite(left)?),
            comparisons: comparisons
                .iter()
                .map(|(op, right)| Ok((*op, rewrite(right)?)))
                .collect::<Result<Vec<_>, EvalError>>()?,
        }),
        other => Err(EvalError::invalid(format!(
            "Expression type '{}' not allowed",
            other.kind_name()
        ))),
    }
}

fn eval(
    expr: &Expr,
    values: &MarketValues,
    history: &dyn History,
) -> Result<Option<f64>, EvalError> {
    match expr {
        Expr::Number(v) => Ok(Some(*v)),
        Expr::Variable(v) | Expr::Series(v) => Ok(Some(values.get(*v))),
        Expr::Unary { op, operand } => {
            let value = eval(operand, values, history)?;
            Ok(value.map(|v| match op {
                UnaryOp::Neg => -v,
                UnaryOp::Pos => v,
            }))
        }
        Expr::Binary { op, left, right } => {
            let l = eval(left, values, history)?;
            let r = eval(right, values, history)?;
            match (l, r) {
                (Some(l), Some(r)) => apply_binary(*op, l, r).map(Some),
                _ => Ok(None),
            }
        }
        Expr::Call {
            function,
            args,
            keywords,
        } => {
            let args = args
                .iter()
                .map(|arg| argument(arg, values, history))
                .collect::<Result<Vec<_>, _>>()?;
            let keywords = keywords
                .iter()
                .map(|(name, value)| Ok((name.clone(), argument(value, values, history)?)))
                .collect::<Result<Vec<_>, EvalError>>()?;
            function.call(&args, &keywords, history)
        }
        Expr::Compare { left, comparisons } => {
            let mut current = match eval(left, values, history)? {
                Some(v) => v,
                None => return Ok(None),
            };
            for (op, right) in comparisons {
                let next = match eval(right, values, history)? {
                    Some(v) => v,
                    None => return Ok(None),
                };
                if !op.apply(current, next) {
                    return Ok(Some(0.0));
                }
                current = next;
            }
            Ok(Some(1.0))
        }
    }
}

fn argument(
    expr: &Expr,
    values: &MarketValues,
    history: &dyn History,
) -> Result<Argument, EvalError> {
    match expr {
        Expr::Series(variable) => Ok(Argument::Series {
            variable: *variable,
            current: values.get(*variable),
        }),
        other => Ok(Argument::Scalar(eval(other, values, history)?)),
    }
}

fn apply_binary(op: BinaryOp, l: f64, r: f64) -> Result<f64, EvalError> {
    match op {
        BinaryOp::Add => Ok(l + r),
        BinaryOp::Sub => Ok(l - r),
        BinaryOp::Mul => Ok(l * r),
        BinaryOp::Div => {
            if r == 0.0 {
                return Err(EvalError::numeric("Division by zero in expression"));
            }
            Ok(l / r)
        }
        BinaryOp::Mod => {
            if r == 0.0 {
                return Err(EvalError::numeric("Division by zero in expression"));
            }
            // Floored modulo: the result takes the sign of the divisor.
            let m = l % r;
            if m != 0.0 && (m < 0.0) != (r < 0.0) {
                Ok(m + r)
            } else {
                Ok(m)
            }
        }
        BinaryOp::Pow => {
            if l == 0.0 && r < 0.0 {
                return Err(EvalError::numeric("Division by zero in expression"));
            }
            let result = l.powf(r);
            if result.is_infinite() && l.is_finite() && r.is_finite() {
                return Err(EvalError::numeric("Numeric overflow in expression"));
            }
            Ok(result)
        }
        BinaryOp::FloorDiv => Err(EvalError::invalid("Operation '//' not allowed")),
    }
}
