//! Expression syntax trees.
//!
//! Two trees live here:
//! - `Node`: the raw parse tree. It can represent constructs the language does
//!   not allow (attribute access, subscripts, strings, lists, floor division)
//!   so the validator can reject them by kind with a precise message.
//! - `Expr`: the evaluable tree produced after validation. Variables passed to
//!   indicator calls have been rewritten into `Expr::Series` name tags.

use crate::domain::indicator::IndicatorFunction;
use crate::domain::market::Variable;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Mod,
    FloorDiv,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Mod => "%",
            BinaryOp::FloorDiv => "//",
        }
    }

    pub fn is_allowed(self) -> bool {
        !matches!(self, BinaryOp::FloorDiv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Gt,
        CompareOp::Lt,
        CompareOp::Ge,
        CompareOp::Le,
        CompareOp::Eq,
        CompareOp::Ne,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    /// Exact comparison, as used inside expressions.
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Gt => left > right,
            CompareOp::Lt => left < right,
            CompareOp::Ge => left >= right,
            CompareOp::Le => left <= right,
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
        }
    }

    /// Comparison where `==`/`!=` treat values within `epsilon` as equal.
    pub fn apply_with_tolerance(self, left: f64, right: f64, epsilon: f64) -> bool {
        match self {
            CompareOp::Eq => (left - right).abs() < epsilon,
            CompareOp::Ne => (left - right).abs() >= epsilon,
            other => other.apply(left, right),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for CompareOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompareOp::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: String,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Str(String),
    Name(String),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
        keywords: Vec<Keyword>,
    },
    Compare {
        left: Box<Node>,
        comparisons: Vec<(CompareOp, Node)>,
    },
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Subscript {
        value: Box<Node>,
        index: Box<Node>,
    },
    List(Vec<Node>),
}

impl Node {
    /// Human name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Number(_) => "number",
            Node::Str(_) => "string literal",
            Node::Name(_) => "name",
            Node::Binary { .. } => "binary operation",
            Node::Unary { .. } => "unary operation",
            Node::Call { .. } => "function call",
            Node::Compare { .. } => "comparison",
            Node::Attribute { .. } => "attribute access",
            Node::Subscript { .. } => "subscript",
            Node::List(_) => "list",
        }
    }

    /// Walks the tree depth-first, calling `visit` on every node.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        match self {
            Node::Number(_) | Node::Str(_) | Node::Name(_) => {}
            Node::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Node::Unary { operand, .. } => operand.walk(visit),
            Node::Call {
                callee,
                args,
                keywords,
            } => {
                callee.walk(visit);
                for arg in args {
                    arg.walk(visit);
                }
                for kw in keywords {
                    kw.value.walk(visit);
                }
            }
            Node::Compare { left, comparisons } => {
                left.walk(visit);
                for (_, node) in comparisons {
                    node.walk(visit);
                }
            }
            Node::Attribute { value, .. } => value.walk(visit),
            Node::Subscript { value, index } => {
                value.walk(visit);
                index.walk(visit);
            }
            Node::List(items) => {
                for item in items {
                    item.walk(visit);
                }
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(v) => write!(f, "{}", v),
            Node::Str(s) => write!(f, "{:?}", s),
            Node::Name(n) => f.write_str(n),
            Node::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Node::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-{}", operand),
                UnaryOp::Pos => write!(f, "+{}", operand),
            },
            Node::Call {
                callee,
                args,
                keywords,
            } => {
                write!(f, "{}(", callee)?;
                let mut first = true;
                for arg in args {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                    first = false;
                }
                for kw in keywords {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", kw.name, kw.value)?;
                    first = false;
                }
                f.write_str(")")
            }
            Node::Compare { left, comparisons } => {
                write!(f, "{}", left)?;
                for (op, node) in comparisons {
                    write!(f, " {} {}", op, node)?;
                }
                Ok(())
            }
            Node::Attribute { value, attr } => write!(f, "{}.{}", value, attr),
            Node::Subscript { value, index } => write!(f, "{}[{}]", value, index),
            Node::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Validated, rewritten expression ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Current scalar value of a variable.
    Variable(Variable),
    /// Name tag: look the variable's trailing history up by name.
    Series(Variable),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        function: IndicatorFunction,
        args: Vec<Expr>,
        keywords: Vec<(String, Expr)>,
    },
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CompareOp, Expr)>,
    },
}
