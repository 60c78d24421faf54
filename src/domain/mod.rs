//! Core domain types and logic.

pub mod backtest;
pub mod batch;
pub mod config_validation;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod expr_parser;
pub mod indicator;
pub mod market;
pub mod metrics;
pub mod position;
pub mod rule_eval;
pub mod strategy;
pub mod templates;
pub mod validator;
