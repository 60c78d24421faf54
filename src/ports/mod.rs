//! Port traits the domain talks to.

pub mod config_port;
pub mod market_data_port;
pub mod report_port;
