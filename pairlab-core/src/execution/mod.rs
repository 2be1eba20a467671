//! Execution: cost model and simulated fills.

pub mod cost_model;
pub mod simulator;

pub use cost_model::{commission, slipped_price, ExecutionParams};
pub use simulator::ExecutionSimulator;
