//! Backtesting engine: the event queue and the loop that drains it.

pub mod loop_runner;
pub mod queue;

pub use loop_runner::{Backtest, RunResult};
pub use queue::EventQueue;
