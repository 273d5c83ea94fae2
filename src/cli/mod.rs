//! Command-line interface: clap definitions and the handlers behind them.

pub mod commands;
pub mod handlers;

pub use commands::{Cli, Commands};
