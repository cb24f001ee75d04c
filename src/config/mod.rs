//! Command-line flags and the optional configuration file

mod args;
mod file;

pub use args::Args;
pub use file::{ConfigError, GuardConfig};
