//! Library half of the `mblock` binary: experiment configs and the driver
//! that runs them. Kept separate from `main.rs` so integration tests can
//! drive experiments without spawning the binary.

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::ExperimentConfig;
pub use error::{ConfigError, RunError};
pub use pipeline::{load_inputs, run_experiment, ExperimentInputs, ExperimentReport};
