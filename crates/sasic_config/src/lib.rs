//! Parsing and validation of `sasic.toml` flow configuration files.
//!
//! This crate reads the flow configuration and produces a strongly-typed
//! [`FlowConfig`]: input/output paths, annealing knobs, clock-tree and
//! power-down options, and cell-type role overrides.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
