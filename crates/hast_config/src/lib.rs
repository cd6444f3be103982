//! Hardware generation configuration.
//!
//! Reads a TOML document into a validated [`HardwareGenerationConfig`]: the
//! target device, which members become hardware entry points, whether the
//! SimpleMemory bus is generated, per-member invocation instance counts and
//! the VHDL rendering options.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config};
pub use types::*;
