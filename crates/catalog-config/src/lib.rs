// catalog-config/src/lib.rs

//! Configuration for the catalog enricher.
//!
//! Configuration is read from a TOML file, with `${VAR}` references
//! substituted from the environment, then selected `CATALOG_*` variables
//! override individual settings. See [`ConfigLoader`].

use thiserror::Error;

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}
