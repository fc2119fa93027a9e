//! Service shell for the catalog enricher.
//!
//! - `api`: HTTP endpoints over the fetch pipeline
//! - `cli`: command-line interface
//! - `telemetry`: tracing subscriber setup

pub mod api;
pub mod cli;
pub mod telemetry;
