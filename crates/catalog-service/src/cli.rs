//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catalog-enricher")]
#[command(about = "Enriches ranked product candidates with catalog metadata", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file; defaults and environment only when absent
	#[arg(short, long, env = "CATALOG_CONFIG_FILE")]
	pub config: Option<PathBuf>,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long)]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
	/// Start the HTTP service
	Start,

	/// Validate the configuration and print a summary
	Validate,

	/// Fetch products once and print each outcome as a JSON line
	Fetch {
		/// Ranked product ids, comma separated
		#[arg(long, value_delimiter = ',', required = true)]
		ids: Vec<String>,

		/// Number of products to resolve
		#[arg(long, default_value_t = 10)]
		count: usize,
	},
}
