//! Shared data model for the catalog enricher.
//!
//! These types travel between the ranking stage, the fetch pipeline and the
//! transport layer. They carry no behavior beyond small accessors.

pub mod candidate;
pub mod product;

pub use candidate::*;
pub use product::*;
