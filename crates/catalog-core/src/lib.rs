//! Bounded-concurrency product fetch pipeline.
//!
//! Ranked candidates flow through a cache-aside [`ItemResolver`], wrapped in
//! a [`RetryingResolver`] and admitted by a [`Dispatcher`]. The merger fans the
//! work out and yields outcomes in rank order until enough products were
//! resolved. [`ProductFetcher`] ties these together and owns the spawned
//! tasks; [`FetcherBuilder`] assembles one from configuration.

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod lifecycle;
pub mod merger;
pub mod resolver;
pub mod retry;

#[cfg(test)]
mod testing;

pub use builder::FetcherBuilder;
pub use dispatcher::{AdmissionCanceled, Dispatcher, Permit};
pub use error::{BuildError, ErrorKind, FetchError, PayloadOrigin, ShutdownError};
pub use fetcher::ProductFetcher;
pub use lifecycle::{GracefulShutdown, JobRegistry};
pub use merger::OutcomeStream;
pub use resolver::{CacheMode, ItemResolver, ResolverSettings};
pub use retry::{RetryPolicy, RetryingResolver};

use catalog_types::EnrichedItem;

/// Result of resolving one candidate.
pub type Outcome = Result<EnrichedItem, FetchError>;
