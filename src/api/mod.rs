//! Remote API access.
//!
//! - [`Transport`] / [`Connector`]: blocking request seam and per-batch handle factory
//! - [`HttpTransport`]: reqwest-backed transport
//! - [`Retrier`]: bounded concurrency and exponential-backoff retry
//! - [`paginate_all`]: cursor pagination with per-page retry
//! - [`PlaneClient`]: typed endpoints returning [`crate::model::Record`]s

mod client;
mod http;
mod paginate;
mod retry;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::PlaneClient;
pub use http::{HttpConnector, HttpTransport, REQUEST_TIMEOUT};
pub use paginate::{PAGE_SIZE, PageParams, paginate_all};
pub use retry::{MAX_CONCURRENT_CALLS, Retrier, RetryPolicy};
pub use transport::{Connector, Method, Transport};
