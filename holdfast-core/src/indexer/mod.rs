//! The Indexer Gateway: rate-limited, retry-aware fan-out
//! to configured indexer sources, normalizing heterogeneous release
//! descriptors into the crate's [`crate::domain::Release`] shape.

pub mod gateway;
pub mod providers;
pub mod rate_limit;

pub use gateway::{ContentType, IndexerDescriptor, IndexerGateway, IndexerProvider, QuerySpec, SearchOutcome};
pub use rate_limit::{RateLimitConfig, RateLimiter, RetryHint};
