//! Tag/scope-aware in-process cache: LRU + TTL + bulk ops + optional
//! per-scope entitlement encryption. Spec.md §4.E.

pub mod r#async;
pub mod engine;
pub mod entitlement;
pub mod entry;
pub mod time;

pub use engine::{Cache, CacheConfig};
pub use entitlement::{CompositeEntitlementProvider, EntitlementProvider, FixedScopeProvider};
pub use entry::SetOptions;
pub use r#async::CancellationToken;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("operation cancelled")]
    Cancelled,
}
