//! # sitecache
//!
//! Bounded LRU resource cache backing the `sited` static-file server.
//!
//! ## Architecture
//! - **Index**: AHash-keyed map from request path to entry slot (O(1))
//! - **Recency list**: intrusive doubly-linked list over an arena of slots,
//!   head = most-recently-used, tail = eviction victim (O(1) splices)
//! - **SiteCache**: the two combined behind one mutex, with hit/miss stats
//!
//! The generic [`LruCache`] carries the eviction machinery; [`SiteCache`]
//! adds the path → (content type, bytes) domain surface on top of it.

#![warn(missing_docs)]

mod cache;
mod error;
mod lru;
mod stats;

pub use cache::{PutOutcome, Resource, SiteCache};
pub use error::{Error, Result};
pub use lru::{Iter, LruCache, PutResult};
pub use stats::{CacheStats, StatsSnapshot};
