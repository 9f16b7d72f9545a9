//! # explore-cache
//!
//! Memoizes explore responses keyed by a blake3 hash of the explore
//! identity, strategy and normalized query.
//!
//! - Per-entry TTL through a moka `Expiry`.
//! - Per-key single-flight: concurrent identical misses share one computation.
//!   If the leading caller goes away, a waiting caller takes over.
//! - Reverse index from source alias to keys, driving write-through and
//!   write-behind invalidation on `notify_record_changed`.

pub mod entry;
pub mod key;
pub mod result_cache;
pub mod single_flight;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use result_cache::{CacheStats, Fetched, Origin, ResultCache};
pub use single_flight::{wait_for_leader, Flight, FlightGuard, Landing, SingleFlight};
