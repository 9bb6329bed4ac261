//! In-memory, content-addressed result cache.
//!
//! - [`fingerprint`]: SHA-256 keys over decoded image bytes
//! - [`store`]: TTL store with lazy expiry and an optional LRU capacity bound
//! - [`coordinator`]: cache-aside wrapper that runs at most one computation per key

pub mod coordinator;
pub mod fingerprint;
pub mod store;

pub use coordinator::{Coordinator, Outcome};
pub use fingerprint::{Fingerprint, fingerprint, fingerprint_parts};
pub use store::{CacheEntry, CacheStats, DEFAULT_TTL, ResultCache};
