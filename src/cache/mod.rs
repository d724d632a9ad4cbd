//! Result caching.
//!
//! [`ResponseCache`] serves repeated requests from a
//! [`KeyValueStore`](crate::store::KeyValueStore) keyed on the request
//! [`Fingerprint`](crate::fingerprint::Fingerprint). See [`response`] for
//! the entry format and degradation rules.

pub mod response;

pub use response::{CacheConfig, CacheEntry, ResponseCache};
