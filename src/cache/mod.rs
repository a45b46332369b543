//! Statline snapshot cache.
//!
//! A process-local TTL cache holding per-format materializations of rating
//! reports. JSON and binary variants of the same base key are populated
//! from one computation pass but expire and are evicted independently.
//!
//! ## Configuration
//!
//! Controlled via `statline.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! snapshot_ttl_secs = 300
//! sweep_interval_secs = 600
//! ```

mod config;
mod keys;
mod lock;
mod snapshots;
mod ttl;

pub use config::CacheConfig;
pub use keys::{WireFormat, base_key, format_key, parse_format_key};
pub use snapshots::{CachedSnapshot, SnapshotCache, SnapshotPayload};
pub use ttl::TtlCache;

pub(crate) use lock::recover_poisoned;
