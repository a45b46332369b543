//! Fallback-coordinated response production.

pub mod compress;
pub mod coordinator;
pub mod writer;

pub use coordinator::{
    FallbackMetrics, FallbackReason, SerializedResponse, serialize_with_fallback,
};
pub use writer::{CacheOutcome, write_response};
