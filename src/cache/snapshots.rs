//! Format-aware snapshot cache.
//!
//! Namespaces the TTL cache by `(base_key, format)` and stores per-format
//! materializations of one rating computation. The binary variant is
//! converted to its wire message before storage; raw domain objects are
//! never stored under a binary key.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::domain::ratings::RatingReport;
use crate::wire::convert::report_to_wire;
use crate::wire::messages::RatingReportMessage;

use super::config::CacheConfig;
use super::keys::{WireFormat, format_key};
use super::ttl::TtlCache;

pub(crate) const METRIC_CACHE_HIT_TOTAL: &str = "statline_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS_TOTAL: &str = "statline_cache_miss_total";

/// Per-format cached artifact derived from one computation pass.
#[derive(Clone)]
pub struct CachedSnapshot {
    pub format: WireFormat,
    pub payload: SnapshotPayload,
    pub cached_at: OffsetDateTime,
    /// Hex-encoded SHA-256 of the source dataset at population time.
    pub source_fingerprint: String,
}

/// The stored materialization. JSON keeps the domain report; binary keeps
/// the pre-converted wire message.
#[derive(Clone)]
pub enum SnapshotPayload {
    Json(Arc<RatingReport>),
    Binary(RatingReportMessage),
}

/// Format-aware adapter over the TTL cache.
///
/// Construction with a disabled config yields a valid no-op cache: every
/// `get_cached` misses and `set_cached` logs a warning. Callers never have
/// to branch on whether caching was enabled.
pub struct SnapshotCache {
    inner: Option<Arc<TtlCache<CachedSnapshot>>>,
    default_ttl: Duration,
    sweep_interval: Duration,
}

impl SnapshotCache {
    pub fn new(config: &CacheConfig) -> Self {
        let inner = config.enabled.then(|| Arc::new(TtlCache::new()));
        Self {
            inner,
            default_ttl: config.snapshot_ttl(),
            sweep_interval: config.sweep_interval(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            inner: None,
            default_ttl: Duration::ZERO,
            sweep_interval: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get_cached(&self, base: &str, format: WireFormat) -> Option<CachedSnapshot> {
        let Some(cache) = &self.inner else {
            return None;
        };
        let key = format_key(base, format);
        match cache.get(&key) {
            Some(snapshot) => {
                counter!(METRIC_CACHE_HIT_TOTAL, "format" => format.suffix()).increment(1);
                Some(snapshot)
            }
            None => {
                counter!(METRIC_CACHE_MISS_TOTAL, "format" => format.suffix()).increment(1);
                None
            }
        }
    }

    /// Store one format variant. Binary conversion happens here, before
    /// storage; on conversion failure the variant is skipped with a warning
    /// and the serve path degrades at response time instead.
    pub fn set_cached(
        &self,
        base: &str,
        format: WireFormat,
        report: &Arc<RatingReport>,
        fingerprint: &str,
        ttl: Duration,
    ) {
        let Some(cache) = &self.inner else {
            warn!(base, %format, "snapshot cache disabled, set skipped");
            return;
        };
        let payload = match format {
            WireFormat::Json => SnapshotPayload::Json(Arc::clone(report)),
            WireFormat::Binary => match report_to_wire(report) {
                Ok(message) => SnapshotPayload::Binary(message),
                Err(err) => {
                    warn!(base, error = %err, "binary snapshot conversion failed, variant skipped");
                    return;
                }
            },
        };
        let snapshot = CachedSnapshot {
            format,
            payload,
            cached_at: OffsetDateTime::now_utc(),
            source_fingerprint: fingerprint.to_string(),
        };
        cache.set(format_key(base, format), snapshot, ttl);
        debug!(base, %format, "snapshot stored");
    }

    /// Populate both format variants from one computation pass. The
    /// variants expire and are evicted independently afterwards.
    pub fn set_both(&self, base: &str, report: &Arc<RatingReport>, fingerprint: &str) {
        self.set_cached(base, WireFormat::Json, report, fingerprint, self.default_ttl);
        self.set_cached(
            base,
            WireFormat::Binary,
            report,
            fingerprint,
            self.default_ttl,
        );
    }

    pub fn delete_variant(&self, base: &str, format: WireFormat) {
        if let Some(cache) = &self.inner {
            cache.delete(&format_key(base, format));
        }
    }

    /// Delete both format keys of a base key, whether or not each exists.
    pub fn delete_all_variants(&self, base: &str) {
        if let Some(cache) = &self.inner {
            cache.delete(&format_key(base, WireFormat::Json));
            cache.delete(&format_key(base, WireFormat::Binary));
        }
    }

    /// Delete every snapshot derived from one resource, across all filter
    /// combinations and formats. The dataset-mutation hook calls this so no
    /// format can serve data from a prior generation.
    pub fn delete_resource(&self, resource: &str) -> usize {
        match &self.inner {
            Some(cache) => cache.delete_prefix(resource),
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |cache| cache.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start the background expiry sweep. Returns `None` when caching is
    /// disabled. Spawn at most once.
    pub fn spawn_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        self.inner
            .as_ref()
            .map(|cache| cache.spawn_sweeper(self.sweep_interval))
    }
}
