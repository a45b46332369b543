//! Cache configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_SNAPSHOT_TTL_SECS: u64 = 300;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;

/// Cache behavior, loaded from `statline.toml` under `[cache]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the snapshot cache. When disabled, every request recomputes.
    pub enabled: bool,
    /// Lifetime of a cached snapshot in seconds. Zero means never expire.
    pub snapshot_ttl_secs: u64,
    /// Interval between background expiry sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snapshot_ttl_secs: DEFAULT_SNAPSHOT_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.snapshot_ttl_secs, 300);
        assert_eq!(config.sweep_interval_secs, 600);
    }

    #[test]
    fn zero_ttl_means_no_expiry_duration() {
        let config = CacheConfig {
            snapshot_ttl_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.snapshot_ttl(), Duration::ZERO);
    }
}
