//! Configuration for the discovery engine.
//!
//! Values come from the process environment with the defaults below. Sizes
//! are clamped to at least 1 so a misconfigured cache never degenerates into
//! a cache that can hold nothing.
//!
//! | Variable | Default |
//! |---|---|
//! | `DISCOVERY_SEARCH_CACHE_SIZE` | 10 |
//! | `DISCOVERY_ARTIFACTS_CACHE_SIZE` | 500 |
//! | `DISCOVERY_THUMBNAIL_CACHE_SIZE` | 500 |
//! | `DISCOVERY_FILE_HASH_BATCH_SIZE` | 50 |
//! | `DISCOVERY_DOMAIN_BATCH_SIZE` | 500 |
//! | `DISCOVERY_BANNED_DOMAINS` | `localhost,127.0.0.1` |
//! | `DISCOVERY_RECENT_ACTIVITY_DAYS` | 60 |
//! | `DISCOVERY_JOIN_POLL_MS` | 25 |
//! | `DISCOVERY_SUMMARY_PREFIX_BYTES` | 1500 |

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_SEARCH_CACHE_SIZE: usize = 10;
pub const DEFAULT_ARTIFACTS_CACHE_SIZE: usize = 500;
pub const DEFAULT_THUMBNAIL_CACHE_SIZE: usize = 500;
pub const DEFAULT_FILE_HASH_BATCH_SIZE: usize = 50;
pub const DEFAULT_DOMAIN_BATCH_SIZE: usize = 500;
pub const DEFAULT_RECENT_ACTIVITY_DAYS: u64 = 60;
pub const DEFAULT_JOIN_POLL_MS: u64 = 25;
pub const DEFAULT_SUMMARY_PREFIX_BYTES: usize = 1500;
pub const DEFAULT_BANNED_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Tunables for searches and caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum number of grouped search results kept in memory.
    pub search_cache_size: usize,
    /// Maximum number of (domain, artifact type) artifact lists kept.
    pub artifacts_cache_size: usize,
    /// Maximum number of domain thumbnails kept.
    pub thumbnail_cache_size: usize,
    /// Distinct MD5 hashes per central repository lookup.
    pub file_hash_batch_size: usize,
    /// Distinct domains per central repository lookup.
    pub domain_batch_size: usize,
    /// Domains dropped while materializing domain rows (compared case-insensitively).
    pub banned_domains: Vec<String>,
    /// Width of the "recent" window used for recent page views and downloads.
    pub recent_activity_days: u64,
    /// How often a waiting caller re-checks its own cancellation while
    /// another caller computes the same search.
    #[serde(with = "duration_millis")]
    pub join_poll_interval: Duration,
    /// Bytes read from the start of a file for the fallback text summary.
    pub summary_prefix_bytes: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_cache_size: DEFAULT_SEARCH_CACHE_SIZE,
            artifacts_cache_size: DEFAULT_ARTIFACTS_CACHE_SIZE,
            thumbnail_cache_size: DEFAULT_THUMBNAIL_CACHE_SIZE,
            file_hash_batch_size: DEFAULT_FILE_HASH_BATCH_SIZE,
            domain_batch_size: DEFAULT_DOMAIN_BATCH_SIZE,
            banned_domains: DEFAULT_BANNED_DOMAINS
                .iter()
                .map(|d| (*d).to_string())
                .collect(),
            recent_activity_days: DEFAULT_RECENT_ACTIVITY_DAYS,
            join_poll_interval: Duration::from_millis(DEFAULT_JOIN_POLL_MS),
            summary_prefix_bytes: DEFAULT_SUMMARY_PREFIX_BYTES,
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let banned_domains = env_value("DISCOVERY_BANNED_DOMAINS")
            .map_or(defaults.banned_domains, |raw| parse_csv(&raw));
        let config = Self {
            search_cache_size: env_usize("DISCOVERY_SEARCH_CACHE_SIZE", defaults.search_cache_size)
                .max(1),
            artifacts_cache_size: env_usize(
                "DISCOVERY_ARTIFACTS_CACHE_SIZE",
                defaults.artifacts_cache_size,
            )
            .max(1),
            thumbnail_cache_size: env_usize(
                "DISCOVERY_THUMBNAIL_CACHE_SIZE",
                defaults.thumbnail_cache_size,
            )
            .max(1),
            file_hash_batch_size: env_usize(
                "DISCOVERY_FILE_HASH_BATCH_SIZE",
                defaults.file_hash_batch_size,
            )
            .max(1),
            domain_batch_size: env_usize("DISCOVERY_DOMAIN_BATCH_SIZE", defaults.domain_batch_size)
                .max(1),
            banned_domains,
            recent_activity_days: env_u64(
                "DISCOVERY_RECENT_ACTIVITY_DAYS",
                defaults.recent_activity_days,
            ),
            join_poll_interval: Duration::from_millis(
                env_u64("DISCOVERY_JOIN_POLL_MS", DEFAULT_JOIN_POLL_MS).max(1),
            ),
            summary_prefix_bytes: env_usize(
                "DISCOVERY_SUMMARY_PREFIX_BYTES",
                defaults.summary_prefix_bytes,
            ),
        };
        tracing::debug!(
            search_cache_size = config.search_cache_size,
            artifacts_cache_size = config.artifacts_cache_size,
            thumbnail_cache_size = config.thumbnail_cache_size,
            banned_domains = config.banned_domains.len(),
            "discovery config loaded"
        );
        config
    }

    /// Returns `true` if `domain` is on the ban list.
    #[must_use]
    pub fn is_banned_domain(&self, domain: &str) -> bool {
        let domain = domain.trim();
        self.banned_domains
            .iter()
            .any(|banned| banned.eq_ignore_ascii_case(domain))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Environment helpers
// ---------------------------------------------------------------------------

#[cfg(test)]
thread_local! {
    static TEST_ENV_OVERRIDES: std::cell::RefCell<std::collections::HashMap<String, String>> =
        std::cell::RefCell::new(std::collections::HashMap::new());
}

#[cfg(test)]
fn test_env_override_value(key: &str) -> Option<String> {
    TEST_ENV_OVERRIDES.with(|cell| cell.borrow().get(key).cloned())
}

/// Read a value from the process environment.
#[must_use]
pub fn env_value(key: &str) -> Option<String> {
    #[cfg(test)]
    if let Some(v) = test_env_override_value(key) {
        return Some(v);
    }
    env::var(key).ok()
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_value(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_value(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
