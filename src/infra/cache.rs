//! Persistent on-disk caching of the session rate table with TTL.

use std::{
    fs,
    path::PathBuf,
    sync::OnceLock,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, warn};

use crate::domain::RateTable;

const CACHE_FILENAME: &str = "rates_cache.json";

/// Cache TTL: one hour. Rates drift slowly; an explicit refresh bypasses this.
pub const RATES_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Cached rate table with its fetch timestamp and source name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesCache {
    /// Unix timestamp (seconds) when the rates were fetched.
    pub cached_at: u64,
    /// Provider name the table came from.
    pub source: String,
    pub rates: RateTable,
}

impl RatesCache {
    pub fn new(source: &str, rates: RateTable) -> Self {
        let cached_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            cached_at,
            source: source.to_string(),
            rates,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age() > RATES_CACHE_TTL
    }

    pub fn age(&self) -> Duration {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Duration::from_secs(now.saturating_sub(self.cached_at))
    }

    /// Human-readable age string.
    pub fn age_string(&self) -> String {
        let secs = self.age().as_secs();
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }

    /// Fetch time as RFC3339, for the rates display.
    pub fn fetched_at_display(&self) -> String {
        OffsetDateTime::from_unix_timestamp(self.cached_at as i64)
            .ok()
            .and_then(|dt| dt.format(&Rfc3339).ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Cache file path in the app data directory.
fn cache_path() -> PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("import-cost-estimator");

        let _ = fs::create_dir_all(&base);

        base.join(CACHE_FILENAME)
    })
    .clone()
}

/// Load the rate cache from disk, if present, parseable, and unexpired.
pub fn load_rates_cache() -> Option<RatesCache> {
    let path = cache_path();

    if !path.exists() {
        debug!("no rate cache at {}", path.display());
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str::<RatesCache>(&content) {
            Ok(cache) => {
                if cache.is_expired() {
                    debug!("rate cache expired (age: {})", cache.age_string());
                    return None;
                }
                debug!(
                    "loaded rate cache from {} (source: {}, age: {})",
                    path.display(),
                    cache.source,
                    cache.age_string()
                );
                Some(cache)
            }
            Err(e) => {
                warn!("failed to parse rate cache: {e}");
                None
            }
        },
        Err(e) => {
            warn!("failed to read rate cache: {e}");
            None
        }
    }
}

/// Save the rate cache to disk.
pub fn save_rates_cache(cache: &RatesCache) -> Result<(), std::io::Error> {
    let path = cache_path();
    let content = serde_json::to_string_pretty(cache)?;
    fs::write(&path, content)?;
    debug!(
        "saved rate cache (source: {}) to {}",
        cache.source,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cache_is_not_expired() {
        let cache = RatesCache::new("fixed-defaults", RateTable::defaults());
        assert!(!cache.is_expired());
        assert!(cache.age_string().ends_with('s'));
    }

    #[test]
    fn stale_cache_expires_past_the_ttl() {
        let mut cache = RatesCache::new("remote-api", RateTable::defaults());
        cache.cached_at -= RATES_CACHE_TTL.as_secs() + 120;
        assert!(cache.is_expired());
        assert_eq!(cache.age_string(), "1h");
    }

    #[test]
    fn age_string_picks_the_right_unit() {
        let mut cache = RatesCache::new("remote-api", RateTable::defaults());
        cache.cached_at -= 150; // well inside the minutes bucket
        assert_eq!(cache.age_string(), "2m");
        cache.cached_at -= 2 * 86400;
        assert_eq!(cache.age_string(), "2d");
    }

    #[test]
    fn fetch_time_displays_as_rfc3339() {
        let mut cache = RatesCache::new("remote-api", RateTable::defaults());
        cache.cached_at = 1_700_000_000;
        assert_eq!(cache.fetched_at_display(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn cache_serialization_round_trips() {
        let cache = RatesCache::new("listing-page", RateTable::defaults());
        let json = serde_json::to_string(&cache).unwrap();
        let restored: RatesCache = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.cached_at, cache.cached_at);
        assert_eq!(restored.source, "listing-page");
        assert_eq!(restored.rates, cache.rates);
    }
}
