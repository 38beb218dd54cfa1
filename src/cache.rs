// src/cache.rs

use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};

/// Detail reads are cached briefly; writers invalidate, so the TTL only
/// bounds staleness across instances.
const CACHE_TTL_SECS: u64 = 60;

/// Connects the cache. Returns `None` (and logs) on failure so a missing
/// Redis never blocks startup.
pub async fn connect(url: &str) -> Option<ConnectionManager> {
    let client = match redis::Client::open(url) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Invalid cache URL, caching disabled: {}", e);
            return None;
        }
    };

    match ConnectionManager::new(client).await {
        Ok(conn) => {
            tracing::info!("Cache connected");
            Some(conn)
        }
        Err(e) => {
            tracing::warn!("Cache unreachable, caching disabled: {}", e);
            None
        }
    }
}

pub fn detail_key(kind: &str, id: i64) -> String {
    format!("portal:{}:{}", kind, id)
}

/// Fetch a cached JSON value. Any cache error degrades to a miss.
pub async fn get_json<T: DeserializeOwned>(
    cache: &Option<ConnectionManager>,
    key: &str,
) -> Option<T> {
    let mut conn = cache.clone()?;
    match conn.get::<_, Option<String>>(key).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Cache read failed for {}: {}", key, e);
            None
        }
    }
}

/// Store a JSON value with the standard TTL. Errors are logged and ignored.
pub async fn put_json<T: Serialize>(cache: &Option<ConnectionManager>, key: &str, value: &T) {
    let Some(mut conn) = cache.clone() else {
        return;
    };
    let Ok(raw) = serde_json::to_string(value) else {
        return;
    };
    if let Err(e) = conn.set_ex::<_, _, ()>(key, raw, CACHE_TTL_SECS).await {
        tracing::warn!("Cache write failed for {}: {}", key, e);
    }
}

/// Drop a cached entry after a write.
pub async fn invalidate(cache: &Option<ConnectionManager>, key: &str) {
    let Some(mut conn) = cache.clone() else {
        return;
    };
    if let Err(e) = conn.del::<_, ()>(key).await {
        tracing::warn!("Cache invalidation failed for {}: {}", key, e);
    }
}
