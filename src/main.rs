//! LRU TTL Cache - walkthrough binary
//!
//! Opens a small persistent cache, exercises expiry and eviction, then closes it.

use std::env;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lru_ttl_cache::{Cache, CacheConfig};

/// Runs the walkthrough.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Build configuration (environment when `CACHE_CAPACITY` is set, demo defaults otherwise)
/// 3. Open the cache, loading `cache.json` if present, and start autosave
/// 4. Insert three entries, one of them short-lived
/// 5. Wait past the short TTL and show expiry handling
/// 6. Touch `b`, insert `d` and show which key was evicted
/// 7. Close: stop autosave and write the final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lru_ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = if env::var_os("CACHE_CAPACITY").is_some() {
        CacheConfig::from_env()
    } else {
        CacheConfig::new(3)
            .with_default_ttl(Duration::from_secs(2))
            .with_persist_path("cache.json")
            .with_autosave_interval(Duration::from_secs(1))
    };
    info!(?config, "Configuration loaded");

    let cache: Cache = Cache::open(config)?;

    let result = walkthrough(&cache).await;
    cache.close().await?;
    result
}

async fn walkthrough(cache: &Cache) -> anyhow::Result<()> {
    let key = |k: &str| k.to_string();

    cache.set(
        key("a"),
        serde_json::json!({"user": "diego"}),
        Some(Duration::from_secs(1)),
    );
    cache.set(key("b"), serde_json::json!([1, 2, 3]), None);
    cache.set(key("c"), "value C", None);
    println!("Initial size: {}", cache.len());

    tokio::time::sleep(Duration::from_millis(1200)).await;

    // 'a' should have expired
    println!("'a' in cache? {}", cache.contains(&key("a")));
    match cache.get(&key("a")) {
        Ok(value) => println!("Access to 'a': {value}"),
        Err(e) if e.is_not_found() => println!("Access to 'a': {e}"),
        Err(e) => return Err(e.into()),
    }

    // Touch 'b' so it becomes most recent, then force an eviction
    cache.get(&key("b"))?;
    cache.set(key("d"), "value D", None);
    println!("Keys after inserting 'd': {:?}", cache.keys());
    println!("Current items: {:?}", cache.items());
    println!("Stats: {}", serde_json::to_string(&cache.stats())?);

    Ok(())
}
