//! shardlru - concurrent throughput harness
//!
//! Hammers a cache built from the environment with set/get pairs from
//! several threads, then reports throughput and statistics.
//!
//! # Environment Variables
//! - `LRU_CAPACITY`, `LRU_SHARDS`, `LRU_TTL_MS` - cache parameters
//! - `LRU_BENCH_OPS` - total set+get pairs (default: 1000000)
//! - `LRU_BENCH_THREADS` - worker threads (default: available parallelism)
//! - `LRU_SNAPSHOT` - optional path to save the final cache contents to

use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use shardlru::{CacheConfig, CacheStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shardlru=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::try_from_env().context("loading cache configuration")?;
    let total_ops: usize = env_or("LRU_BENCH_OPS", 1_000_000)?;
    let default_threads = thread::available_parallelism().map_or(4, |n| n.get());
    let threads: usize = env_or("LRU_BENCH_THREADS", default_threads)?.max(1);
    info!(
        "Configuration loaded: capacity={}, shards={}, ttl={:?}, ops={}, threads={}",
        config.capacity, config.shard_count, config.ttl, total_ops, threads
    );

    let cache = Arc::new(CacheStore::<u64>::from_config(&config));
    let per_thread = total_ops / threads;

    let started = Instant::now();
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let base = t * per_thread;
                for i in base..base + per_thread {
                    let key = i.to_string();
                    cache.set(key.as_str(), i as u64);
                    cache.get(&key);
                }
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("benchmark worker panicked"))?;
    }
    let elapsed = started.elapsed();

    let pairs = per_thread * threads;
    info!(
        "Completed {} set+get pairs in {:?} ({:.0} ops/sec)",
        pairs,
        elapsed,
        (pairs * 2) as f64 / elapsed.as_secs_f64()
    );
    info!("Stats: {}", serde_json::to_string(&cache.stats())?);

    if let Ok(path) = env::var("LRU_SNAPSHOT") {
        cache
            .save_file(&path)
            .with_context(|| format!("saving snapshot to {}", path))?;
    }

    Ok(())
}

fn env_or(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{}={:?} is not a number", name, raw)),
        Err(_) => Ok(default),
    }
}
