//! Per-table result cache.
//!
//! Caching is opt-in per (database, table) with a TTL. Entries are keyed by
//! the inline rendering of the statement, so two textually different but
//! equivalent queries are cached separately. Writes clear the entries of
//! the written table and of every joined entry that read from it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::driver::Row;
use crate::value::Value;

/// A cached read result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// Raw rows of a select, decoded again on every hit.
    Rows(Arc<Vec<Row>>),
    /// Result of an aggregate.
    Scalar(Value),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    created_at: Instant,
    /// Other tables the result was read from.
    depends_on: HashSet<String>,
}

#[derive(Debug, Default)]
struct TableCache {
    ttl: Option<Duration>,
    entries: HashMap<String, CacheEntry>,
}

/// Hit and miss counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    /// Lookups answered from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups on cache-enabled tables that found nothing usable.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

type TableKey = (String, String);

fn key(database: &str, table: &str) -> TableKey {
    (database.to_string(), table.to_string())
}

/// Result cache shared by the handles of one client.
#[derive(Debug, Default)]
pub struct ResultCache {
    tables: RwLock<HashMap<TableKey, TableCache>>,
    stats: CacheStats,
}

impl ResultCache {
    /// Creates a cache with caching disabled everywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables caching for a table. Changing the TTL keeps existing entries.
    pub fn enable(&self, database: &str, table: &str, ttl: Duration) {
        debug!(database = %database, table = %table, ttl = ?ttl, "Enabling result cache");
        self.tables.write().entry(key(database, table)).or_default().ttl = Some(ttl);
    }

    /// Disables caching for a table and drops its entries.
    pub fn disable(&self, database: &str, table: &str) {
        debug!(database = %database, table = %table, "Disabling result cache");
        self.tables.write().remove(&key(database, table));
    }

    /// Returns whether caching is enabled for a table.
    #[must_use]
    pub fn is_enabled(&self, database: &str, table: &str) -> bool {
        self.tables
            .read()
            .get(&key(database, table))
            .is_some_and(|t| t.ttl.is_some())
    }

    /// Drops every entry of a table, keeping it enabled.
    pub fn clear(&self, database: &str, table: &str) {
        let mut tables = self.tables.write();
        if let Some(cache) = tables.get_mut(&key(database, table)) {
            cache.entries.clear();
        }
    }

    /// Returns the cached value for `query`, dropping it if it has expired.
    ///
    /// Lookups share a read lock; the write lock is only taken to remove an
    /// expired entry.
    #[must_use]
    pub fn get(&self, database: &str, table: &str, query: &str) -> Option<CachedValue> {
        let table_key = key(database, table);
        let expired = {
            let tables = self.tables.read();
            let cache = tables.get(&table_key)?;
            let ttl = cache.ttl?;
            match cache.entries.get(query) {
                Some(entry) if entry.created_at.elapsed() < ttl => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(table = %table, query = %query, "Cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut tables = self.tables.write();
            if let Some(cache) = tables.get_mut(&table_key) {
                // Another thread may have refreshed the entry meanwhile.
                let still_expired = match (cache.ttl, cache.entries.get(query)) {
                    (Some(ttl), Some(entry)) => entry.created_at.elapsed() >= ttl,
                    _ => false,
                };
                if still_expired {
                    trace!(table = %table, query = %query, "Dropping expired cache entry");
                    cache.entries.remove(query);
                }
            }
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores a value when caching is enabled for the table.
    ///
    /// `depends_on` lists the other tables the value was read from.
    pub fn put<I, S>(&self, database: &str, table: &str, query: &str, value: CachedValue, depends_on: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tables = self.tables.write();
        let Some(cache) = tables.get_mut(&key(database, table)) else {
            return;
        };
        if cache.ttl.is_none() {
            return;
        }
        cache.entries.insert(
            query.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                depends_on: depends_on
                    .into_iter()
                    .map(Into::into)
                    .filter(|t: &String| t != table)
                    .collect(),
            },
        );
    }

    /// Clears the table's entries and every entry elsewhere that depends on
    /// it.
    pub fn invalidate_table(&self, database: &str, table: &str) {
        let mut tables = self.tables.write();
        let mut cleared = 0;
        for ((db, name), cache) in tables.iter_mut() {
            if db != database {
                continue;
            }
            let before = cache.entries.len();
            if name == table {
                cache.entries.clear();
            } else {
                cache.entries.retain(|_, e| !e.depends_on.contains(table));
            }
            cleared += before - cache.entries.len();
        }
        if cleared > 0 {
            debug!(database = %database, table = %table, cleared, "Invalidated cached results");
        }
    }

    /// Number of live entries for a table.
    #[must_use]
    pub fn len(&self, database: &str, table: &str) -> usize {
        self.tables
            .read()
            .get(&key(database, table))
            .map_or(0, |t| t.entries.len())
    }

    /// Hit and miss counters.
    #[must_use]
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn rows(n: i64) -> CachedValue {
        CachedValue::Rows(Arc::new(vec![Row::from_pairs([("id", Value::Int(n))])]))
    }

    #[test]
    fn test_disabled_by_default() {
        let cache = ResultCache::new();
        cache.put("db", "t", "select 1", rows(1), Vec::<String>::new());
        assert_eq!(cache.get("db", "t", "select 1"), None);
        assert!(!cache.is_enabled("db", "t"));
    }

    #[test]
    fn test_put_get_and_ttl() {
        let cache = ResultCache::new();
        cache.enable("db", "t", Duration::from_millis(30));
        cache.put("db", "t", "select * from t", rows(1), Vec::<String>::new());
        assert_eq!(cache.get("db", "t", "select * from t"), Some(rows(1)));
        assert_eq!(cache.get("db", "t", "select  * from t"), None);

        thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("db", "t", "select * from t"), None);
        assert_eq!(cache.len("db", "t"), 0);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 2);
    }

    #[test]
    fn test_invalidate_follows_dependencies() {
        let cache = ResultCache::new();
        let ttl = Duration::from_secs(60);
        cache.enable("db", "orders", ttl);
        cache.enable("db", "users", ttl);
        cache.put("db", "orders", "plain", rows(1), Vec::<String>::new());
        cache.put("db", "orders", "joined", rows(2), ["users"]);
        cache.put("db", "users", "u", rows(3), Vec::<String>::new());

        cache.invalidate_table("db", "users");
        assert_eq!(cache.get("db", "users", "u"), None);
        assert_eq!(cache.get("db", "orders", "joined"), None);
        assert_eq!(cache.get("db", "orders", "plain"), Some(rows(1)));
    }

    #[test]
    fn test_disable_and_clear() {
        let cache = ResultCache::new();
        cache.enable("db", "t", Duration::from_secs(60));
        cache.put("db", "t", "q", CachedValue::Scalar(Value::Int(4)), Vec::<String>::new());
        cache.clear("db", "t");
        assert_eq!(cache.len("db", "t"), 0);
        assert!(cache.is_enabled("db", "t"));

        cache.put("db", "t", "q", CachedValue::Scalar(Value::Int(4)), Vec::<String>::new());
        cache.disable("db", "t");
        assert!(!cache.is_enabled("db", "t"));
        assert_eq!(cache.get("db", "t", "q"), None);
    }

    #[test]
    fn test_hits_need_only_shared_access() {
        let cache = ResultCache::new();
        cache.enable("db", "t", Duration::from_secs(60));
        cache.put("db", "t", "q", rows(1), Vec::<String>::new());

        // A reader holding the lock does not block lookups.
        let _reader = cache.tables.read();
        assert_eq!(cache.get("db", "t", "q"), Some(rows(1)));
        assert_eq!(cache.get("db", "t", "other"), None);
        assert_eq!(cache.get("db", "off", "q"), None);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }
}
