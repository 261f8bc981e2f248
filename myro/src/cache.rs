//! Connection scoped caches.
//!
//! Both caches are keyed by trimmed sql string, capacity 0 disables caching.
use lru::LruCache;
use std::{num::NonZeroUsize, sync::Arc};

use crate::{common::verbose, sql::Query, statement::PreparedStatement};

/// Parsed queries keyed by sql string.
#[derive(Debug)]
pub struct QueryCache {
    cache: Option<LruCache<String, Arc<Query>>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> QueryCache {
        Self { cache: NonZeroUsize::new(capacity).map(LruCache::new) }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cached parsed query, parse and insert on miss.
    pub fn get_or_parse(&mut self, sql: &str) -> Arc<Query> {
        let sql = sql.trim();
        let Some(cache) = &mut self.cache else {
            return Arc::new(Query::parse(sql));
        };

        if let Some(query) = cache.get(sql) {
            return query.clone();
        }

        let query = Arc::new(Query::parse(sql));
        cache.put(sql.to_owned(), query.clone());
        query
    }
}

/// Server side prepared statement handles keyed by sql string.
#[derive(Debug)]
pub struct PrepareCache {
    cache: Option<LruCache<String, PreparedStatement>>,
}

impl PrepareCache {
    pub fn new(capacity: usize) -> PrepareCache {
        Self { cache: NonZeroUsize::new(capacity).map(LruCache::new) }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&mut self, sql: &str) -> Option<PreparedStatement> {
        self.cache.as_mut()?.get(sql.trim()).cloned()
    }

    /// Insert statement, returns the handle that must be closed by the caller.
    ///
    /// When caching is disabled, `stmt` itself is returned.
    pub fn put(&mut self, sql: &str, stmt: PreparedStatement) -> Option<PreparedStatement> {
        let Some(cache) = &mut self.cache else {
            return Some(stmt);
        };

        let id = stmt.id();
        match cache.push(sql.trim().to_owned(), stmt) {
            Some((_, old)) if old.id() != id => {
                verbose!(evicted = old.id(), "prepare cache");
                Some(old)
            }
            _ => None,
        }
    }

    pub fn remove(&mut self, sql: &str) -> Option<PreparedStatement> {
        self.cache.as_mut()?.pop(sql.trim())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{PrepareCache, QueryCache};
    use crate::statement::PreparedStatement;

    fn stmt(id: u32) -> PreparedStatement {
        PreparedStatement::new(id, 0, Arc::new([]))
    }

    #[test]
    fn query_cache() {
        let mut cache = QueryCache::new(2);
        let a = cache.get_or_parse(" SELECT ? ");
        let b = cache.get_or_parse("SELECT ?");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.sql(), "SELECT ?");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn query_cache_disabled() {
        let mut cache = QueryCache::new(0);
        assert!(!cache.is_enabled());
        let a = cache.get_or_parse("SELECT 1");
        let b = cache.get_or_parse("SELECT 1");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.is_empty());
    }

    #[test]
    fn prepare_cache_eviction() {
        let mut cache = PrepareCache::new(2);
        assert!(cache.put("a", stmt(1)).is_none());
        assert!(cache.put("b", stmt(2)).is_none());
        assert_eq!(cache.get("a").map(|s| s.id()), Some(1));

        // `b` is least recently used
        assert_eq!(cache.put("c", stmt(3)).map(|s| s.id()), Some(2));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn prepare_cache_disabled() {
        let mut cache = PrepareCache::new(0);
        assert_eq!(cache.put("a", stmt(1)).map(|s| s.id()), Some(1));
        assert!(cache.get("a").is_none());
    }
}
