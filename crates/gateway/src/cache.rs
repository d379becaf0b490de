//! Stock quote cache, kept fresh by catalog invalidations

use catalog::Stock;
use dashmap::DashMap;

pub struct QuoteCache {
    /// `None` when caching is disabled
    entries: Option<DashMap<String, Stock>>,
}

impl QuoteCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: enabled.then(DashMap::new),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn get(&self, name: &str) -> Option<Stock> {
        self.entries
            .as_ref()?
            .get(name)
            .map(|entry| entry.value().clone())
    }

    pub fn insert(&self, stock: Stock) {
        if let Some(entries) = &self.entries {
            entries.insert(stock.name.clone(), stock);
        }
    }

    /// Returns whether an entry was dropped
    pub fn invalidate(&self, name: &str) -> bool {
        self.entries
            .as_ref()
            .map_or(false, |entries| entries.remove(name).is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(quantity: u32) -> Stock {
        Stock {
            name: "FishCo".to_string(),
            price: 12.5,
            quantity,
        }
    }

    #[test]
    fn test_insert_and_invalidate() {
        let cache = QuoteCache::new(true);
        assert!(cache.get("FishCo").is_none());

        cache.insert(stock(10));
        assert_eq!(cache.get("FishCo").unwrap().quantity, 10);

        assert!(cache.invalidate("FishCo"));
        assert!(!cache.invalidate("FishCo"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = QuoteCache::new(false);
        cache.insert(stock(10));
        assert!(!cache.is_enabled());
        assert!(cache.get("FishCo").is_none());
        assert_eq!(cache.len(), 0);
    }
}
