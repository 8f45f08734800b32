//! BOM 展開結果緩存
//!
//! 以（根物料、指定 BOM、數量、選擇策略）為鍵。每筆緩存記錄展開時走訪物料的 BOM 版次，
//! 任一版次變動或被標記為髒時，該筆緩存失效並重新展開。錯誤結果不緩存。
//! 筆數達上限時淘汰最久未使用的一筆。

use mfg_bom::{BomResolver, BomSource, MaterialNeed};
use mfg_core::{BomId, BomSelectionPolicy, ItemRef, Result, DEFAULT_CACHE_CAPACITY};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::dirty_tracking::DirtyTracker;

type CacheKey = (ItemRef, Option<BomId>, Decimal, BomSelectionPolicy);

#[derive(Debug, Clone)]
struct CacheEntry {
    needs: Vec<MaterialNeed>,
    revisions: Vec<(ItemRef, u64)>,
    last_used: u64,
}

impl CacheEntry {
    fn depends_on(&self, item: &ItemRef) -> bool {
        self.revisions.iter().any(|(dep, _)| dep == item)
    }

    fn is_current<S: BomSource + ?Sized>(&self, source: &S) -> bool {
        self.revisions
            .iter()
            .all(|&(item, revision)| source.revision(item) == revision)
    }
}

/// 緩存統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// 展開結果緩存
#[derive(Debug)]
pub struct ResolutionCache {
    entries: HashMap<CacheKey, CacheEntry>,
    dirty: DirtyTracker,
    capacity: usize,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResolutionCache {
    /// 創建空的緩存
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定筆數上限（至少 1 筆）
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            dirty: DirtyTracker::new(),
            capacity: capacity.max(1),
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 取得展開結果（命中時不重新展開）
    pub fn resolve<S: BomSource + ?Sized>(
        &mut self,
        resolver: &BomResolver<'_, S>,
        root: ItemRef,
        bom_id: Option<BomId>,
        qty: Decimal,
    ) -> Result<Vec<MaterialNeed>> {
        if !self.dirty.is_clean() {
            self.sweep();
        }

        self.tick += 1;
        let key = (root, bom_id, qty.normalize(), resolver.policy());
        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.is_current(resolver.source()) {
                entry.last_used = self.tick;
                self.hits += 1;
                tracing::debug!("緩存命中: {} × {}", root, qty);
                return Ok(entry.needs.clone());
            }
            tracing::debug!("緩存過期: {} × {}", root, qty);
            self.entries.remove(&key);
        }

        self.misses += 1;
        let resolution = resolver.resolve_traced(root, bom_id, qty)?;
        let revisions = resolution
            .dependencies
            .iter()
            .map(|&item| (item, resolver.source().revision(item)))
            .collect();

        while self.entries.len() >= self.capacity {
            self.evict_least_recent();
        }
        self.entries.insert(
            key,
            CacheEntry {
                needs: resolution.needs.clone(),
                revisions,
                last_used: self.tick,
            },
        );
        Ok(resolution.needs)
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.evictions += 1;
            tracing::debug!("緩存已滿（{} 筆），淘汰 {}", self.capacity, key.0);
        }
    }

    /// 標記物料為髒，依賴它的緩存在下次存取或清掃時移除
    pub fn invalidate(&mut self, item: ItemRef) {
        self.dirty.mark_dirty(item);
    }

    /// 移除依賴髒物料的緩存，回傳移除筆數
    pub fn sweep(&mut self) -> usize {
        if self.dirty.is_clean() {
            return 0;
        }

        let before = self.entries.len();
        let dirty_items = self.dirty.dirty_items();
        self.entries
            .retain(|_, entry| !dirty_items.iter().any(|item| entry.depends_on(item)));
        let removed = before - self.entries.len();

        tracing::debug!("清掃緩存: 髒物料 {:?}，移除 {} 筆", dirty_items, removed);
        self.dirty.clear();
        removed
    }

    /// 清空緩存
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirty.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfg_core::{Bom, BomComponent, InMemoryCatalog, MfgError};
    use mfg_store::Tables;
    use rust_decimal_macros::dec;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_item(ItemRef::material(1), "M1", "鋼管", "kg")
            .with_item(ItemRef::material(2), "M2", "螺絲", "pcs")
    }

    fn tables() -> Tables {
        let mut tables = Tables::default();
        for (id, item, components) in [
            (
                1,
                ItemRef::product(100),
                vec![BomComponent::new(ItemRef::semi_product(10), dec!(2))],
            ),
            (
                2,
                ItemRef::semi_product(10),
                vec![BomComponent::new(ItemRef::material(1), dec!(5))],
            ),
        ] {
            tables.boms.insert(BomId(id), Bom::new(BomId(id), item, "v1".to_string()));
            tables.bom_components.insert(BomId(id), components);
            tables.bom_revisions.insert(item, 1);
        }
        tables
    }

    #[test]
    fn test_hit_after_first_resolution() {
        let tables = tables();
        let catalog = catalog();
        let resolver = BomResolver::new(&tables, &catalog);
        let mut cache = ResolutionCache::new();

        let first = cache.resolve(&resolver, ItemRef::product(100), None, dec!(2)).unwrap();
        let second = cache.resolve(&resolver, ItemRef::product(100), None, dec!(2.00)).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0,
                entries: 1
            }
        );
    }

    #[test]
    fn test_child_revision_change_invalidates() {
        let mut tables = tables();
        let catalog = catalog();
        let mut cache = ResolutionCache::new();

        let before = cache
            .resolve(&BomResolver::new(&tables, &catalog), ItemRef::product(100), None, dec!(1))
            .unwrap();
        assert_eq!(before[0].required_qty, dec!(10));

        tables.bom_components.insert(
            BomId(2),
            vec![BomComponent::new(ItemRef::material(2), dec!(3))],
        );
        tables.bom_revisions.insert(ItemRef::semi_product(10), 2);

        let after = cache
            .resolve(&BomResolver::new(&tables, &catalog), ItemRef::product(100), None, dec!(1))
            .unwrap();
        assert_eq!(after[0].material.0, 2);
        assert_eq!(after[0].required_qty, dec!(6));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_invalidate_and_sweep() {
        let tables = tables();
        let catalog = catalog();
        let resolver = BomResolver::new(&tables, &catalog);
        let mut cache = ResolutionCache::new();

        cache.resolve(&resolver, ItemRef::product(100), None, dec!(1)).unwrap();
        cache.resolve(&resolver, ItemRef::semi_product(10), None, dec!(1)).unwrap();
        assert_eq!(cache.stats().entries, 2);

        cache.invalidate(ItemRef::product(100));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.stats().entries, 1);

        cache.invalidate(ItemRef::semi_product(10));
        cache.resolve(&resolver, ItemRef::semi_product(10), None, dec!(1)).unwrap();
        assert_eq!(cache.stats().misses, 3);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let tables = tables();
        let catalog = catalog();
        let resolver = BomResolver::new(&tables, &catalog);
        let mut cache = ResolutionCache::new();

        let result = cache.resolve(&resolver, ItemRef::product(999), None, dec!(1));

        assert!(matches!(result, Err(MfgError::MissingBom(_))));
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_full_cache_evicts_least_recently_used() {
        let tables = tables();
        let catalog = catalog();
        let resolver = BomResolver::new(&tables, &catalog);
        let mut cache = ResolutionCache::with_capacity(2);
        let bike = ItemRef::product(100);

        cache.resolve(&resolver, bike, None, dec!(1)).unwrap();
        cache.resolve(&resolver, bike, None, dec!(2)).unwrap();
        // 再次使用數量 1，數量 2 成為最久未使用
        cache.resolve(&resolver, bike, None, dec!(1)).unwrap();
        cache.resolve(&resolver, bike, None, dec!(3)).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 1);

        cache.resolve(&resolver, bike, None, dec!(1)).unwrap();
        assert_eq!(cache.stats().hits, 2);
        cache.resolve(&resolver, bike, None, dec!(2)).unwrap();
        assert_eq!(cache.stats().misses, 4);
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn test_distinct_quantities_stay_within_capacity() {
        let tables = tables();
        let catalog = catalog();
        let resolver = BomResolver::new(&tables, &catalog);
        let mut cache = ResolutionCache::with_capacity(8);

        for qty in 1..=100 {
            cache
                .resolve(&resolver, ItemRef::product(100), None, Decimal::from(qty))
                .unwrap();
        }

        assert_eq!(cache.capacity(), 8);
        assert_eq!(cache.stats().entries, 8);
        assert_eq!(cache.stats().evictions, 92);
        assert_eq!(ResolutionCache::with_capacity(0).capacity(), 1);
    }
}
