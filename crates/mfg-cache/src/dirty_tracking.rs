//! 髒標記追蹤

use mfg_core::ItemRef;
use std::collections::HashSet;

/// 髒標記追蹤器
#[derive(Debug, Default)]
pub struct DirtyTracker {
    dirty_items: HashSet<ItemRef>,
}

impl DirtyTracker {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 標記物料為髒
    pub fn mark_dirty(&mut self, item: ItemRef) {
        self.dirty_items.insert(item);
    }

    /// 檢查物料是否為髒
    pub fn is_dirty(&self, item: &ItemRef) -> bool {
        self.dirty_items.contains(item)
    }

    /// 是否沒有任何髒標記
    pub fn is_clean(&self) -> bool {
        self.dirty_items.is_empty()
    }

    /// 清除所有髒標記
    pub fn clear(&mut self) {
        self.dirty_items.clear();
    }

    /// 獲取所有髒物料
    pub fn dirty_items(&self) -> Vec<ItemRef> {
        let mut items: Vec<ItemRef> = self.dirty_items.iter().copied().collect();
        items.sort();
        items
    }
}
