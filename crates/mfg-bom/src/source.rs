//! BOM 資料來源

use mfg_core::{Bom, BomComponent, BomId, BomSelectionPolicy, ItemRef};
use mfg_store::Tables;

/// BOM 資料來源（唯讀）
pub trait BomSource {
    /// 依ID取得 BOM 表頭
    fn bom(&self, id: BomId) -> Option<Bom>;

    /// 物料的所有 BOM 版本
    fn boms_for(&self, item: ItemRef) -> Vec<Bom>;

    /// BOM 的子件清單
    fn components(&self, bom: BomId) -> Vec<BomComponent>;

    /// 物料的 BOM 版次
    fn revision(&self, item: ItemRef) -> u64;

    /// 依策略選出當前 BOM
    ///
    /// 取建立時間最新者，時間相同時取ID較大者。
    fn current_bom(&self, item: ItemRef, policy: BomSelectionPolicy) -> Option<Bom> {
        self.boms_for(item)
            .into_iter()
            .filter(|bom| match policy {
                BomSelectionPolicy::LatestCreated => true,
                BomSelectionPolicy::LatestActive => bom.is_active,
            })
            .max_by_key(|bom| (bom.created_at, bom.id))
    }
}

impl BomSource for Tables {
    fn bom(&self, id: BomId) -> Option<Bom> {
        self.boms.get(&id).cloned()
    }

    fn boms_for(&self, item: ItemRef) -> Vec<Bom> {
        self.boms
            .values()
            .filter(|bom| bom.item == item)
            .cloned()
            .collect()
    }

    fn components(&self, bom: BomId) -> Vec<BomComponent> {
        self.bom_components.get(&bom).cloned().unwrap_or_default()
    }

    fn revision(&self, item: ItemRef) -> u64 {
        self.bom_revisions.get(&item).copied().unwrap_or(0)
    }
}
