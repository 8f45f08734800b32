//! 資料表集合

use mfg_core::{
    Bom, BomComponent, BomId, InventoryMovement, InventoryRecord, ItemRef,
    ManufacturingOrderLine, MaterialId, MaterialRequirement, MaterialStatus, OrderLineId,
    WarehouseId, WorkOrder, WorkOrderId,
};
use serde::{Deserialize, Serialize};

use crate::table::{Log, Table};

/// 庫存記錄鍵（物料 × 倉庫）
pub type StockKey = (ItemRef, WarehouseId);

/// 物料狀態鍵（工單 × 原物料）
pub type StatusKey = (WorkOrderId, MaterialId);

/// 序號產生器
///
/// 與資料庫序列相同，交易回復時不會退回已配發的號碼。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sequences {
    bom: u64,
    order_line: u64,
    work_order: u64,
}

impl Sequences {
    pub fn next_bom(&mut self) -> BomId {
        self.bom += 1;
        BomId(self.bom)
    }

    pub fn next_order_line(&mut self) -> OrderLineId {
        self.order_line += 1;
        OrderLineId(self.order_line)
    }

    pub fn next_work_order(&mut self) -> WorkOrderId {
        self.work_order += 1;
        WorkOrderId(self.work_order)
    }
}

/// 所有資料表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    /// BOM 表頭
    pub boms: Table<BomId, Bom>,

    /// BOM 元件（每張 BOM 一份清單）
    pub bom_components: Table<BomId, Vec<BomComponent>>,

    /// 物料的 BOM 版次（每次 BOM 寫入加一）
    pub bom_revisions: Table<ItemRef, u64>,

    /// 庫存記錄
    pub inventory: Table<StockKey, InventoryRecord>,

    /// 庫存異動
    pub movements: Log<InventoryMovement>,

    /// 製造訂單明細
    pub order_lines: Table<OrderLineId, ManufacturingOrderLine>,

    /// 工單
    pub work_orders: Table<WorkOrderId, WorkOrder>,

    /// 工單物料需求
    pub requirements: Table<WorkOrderId, Vec<MaterialRequirement>>,

    /// 工單物料狀態
    pub material_status: Table<StatusKey, MaterialStatus>,

    /// 序號
    pub sequences: Sequences,
}

/// 各表的日誌位置
#[derive(Debug, Clone, Copy)]
pub(crate) struct Mark {
    boms: usize,
    bom_components: usize,
    bom_revisions: usize,
    inventory: usize,
    movements: usize,
    order_lines: usize,
    work_orders: usize,
    requirements: usize,
    material_status: usize,
}

impl Tables {
    pub(crate) fn mark(&self) -> Mark {
        Mark {
            boms: self.boms.mark(),
            bom_components: self.bom_components.mark(),
            bom_revisions: self.bom_revisions.mark(),
            inventory: self.inventory.mark(),
            movements: self.movements.mark(),
            order_lines: self.order_lines.mark(),
            work_orders: self.work_orders.mark(),
            requirements: self.requirements.mark(),
            material_status: self.material_status.mark(),
        }
    }

    pub(crate) fn rollback_to(&mut self, mark: Mark) {
        self.boms.rollback_to(mark.boms);
        self.bom_components.rollback_to(mark.bom_components);
        self.bom_revisions.rollback_to(mark.bom_revisions);
        self.inventory.rollback_to(mark.inventory);
        self.movements.rollback_to(mark.movements);
        self.order_lines.rollback_to(mark.order_lines);
        self.work_orders.rollback_to(mark.work_orders);
        self.requirements.rollback_to(mark.requirements);
        self.material_status.rollback_to(mark.material_status);
    }

    pub(crate) fn commit(&mut self) {
        self.boms.commit();
        self.bom_components.commit();
        self.bom_revisions.commit();
        self.inventory.commit();
        self.order_lines.commit();
        self.work_orders.commit();
        self.requirements.commit();
        self.material_status.commit();
    }

    /// 工單的所有物料狀態（依原物料ID排序）
    pub fn statuses_for(&self, work_order: WorkOrderId) -> Vec<MaterialStatus> {
        self.material_status
            .range((work_order, MaterialId(0))..=(work_order, MaterialId(u64::MAX)))
            .map(|(_, status)| status.clone())
            .collect()
    }

    /// 刪除工單的所有物料狀態
    pub fn remove_statuses_for(&mut self, work_order: WorkOrderId) -> usize {
        let keys: Vec<StatusKey> = self
            .material_status
            .range((work_order, MaterialId(0))..=(work_order, MaterialId(u64::MAX)))
            .map(|(key, _)| *key)
            .collect();
        for key in &keys {
            self.material_status.remove(key);
        }
        keys.len()
    }
}
