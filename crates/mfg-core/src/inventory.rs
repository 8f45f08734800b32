//! 庫存模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::id::{UserId, WarehouseId, WorkOrderId};
use crate::item::ItemRef;

/// 庫存記錄（物料 × 倉庫）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// 物料
    pub item: ItemRef,

    /// 倉庫
    pub warehouse_id: WarehouseId,

    /// 現有庫存（永不為負）
    pub quantity: Decimal,

    /// 最後異動時間
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// 創建空的庫存記錄
    pub fn empty(item: ItemRef, warehouse_id: WarehouseId) -> Self {
        Self {
            item,
            warehouse_id,
            quantity: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }
}

/// 異動類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// 入庫
    Import,
    /// 出庫
    Export,
    /// 調撥
    Transfer,
}

/// 來源單據類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// 生產工單
    WorkOrder,
    /// 採購訂單
    PurchaseOrder,
    /// 銷售訂單
    SalesOrder,
    /// 盤點調整
    Adjustment,
    /// 手動作業
    Manual,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WorkOrder => "work_order",
            Self::PurchaseOrder => "purchase_order",
            Self::SalesOrder => "sales_order",
            Self::Adjustment => "adjustment",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// 異動來源單據
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// 單據類型
    pub kind: ReferenceKind,

    /// 單據ID
    pub id: u64,

    /// 說明
    pub note: Option<String>,

    /// 操作人
    pub created_by: Option<UserId>,
}

impl Reference {
    /// 創建新的來源單據
    pub fn new(kind: ReferenceKind, id: u64) -> Self {
        Self {
            kind,
            id,
            note: None,
            created_by: None,
        }
    }

    /// 生產工單來源
    pub fn work_order(id: WorkOrderId) -> Self {
        Self::new(ReferenceKind::WorkOrder, id.0)
    }

    /// 建構器模式：設置說明
    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }

    /// 建構器模式：設置操作人
    pub fn with_created_by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }

    /// 檢查是否指向同一張單據
    pub fn points_to(&self, kind: ReferenceKind, id: u64) -> bool {
        self.kind == kind && self.id == id
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// 庫存異動（只增不改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMovement {
    /// 異動ID
    pub id: Uuid,

    /// 異動類型
    pub kind: MovementKind,

    /// 物料
    pub item: ItemRef,

    /// 數量（恆為正）
    pub quantity: Decimal,

    /// 來源倉庫
    pub from_warehouse: Option<WarehouseId>,

    /// 目的倉庫
    pub to_warehouse: Option<WarehouseId>,

    /// 來源單據
    pub reference: Reference,

    /// 異動時間
    pub occurred_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// 入庫異動
    pub fn import(item: ItemRef, to: WarehouseId, quantity: Decimal, reference: Reference) -> Self {
        Self::new(MovementKind::Import, item, quantity, None, Some(to), reference)
    }

    /// 出庫異動
    pub fn export(item: ItemRef, from: WarehouseId, quantity: Decimal, reference: Reference) -> Self {
        Self::new(MovementKind::Export, item, quantity, Some(from), None, reference)
    }

    /// 調撥異動
    pub fn transfer(
        item: ItemRef,
        from: WarehouseId,
        to: WarehouseId,
        quantity: Decimal,
        reference: Reference,
    ) -> Self {
        Self::new(
            MovementKind::Transfer,
            item,
            quantity,
            Some(from),
            Some(to),
            reference,
        )
    }

    fn new(
        kind: MovementKind,
        item: ItemRef,
        quantity: Decimal,
        from_warehouse: Option<WarehouseId>,
        to_warehouse: Option<WarehouseId>,
        reference: Reference,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            item,
            quantity,
            from_warehouse,
            to_warehouse,
            reference,
            occurred_at: Utc::now(),
        }
    }

    /// 檢查此異動是否從倉庫扣減庫存
    pub fn removes_stock(&self) -> bool {
        self.from_warehouse.is_some()
    }

    /// 對指定倉庫的淨影響
    pub fn net_effect_on(&self, warehouse: WarehouseId) -> Decimal {
        let mut effect = Decimal::ZERO;
        if self.to_warehouse == Some(warehouse) {
            effect += self.quantity;
        }
        if self.from_warehouse == Some(warehouse) {
            effect -= self.quantity;
        }
        effect
    }
}
