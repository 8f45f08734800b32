//! # MFG Core
//!
//! 核心資料模型與類型定義

pub mod bom;
pub mod catalog;
pub mod config;
pub mod id;
pub mod inventory;
pub mod item;
pub mod material_status;
pub mod order;
pub mod quantity;
pub mod work_order;

// Re-export 主要類型
pub use bom::{Bom, BomComponent};
pub use catalog::{Catalog, InMemoryCatalog, ItemInfo, UserInfo, WarehouseInfo};
pub use config::{BomSelectionPolicy, ProductionConfig, DEFAULT_CACHE_CAPACITY};
pub use id::{
    BomId, MaterialId, OrderLineId, ProductId, SemiProductId, UserId, WarehouseId, WorkOrderId,
};
pub use inventory::{InventoryMovement, InventoryRecord, MovementKind, Reference, ReferenceKind};
pub use item::ItemRef;
pub use material_status::{MaterialState, MaterialStatus, ReadinessSummary};
pub use order::{ManufacturingOrderLine, OrderLineStatus, Priority};
pub use work_order::{MaterialRequirement, WorkOrder, WorkOrderStatus};

use rust_decimal::Decimal;

/// 製造核心錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum MfgError {
    #[error("資料驗證失敗: {0}")]
    Validation(String),

    #[error("找不到{entity}: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("庫存不足: {item} @ 倉庫 {warehouse}，可用 {available}，需求 {requested}")]
    InsufficientStock {
        item: ItemRef,
        warehouse: WarehouseId,
        available: Decimal,
        requested: Decimal,
    },

    #[error("BOM 存在循環引用: {}", format_path(.path))]
    BomCycle { path: Vec<ItemRef> },

    #[error("找不到 {0} 的 BOM")]
    MissingBom(ItemRef),

    #[error("{entity} {id} 目前狀態為 {status}，不允許執行 {action}")]
    InvalidState {
        entity: &'static str,
        id: String,
        status: String,
        action: &'static str,
    },

    #[error("儲存層錯誤: {0}")]
    Storage(String),
}

impl MfgError {
    /// 建立驗證錯誤
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 建立找不到實體的錯誤
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// 建立狀態錯誤
    pub fn invalid_state(
        entity: &'static str,
        id: impl ToString,
        status: impl ToString,
        action: &'static str,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            status: status.to_string(),
            action,
        }
    }

    /// 是否為庫存不足錯誤
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }
}

impl From<serde_json::Error> for MfgError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<std::io::Error> for MfgError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

fn format_path(path: &[ItemRef]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" → ")
}

pub type Result<T> = std::result::Result<T, MfgError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = MfgError::BomCycle {
            path: vec![
                ItemRef::SemiProduct(SemiProductId(1)),
                ItemRef::SemiProduct(SemiProductId(2)),
                ItemRef::SemiProduct(SemiProductId(1)),
            ],
        };

        assert_eq!(
            err.to_string(),
            "BOM 存在循環引用: semi_product:1 → semi_product:2 → semi_product:1"
        );
    }

    #[test]
    fn test_insufficient_stock_flag() {
        let err = MfgError::InsufficientStock {
            item: ItemRef::Material(MaterialId(1)),
            warehouse: WarehouseId(2),
            available: dec!(25),
            requested: dec!(30),
        };

        assert!(err.is_insufficient_stock());
        assert!(!MfgError::validation("x").is_insufficient_stock());
    }
}
