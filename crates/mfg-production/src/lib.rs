//! # MFG Production
//!
//! 生產流程模組
//!
//! - 製造訂單明細（進度彙總）
//! - 工單狀態機（建立、開工、暫停、完工、取消、刪除）
//! - 工單物料狀態（備料檢查、分配、耗用）
//! - 依 BOM 直接生產（不經工單）

pub mod bom_production;
pub mod material_status;
pub mod order_line;
pub mod work_order;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export 主要類型
pub use bom_production::{BomProduction, ProductionReceipt};
pub use material_status::MaterialStatusTracker;
pub use order_line::{LineProgress, OrderLineDraft, OrderLineService};
pub use work_order::{NewWorkOrder, WorkOrderService};
