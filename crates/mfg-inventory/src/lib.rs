//! # MFG Inventory
//!
//! 多倉庫存帳：唯一可以異動庫存數量的元件

pub mod ledger;

// Re-export 主要類型
pub use ledger::Ledger;
