//! # MFG BOM
//!
//! BOM 展開與維護模組
//!
//! - 多階 BOM 展開為原物料需求（含損耗）
//! - BOM 建立、替換、停用、刪除
//! - 並行批次展開

pub mod authoring;
pub mod batch;
pub mod resolver;
pub mod source;

// Re-export 主要類型
pub use authoring::{BomAuthor, BomUpdate};
pub use resolver::{BomResolver, ExplodedLine, MaterialNeed, Resolution};
pub use source::BomSource;
