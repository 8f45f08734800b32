//! # MFG Cache
//!
//! BOM 展開結果的緩存與失效追蹤

pub mod dirty_tracking;
pub mod resolution;

// Re-export 主要類型
pub use dirty_tracking::DirtyTracker;
pub use resolution::{CacheStats, ResolutionCache};
