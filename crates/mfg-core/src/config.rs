//! 生產配置

use serde::{Deserialize, Serialize};

use crate::id::WarehouseId;
use crate::Result;

/// 生產流程配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionConfig {
    /// 生產倉（工單完工時從此扣料，物料狀態以此倉計算可用量）
    pub production_warehouse: WarehouseId,

    /// 成品倉（工單完工時入庫）
    pub output_warehouse: WarehouseId,

    /// 當前 BOM 選擇策略
    #[serde(default)]
    pub bom_policy: BomSelectionPolicy,

    /// 建立工單時是否同時產生物料狀態
    #[serde(default)]
    pub generate_status_on_create: bool,

    /// 展開結果緩存的最大筆數（超過時淘汰最久未使用者）
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// 預設緩存筆數
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl ProductionConfig {
    /// 創建新的生產配置
    pub fn new(production_warehouse: WarehouseId, output_warehouse: WarehouseId) -> Self {
        Self {
            production_warehouse,
            output_warehouse,
            bom_policy: BomSelectionPolicy::default(),
            generate_status_on_create: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// 從 JSON 載入配置
    ///
    /// # 範例
    /// ```
    /// # use mfg_core::{ProductionConfig, WarehouseId};
    /// let config = ProductionConfig::from_json_str(
    ///     r#"{"production_warehouse": 2, "output_warehouse": 3}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.production_warehouse, WarehouseId(2));
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 建構器模式：設置 BOM 選擇策略
    pub fn with_bom_policy(mut self, policy: BomSelectionPolicy) -> Self {
        self.bom_policy = policy;
        self
    }

    /// 建構器模式：建立工單時產生物料狀態
    pub fn with_status_on_create(mut self, enabled: bool) -> Self {
        self.generate_status_on_create = enabled;
        self
    }

    /// 建構器模式：設置緩存筆數上限
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// 當前 BOM 選擇策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BomSelectionPolicy {
    /// 最新建立的版本
    #[default]
    LatestCreated,

    /// 最新建立且啟用中的版本
    LatestActive,
}
