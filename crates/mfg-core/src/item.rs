//! 物料參照（原物料 / 半成品 / 成品）

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{MaterialId, ProductId, SemiProductId};

/// 物料參照
///
/// 庫存與 BOM 的共同單位。標籤與ID皆相同時才視為相等，
/// 因此 `Material(1)` 與 `Product(1)` 是不同的物料。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    /// 原物料
    Material(MaterialId),
    /// 半成品
    SemiProduct(SemiProductId),
    /// 成品
    Product(ProductId),
}

impl ItemRef {
    /// 原物料
    pub fn material(id: u64) -> Self {
        Self::Material(MaterialId(id))
    }

    /// 半成品
    pub fn semi_product(id: u64) -> Self {
        Self::SemiProduct(SemiProductId(id))
    }

    /// 成品
    pub fn product(id: u64) -> Self {
        Self::Product(ProductId(id))
    }

    /// 類型名稱
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Material(_) => "material",
            Self::SemiProduct(_) => "semi_product",
            Self::Product(_) => "product",
        }
    }

    /// 原始ID
    pub fn raw_id(&self) -> u64 {
        match self {
            Self::Material(id) => id.0,
            Self::SemiProduct(id) => id.0,
            Self::Product(id) => id.0,
        }
    }

    /// 檢查是否為原物料
    pub fn is_material(&self) -> bool {
        matches!(self, Self::Material(_))
    }

    /// 檢查是否可以擁有 BOM（半成品或成品）
    pub fn is_buildable(&self) -> bool {
        match self {
            Self::Material(_) => false,
            Self::SemiProduct(_) | Self::Product(_) => true,
        }
    }

    /// 檢查是否可作為 BOM 子件（原物料或半成品）
    pub fn is_component(&self) -> bool {
        match self {
            Self::Material(_) | Self::SemiProduct(_) => true,
            Self::Product(_) => false,
        }
    }

    /// 取得原物料ID
    pub fn material_id(&self) -> Option<MaterialId> {
        match self {
            Self::Material(id) => Some(*id),
            Self::SemiProduct(_) | Self::Product(_) => None,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.raw_id())
    }
}

impl From<MaterialId> for ItemRef {
    fn from(id: MaterialId) -> Self {
        Self::Material(id)
    }
}

impl From<SemiProductId> for ItemRef {
    fn from(id: SemiProductId) -> Self {
        Self::SemiProduct(id)
    }
}

impl From<ProductId> for ItemRef {
    fn from(id: ProductId) -> Self {
        Self::Product(id)
    }
}
