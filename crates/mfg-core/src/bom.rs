//! BOM 模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::id::{BomId, UserId};
use crate::item::ItemRef;
use crate::{quantity, MfgError, Result};

/// BOM 表頭
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bom {
    /// BOM ID
    pub id: BomId,

    /// 生產的物料（成品或半成品）
    pub item: ItemRef,

    /// 版本
    pub version: String,

    /// 建立者
    pub created_by: Option<UserId>,

    /// 建立時間
    pub created_at: DateTime<Utc>,

    /// 是否啟用
    pub is_active: bool,

    /// 備註
    pub note: Option<String>,
}

impl Bom {
    /// 創建新的 BOM 表頭
    pub fn new(id: BomId, item: ItemRef, version: String) -> Self {
        Self {
            id,
            item,
            version,
            created_by: None,
            created_at: Utc::now(),
            is_active: true,
            note: None,
        }
    }

    /// 建構器模式：設置建立者
    pub fn with_created_by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }

    /// 建構器模式：設置備註
    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }
}

/// BOM 子件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomComponent {
    /// 子件（原物料或半成品）
    pub component: ItemRef,

    /// 單位用量
    pub quantity_per_unit: Decimal,

    /// 損耗率（百分比，10 表示 10%）
    pub waste_percent: Decimal,

    /// 備註
    pub note: Option<String>,
}

impl BomComponent {
    /// 創建新的子件（無損耗）
    pub fn new(component: ItemRef, quantity_per_unit: Decimal) -> Self {
        Self {
            component,
            quantity_per_unit,
            waste_percent: Decimal::ZERO,
            note: None,
        }
    }

    /// 建構器模式：設置損耗率
    pub fn with_waste_percent(mut self, waste_percent: Decimal) -> Self {
        self.waste_percent = waste_percent;
        self
    }

    /// 建構器模式：設置備註
    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }

    /// 損耗係數 = 1 + 損耗率 / 100
    pub fn waste_factor(&self) -> Decimal {
        Decimal::ONE + self.waste_percent / Decimal::ONE_HUNDRED
    }

    /// 計算父件數量對應的子件需求（不做進位）
    ///
    /// 超出 `Decimal` 可表示範圍時回傳驗證錯誤。
    pub fn extended_quantity(&self, parent_quantity: Decimal) -> Result<Decimal> {
        let base = quantity::checked_mul(parent_quantity, self.quantity_per_unit)?;
        quantity::checked_mul(base, self.waste_factor())
    }

    /// 驗證子件規則
    pub fn validate(&self) -> Result<()> {
        if !self.component.is_component() {
            return Err(MfgError::validation(format!(
                "BOM 子件只能是原物料或半成品（收到 {}）",
                self.component
            )));
        }
        if self.quantity_per_unit <= Decimal::ZERO {
            return Err(MfgError::validation(format!(
                "子件 {} 的單位用量必須大於 0",
                self.component
            )));
        }
        if self.waste_percent < Decimal::ZERO {
            return Err(MfgError::validation(format!(
                "子件 {} 的損耗率不可為負數",
                self.component
            )));
        }
        Ok(())
    }
}
