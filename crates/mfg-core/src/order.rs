//! 製造訂單明細模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{BomId, OrderLineId};
use crate::item::ItemRef;
use crate::{MfgError, Result};

/// 明細狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderLineStatus {
    /// 待生產
    Pending,
    /// 生產中
    InProgress,
    /// 已完成
    Completed,
}

impl fmt::Display for OrderLineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// 優先級
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// 低
    Low,
    /// 一般
    #[default]
    Normal,
    /// 高
    High,
    /// 緊急
    Urgent,
}

/// 製造訂單明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingOrderLine {
    /// 明細ID
    pub id: OrderLineId,

    /// 所屬製造訂單
    pub order_id: u64,

    /// 生產的物料（成品或半成品）
    pub item: ItemRef,

    /// 指定使用的 BOM（未指定時依選擇策略）
    pub bom_id: Option<BomId>,

    /// 需求數量
    pub required_qty: Decimal,

    /// 已生產數量
    pub produced_qty: Decimal,

    /// 優先級
    pub priority: Priority,

    /// 計劃開始
    pub planned_start: Option<DateTime<Utc>>,

    /// 計劃完成
    pub planned_end: Option<DateTime<Utc>>,

    /// 狀態
    pub status: OrderLineStatus,
}

impl ManufacturingOrderLine {
    /// 創建新的明細
    pub fn new(id: OrderLineId, order_id: u64, item: ItemRef, required_qty: Decimal) -> Self {
        Self {
            id,
            order_id,
            item,
            bom_id: None,
            required_qty,
            produced_qty: Decimal::ZERO,
            priority: Priority::Normal,
            planned_start: None,
            planned_end: None,
            status: OrderLineStatus::Pending,
        }
    }

    /// 建構器模式：指定 BOM
    pub fn with_bom(mut self, bom_id: BomId) -> Self {
        self.bom_id = Some(bom_id);
        self
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// 建構器模式：設置計劃期間
    pub fn with_planned_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }

    /// 剩餘待生產數量
    pub fn remaining_qty(&self) -> Decimal {
        (self.required_qty - self.produced_qty).max(Decimal::ZERO)
    }

    /// 完成百分比（0-100）
    pub fn progress_percent(&self) -> Decimal {
        if self.required_qty <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.produced_qty / self.required_qty * Decimal::ONE_HUNDRED).round_dp(2)
    }

    /// 是否已完成
    pub fn is_completed(&self) -> bool {
        self.status == OrderLineStatus::Completed
    }

    /// 首張工單開工時由待生產轉為生產中
    ///
    /// 回傳狀態是否有變更。
    pub fn mark_started(&mut self) -> bool {
        if self.status == OrderLineStatus::Pending {
            self.status = OrderLineStatus::InProgress;
            true
        } else {
            false
        }
    }

    /// 累加已生產數量並推進狀態
    pub fn apply_production(&mut self, quantity: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO {
            return Err(MfgError::validation("生產數量必須大於 0"));
        }
        let produced = crate::quantity::checked_add(self.produced_qty, quantity)?;
        if produced > self.required_qty {
            return Err(MfgError::validation(format!(
                "明細 {} 已生產 {} + {} 超過需求 {}",
                self.id, self.produced_qty, quantity, self.required_qty
            )));
        }

        self.produced_qty = produced;
        if self.produced_qty >= self.required_qty {
            self.status = OrderLineStatus::Completed;
        } else {
            self.mark_started();
        }
        Ok(())
    }
}
