//! 物料狀態模型（規劃用的衍生視圖）

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{MaterialId, WorkOrderId};
use crate::quantity;
use crate::{MfgError, Result};

/// 物料狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialState {
    /// 無庫存
    Pending,
    /// 庫存足夠
    Ready,
    /// 部分足夠
    Partial,
    /// 已分配
    Allocated,
    /// 已耗用
    Consumed,
}

impl MaterialState {
    /// 依需求與可用量判定規劃狀態
    pub fn classify(required: Decimal, available: Decimal) -> Self {
        if available >= required {
            Self::Ready
        } else if available > Decimal::ZERO {
            Self::Partial
        } else {
            Self::Pending
        }
    }

    /// 是否仍可由重新檢查覆寫（pending / ready / partial）
    pub fn is_planning(&self) -> bool {
        matches!(self, Self::Pending | Self::Ready | Self::Partial)
    }
}

impl fmt::Display for MaterialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Partial => "partial",
            Self::Allocated => "allocated",
            Self::Consumed => "consumed",
        };
        f.write_str(name)
    }
}

/// 工單物料狀態
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialStatus {
    /// 工單
    pub work_order: WorkOrderId,

    /// 原物料
    pub material: MaterialId,

    /// 單位
    pub unit: String,

    /// 需求數量
    pub required_qty: Decimal,

    /// 生產倉可用量
    pub available_qty: Decimal,

    /// 已分配數量
    pub allocated_qty: Decimal,

    /// 已耗用數量
    pub consumed_qty: Decimal,

    /// 狀態
    pub status: MaterialState,

    /// 缺料量
    pub shortage_qty: Decimal,

    /// 最後檢查時間
    pub last_checked: DateTime<Utc>,
}

impl MaterialStatus {
    /// 依需求與可用量建立狀態
    pub fn evaluate(
        work_order: WorkOrderId,
        material: MaterialId,
        unit: String,
        required_qty: Decimal,
        available_qty: Decimal,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            work_order,
            material,
            unit,
            required_qty,
            available_qty,
            allocated_qty: Decimal::ZERO,
            consumed_qty: Decimal::ZERO,
            status: MaterialState::classify(required_qty, available_qty),
            shortage_qty: quantity::shortage(required_qty, available_qty),
            last_checked: checked_at,
        }
    }

    /// 重新檢查庫存
    ///
    /// 已分配或已耗用的狀態不會被覆寫，回傳是否有更新。
    pub fn recheck(&mut self, required_qty: Decimal, available_qty: Decimal, checked_at: DateTime<Utc>) -> bool {
        if !self.status.is_planning() {
            return false;
        }
        self.required_qty = required_qty;
        self.available_qty = available_qty;
        self.shortage_qty = quantity::shortage(required_qty, available_qty);
        self.status = MaterialState::classify(required_qty, available_qty);
        self.last_checked = checked_at;
        true
    }

    /// 分配物料（僅規劃訊號，不移動庫存）
    pub fn allocate(&mut self, qty: Decimal) -> Result<()> {
        if self.status == MaterialState::Consumed {
            return Err(MfgError::invalid_state(
                "物料狀態",
                format!("{}/{}", self.work_order, self.material),
                self.status,
                "allocate",
            ));
        }
        self.allocated_qty = quantity::non_negative(qty, "allocated_qty")?;
        self.status = MaterialState::Allocated;
        Ok(())
    }

    /// 記錄耗用（累加）
    pub fn consume(&mut self, qty: Decimal) -> Result<()> {
        let qty = quantity::positive(qty, "consumed_qty")?;
        self.consumed_qty += qty;
        self.status = MaterialState::Consumed;
        Ok(())
    }

    /// 檢查生產倉庫存是否足夠
    pub fn is_covered(&self) -> bool {
        self.available_qty >= self.required_qty
    }
}

/// 工單備料摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSummary {
    /// 工單
    pub work_order: WorkOrderId,

    /// 物料總數
    pub total_materials: usize,

    /// 庫存足夠的物料數
    pub ready_materials: usize,

    /// 缺料的物料數
    pub short_materials: usize,

    /// 缺料總量
    pub total_shortage: Decimal,
}

impl ReadinessSummary {
    /// 彙總工單所有物料狀態
    pub fn from_statuses(work_order: WorkOrderId, statuses: &[MaterialStatus]) -> Self {
        let ready_materials = statuses.iter().filter(|s| s.is_covered()).count();
        Self {
            work_order,
            total_materials: statuses.len(),
            ready_materials,
            short_materials: statuses.len() - ready_materials,
            total_shortage: statuses.iter().map(|s| s.shortage_qty).sum(),
        }
    }

    /// 所有物料皆足夠
    pub fn is_ready(&self) -> bool {
        self.short_materials == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn status(required: Decimal, available: Decimal) -> MaterialStatus {
        MaterialStatus::evaluate(
            WorkOrderId(1),
            MaterialId(1),
            "kg".to_string(),
            required,
            available,
            Utc::now(),
        )
    }

    #[rstest]
    #[case(dec!(30), dec!(40), MaterialState::Ready, dec!(0))]
    #[case(dec!(30), dec!(30), MaterialState::Ready, dec!(0))]
    #[case(dec!(30), dec!(25), MaterialState::Partial, dec!(5))]
    #[case(dec!(30), dec!(0), MaterialState::Pending, dec!(30))]
    fn test_evaluate(
        #[case] required: Decimal,
        #[case] available: Decimal,
        #[case] expected: MaterialState,
        #[case] shortage: Decimal,
    ) {
        let s = status(required, available);

        assert_eq!(s.status, expected);
        assert_eq!(s.shortage_qty, shortage);
    }

    #[test]
    fn test_recheck_skips_allocated_and_consumed() {
        let mut s = status(dec!(30), dec!(0));
        assert!(s.recheck(dec!(30), dec!(50), Utc::now()));
        assert_eq!(s.status, MaterialState::Ready);

        s.allocate(dec!(30)).unwrap();
        assert!(!s.recheck(dec!(30), dec!(0), Utc::now()));
        assert_eq!(s.status, MaterialState::Allocated);
        assert_eq!(s.available_qty, dec!(50));

        s.consume(dec!(10)).unwrap();
        assert!(!s.recheck(dec!(30), dec!(0), Utc::now()));
        assert_eq!(s.status, MaterialState::Consumed);
    }

    #[test]
    fn test_consume_is_additive() {
        let mut s = status(dec!(30), dec!(30));

        s.consume(dec!(10)).unwrap();
        s.consume(dec!(5.5)).unwrap();

        assert_eq!(s.consumed_qty, dec!(15.5));
        assert!(s.consume(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_allocate_after_consume_is_rejected() {
        let mut s = status(dec!(30), dec!(30));
        s.consume(dec!(30)).unwrap();

        assert!(s.allocate(dec!(1)).is_err());
        assert_eq!(s.status, MaterialState::Consumed);
    }

    #[test]
    fn test_readiness_summary() {
        let statuses = vec![status(dec!(30), dec!(40)), status(dec!(20), dec!(5))];
        let summary = ReadinessSummary::from_statuses(WorkOrderId(1), &statuses);

        assert_eq!(summary.total_materials, 2);
        assert_eq!(summary.ready_materials, 1);
        assert_eq!(summary.total_shortage, dec!(15));
        assert!(!summary.is_ready());
    }
}
