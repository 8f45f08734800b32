//! 工單模型與狀態轉換

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{MaterialId, OrderLineId, UserId, WorkOrderId};
use crate::order::Priority;
use crate::{MfgError, Result};

/// 工單狀態
///
/// ```text
/// pending ──► in_progress ──► completed
///    │          │   ▲
///    │          ▼   │
///    │         paused
///    └──────► cancelled ◄── in_progress
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    /// 待開工
    Pending,
    /// 生產中
    InProgress,
    /// 暫停
    Paused,
    /// 已完工
    Completed,
    /// 已取消
    Cancelled,
}

impl WorkOrderStatus {
    /// 是否為終止狀態
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// 工單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    /// 工單ID
    pub id: WorkOrderId,

    /// 工單編號
    pub code: String,

    /// 所屬明細
    pub order_line: OrderLineId,

    /// 生產數量
    pub work_quantity: Decimal,

    /// 完工數量
    pub completed_quantity: Option<Decimal>,

    /// 狀態
    pub status: WorkOrderStatus,

    /// 負責人
    pub assigned_to: Option<UserId>,

    /// 優先級
    pub priority: Priority,

    /// 計劃開始
    pub planned_start: Option<DateTime<Utc>>,

    /// 計劃完成
    pub planned_end: Option<DateTime<Utc>>,

    /// 實際開始
    pub actual_start: Option<DateTime<Utc>>,

    /// 實際完成
    pub actual_end: Option<DateTime<Utc>>,

    /// 備註
    pub notes: Option<String>,

    /// 建立時間
    pub created_at: DateTime<Utc>,
}

impl WorkOrder {
    /// 創建新的工單
    pub fn new(id: WorkOrderId, order_line: OrderLineId, work_quantity: Decimal) -> Self {
        Self {
            id,
            code: Self::code_for(id),
            order_line,
            work_quantity,
            completed_quantity: None,
            status: WorkOrderStatus::Pending,
            assigned_to: None,
            priority: Priority::Normal,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// 依ID產生工單編號
    pub fn code_for(id: WorkOrderId) -> String {
        format!("WO-{:06}", id.0)
    }

    /// 建構器模式：設置負責人
    pub fn with_assignee(mut self, user: UserId) -> Self {
        self.assigned_to = Some(user);
        self
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// 建構器模式：設置備註
    pub fn with_notes(mut self, notes: String) -> Self {
        self.notes = Some(notes);
        self
    }

    fn reject(&self, action: &'static str) -> MfgError {
        MfgError::invalid_state("工單", self.id, self.status, action)
    }

    /// 開工（pending → in_progress）
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.status != WorkOrderStatus::Pending {
            return Err(self.reject("start"));
        }
        self.status = WorkOrderStatus::InProgress;
        self.actual_start = Some(at);
        Ok(())
    }

    /// 暫停（in_progress → paused）
    pub fn pause(&mut self) -> Result<()> {
        if self.status != WorkOrderStatus::InProgress {
            return Err(self.reject("pause"));
        }
        self.status = WorkOrderStatus::Paused;
        Ok(())
    }

    /// 恢復（paused → in_progress）
    pub fn resume(&mut self) -> Result<()> {
        if self.status != WorkOrderStatus::Paused {
            return Err(self.reject("resume"));
        }
        self.status = WorkOrderStatus::InProgress;
        Ok(())
    }

    /// 決定完工數量並檢查狀態，未指定時為工單數量
    pub fn completion_quantity(&self, completed_qty: Option<Decimal>) -> Result<Decimal> {
        if self.status != WorkOrderStatus::InProgress {
            return Err(self.reject("complete"));
        }
        let quantity = crate::quantity::positive(
            completed_qty.unwrap_or(self.work_quantity),
            "completed_qty",
        )?;
        if quantity > self.work_quantity {
            return Err(MfgError::validation(format!(
                "完工數量 {} 超過工單數量 {}",
                quantity, self.work_quantity
            )));
        }
        Ok(quantity)
    }

    /// 完工（in_progress → completed）
    pub fn finish(&mut self, completed_qty: Decimal, at: DateTime<Utc>) -> Result<()> {
        if self.status != WorkOrderStatus::InProgress {
            return Err(self.reject("complete"));
        }
        self.status = WorkOrderStatus::Completed;
        self.completed_quantity = Some(completed_qty);
        self.actual_end = Some(at);
        Ok(())
    }

    /// 取消（pending / in_progress → cancelled）
    ///
    /// 已扣料的檢查由呼叫端依庫存異動判斷。
    pub fn cancel(&mut self) -> Result<()> {
        match self.status {
            WorkOrderStatus::Pending | WorkOrderStatus::InProgress => {
                self.status = WorkOrderStatus::Cancelled;
                Ok(())
            }
            _ => Err(self.reject("cancel")),
        }
    }

    /// 指派負責人，終止狀態不可指派
    pub fn assign(&mut self, user: UserId) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.reject("assign"));
        }
        self.assigned_to = Some(user);
        Ok(())
    }

    /// 檢查是否可以刪除（生產中不可刪）
    pub fn ensure_deletable(&self) -> Result<()> {
        if self.status == WorkOrderStatus::InProgress {
            return Err(self.reject("delete"));
        }
        Ok(())
    }

    /// 是否計入明細的工單數量上限
    pub fn counts_toward_line(&self) -> bool {
        self.status != WorkOrderStatus::Cancelled
    }
}

/// 物料需求（工單建立時凍結）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    /// 工單
    pub work_order: WorkOrderId,

    /// 原物料
    pub material: MaterialId,

    /// 需求數量
    pub required_quantity: Decimal,

    /// 單位
    pub unit: String,
}
