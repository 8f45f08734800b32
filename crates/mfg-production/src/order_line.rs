//! 製造訂單明細

use chrono::{DateTime, Utc};
use mfg_bom::BomSource;
use mfg_core::{
    quantity, BomId, Catalog, ItemRef, ManufacturingOrderLine, MfgError, OrderLineId,
    OrderLineStatus, Priority, Result,
};
use mfg_store::{Tables, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 新明細
#[derive(Debug, Clone)]
pub struct OrderLineDraft {
    pub order_id: u64,
    pub item: ItemRef,
    pub required_qty: Decimal,
    pub bom_id: Option<BomId>,
    pub priority: Priority,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
}

impl OrderLineDraft {
    pub fn new(order_id: u64, item: ItemRef, required_qty: Decimal) -> Self {
        Self {
            order_id,
            item,
            required_qty,
            bom_id: None,
            priority: Priority::Normal,
            planned_start: None,
            planned_end: None,
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
}

/// 明細進度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineProgress {
    pub line: OrderLineId,
    pub status: OrderLineStatus,
    pub required_qty: Decimal,
    pub produced_qty: Decimal,
    pub remaining_qty: Decimal,

    /// 完成百分比
    pub percent: Decimal,

    /// 未取消工單的數量合計
    pub scheduled_qty: Decimal,
}

/// 明細服務
#[derive(Clone)]
pub struct OrderLineService {
    catalog: Arc<dyn Catalog>,
}

impl OrderLineService {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// 建立明細
    pub fn create_line(
        &self,
        tx: &mut Transaction<'_>,
        draft: OrderLineDraft,
    ) -> Result<ManufacturingOrderLine> {
        if !draft.item.is_buildable() {
            return Err(MfgError::validation(format!(
                "明細只能生產成品或半成品（收到 {}）",
                draft.item
            )));
        }
        self.catalog.require_item(draft.item)?;
        let required_qty = quantity::positive(draft.required_qty, "required_qty")?;

        if let Some(bom_id) = draft.bom_id {
            let bom = tx
                .bom(bom_id)
                .ok_or_else(|| MfgError::not_found("BOM", bom_id))?;
            if bom.item != draft.item {
                return Err(MfgError::validation(format!(
                    "BOM {} 屬於 {}，不是 {}",
                    bom_id, bom.item, draft.item
                )));
            }
        }

        if let (Some(start), Some(end)) = (draft.planned_start, draft.planned_end) {
            if start > end {
                return Err(MfgError::validation("計劃開始時間不可晚於計劃完成時間"));
            }
        }

        let mut line = ManufacturingOrderLine::new(
            tx.sequences.next_order_line(),
            draft.order_id,
            draft.item,
            required_qty,
        )
        .with_priority(draft.priority);
        line.bom_id = draft.bom_id;
        line.planned_start = draft.planned_start;
        line.planned_end = draft.planned_end;

        tx.order_lines.insert(line.id, line.clone());
        tracing::info!(
            "建立明細 {}: 訂單 {}，{} × {}",
            line.id,
            line.order_id,
            line.item,
            line.required_qty
        );
        Ok(line)
    }

    /// 查詢明細
    pub fn line(&self, tables: &Tables, id: OrderLineId) -> Result<ManufacturingOrderLine> {
        tables
            .order_lines
            .get(&id)
            .cloned()
            .ok_or_else(|| MfgError::not_found("明細", id))
    }

    /// 訂單的所有明細
    pub fn lines_for_order(&self, tables: &Tables, order_id: u64) -> Vec<ManufacturingOrderLine> {
        tables
            .order_lines
            .values()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect()
    }

    /// 首張工單開工時標記為生產中，回傳狀態是否有變更
    pub fn mark_started(&self, tx: &mut Transaction<'_>, id: OrderLineId) -> Result<bool> {
        let mut line = self.line(tx, id)?;
        let changed = line.mark_started();
        if changed {
            tx.order_lines.insert(id, line);
            tracing::info!("明細 {} 開始生產", id);
        }
        Ok(changed)
    }

    /// 記錄生產數量
    pub fn record_production(
        &self,
        tx: &mut Transaction<'_>,
        id: OrderLineId,
        qty: Decimal,
    ) -> Result<ManufacturingOrderLine> {
        let mut line = self.line(tx, id)?;
        line.apply_production(quantity::round(qty))?;
        tx.order_lines.insert(id, line.clone());

        if line.is_completed() {
            tracing::info!("明細 {} 已完成: {}/{}", id, line.produced_qty, line.required_qty);
        }
        Ok(line)
    }

    /// 未取消工單的數量合計
    pub fn scheduled_qty(&self, tables: &Tables, id: OrderLineId) -> Decimal {
        tables
            .work_orders
            .values()
            .filter(|wo| wo.order_line == id && wo.counts_toward_line())
            .map(|wo| wo.work_quantity)
            .sum()
    }

    /// 已承諾數量
    ///
    /// 取「未取消工單合計」與「已生產數量 + 未結案工單合計」的較大者。
    /// 已完工的工單被刪除後，其產量仍由明細的已生產數量計入。
    pub fn committed_qty(&self, tables: &Tables, line: &ManufacturingOrderLine) -> Result<Decimal> {
        let mut open = line.produced_qty;
        for work_order in tables
            .work_orders
            .values()
            .filter(|wo| wo.order_line == line.id && !wo.status.is_terminal())
        {
            open = quantity::checked_add(open, work_order.work_quantity)?;
        }
        Ok(open.max(self.scheduled_qty(tables, line.id)))
    }

    /// 明細進度
    pub fn progress(&self, tables: &Tables, id: OrderLineId) -> Result<LineProgress> {
        let line = self.line(tables, id)?;
        Ok(LineProgress {
            line: id,
            status: line.status,
            required_qty: line.required_qty,
            produced_qty: line.produced_qty,
            remaining_qty: line.remaining_qty(),
            percent: line.progress_percent(),
            scheduled_qty: self.scheduled_qty(tables, id),
        })
    }
}

impl std::fmt::Debug for OrderLineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLineService").finish_non_exhaustive()
    }
}
