//! 工單狀態機
//!
//! 建立工單時凍結物料需求；完工時在同一筆交易內扣料、入庫、更新明細與工單，
//! 任一步驟失敗則全部回復。

use chrono::{DateTime, Utc};
use mfg_bom::BomResolver;
use mfg_core::{
    quantity, Catalog, ItemRef, MaterialRequirement, MfgError, OrderLineId, Priority,
    ProductionConfig, Reference, ReferenceKind, Result, UserId, WorkOrder, WorkOrderId,
};
use mfg_inventory::Ledger;
use mfg_store::{Tables, Transaction};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::material_status::MaterialStatusTracker;
use crate::order_line::OrderLineService;

/// 新工單
#[derive(Debug, Clone)]
pub struct NewWorkOrder {
    pub order_line: OrderLineId,
    pub work_quantity: Decimal,
    pub assignee: Option<UserId>,

    /// 未指定時沿用明細的優先級
    pub priority: Option<Priority>,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewWorkOrder {
    pub fn new(order_line: OrderLineId, work_quantity: Decimal) -> Self {
        Self {
            order_line,
            work_quantity,
            assignee: None,
            priority: None,
            planned_start: None,
            planned_end: None,
            notes: None,
        }
    }

    /// 建構器模式：設置負責人
    pub fn with_assignee(mut self, user: UserId) -> Self {
        self.assignee = Some(user);
        self
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// 建構器模式：設置計劃期間
    pub fn with_planned_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }

    /// 建構器模式：設置備註
    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }
}

/// 工單服務
#[derive(Clone)]
pub struct WorkOrderService {
    catalog: Arc<dyn Catalog>,
    config: ProductionConfig,
    ledger: Ledger,
    lines: OrderLineService,
    tracker: MaterialStatusTracker,
}

impl WorkOrderService {
    /// 創建新的工單服務
    pub fn new(catalog: Arc<dyn Catalog>, config: ProductionConfig) -> Self {
        let ledger = Ledger::new(Arc::clone(&catalog));
        Self {
            lines: OrderLineService::new(Arc::clone(&catalog)),
            tracker: MaterialStatusTracker::new(ledger.clone(), &config),
            ledger,
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    pub fn tracker(&self) -> &MaterialStatusTracker {
        &self.tracker
    }

    /// 查詢工單
    pub fn work_order(&self, tables: &Tables, id: WorkOrderId) -> Result<WorkOrder> {
        tables
            .work_orders
            .get(&id)
            .cloned()
            .ok_or_else(|| MfgError::not_found("工單", id))
    }

    /// 工單的物料需求
    pub fn requirements(&self, tables: &Tables, id: WorkOrderId) -> Vec<MaterialRequirement> {
        tables.requirements.get(&id).cloned().unwrap_or_default()
    }

    /// 明細的所有工單
    pub fn work_orders_for_line(&self, tables: &Tables, line: OrderLineId) -> Vec<WorkOrder> {
        tables
            .work_orders
            .values()
            .filter(|wo| wo.order_line == line)
            .cloned()
            .collect()
    }

    /// 建立工單
    pub fn create(&self, tx: &mut Transaction<'_>, request: NewWorkOrder) -> Result<WorkOrder> {
        let line = self.lines.line(tx, request.order_line)?;
        let work_quantity = quantity::positive(request.work_quantity, "work_quantity")?;

        let committed = self.lines.committed_qty(tx, &line)?;
        if quantity::checked_add(committed, work_quantity)? > line.required_qty {
            tracing::warn!(
                "明細 {} 工單數量超過需求：已排 {} + {} > {}",
                line.id,
                committed,
                work_quantity,
                line.required_qty
            );
            return Err(MfgError::validation(format!(
                "明細 {} 的工單數量合計 {} + {} 超過需求數量 {}",
                line.id, committed, work_quantity, line.required_qty
            )));
        }

        if let Some(user) = request.assignee {
            self.catalog.require_user(user)?;
        }
        if let (Some(start), Some(end)) = (request.planned_start, request.planned_end) {
            if start > end {
                return Err(MfgError::validation("計劃開始時間不可晚於計劃完成時間"));
            }
        }

        let needs = {
            let tables: &Tables = tx;
            BomResolver::new(tables, self.catalog.as_ref())
                .with_policy(self.config.bom_policy)
                .resolve_with_bom(line.item, line.bom_id, work_quantity)?
        };

        let id = tx.sequences.next_work_order();
        let mut work_order = WorkOrder::new(id, line.id, work_quantity)
            .with_priority(request.priority.unwrap_or(line.priority));
        work_order.assigned_to = request.assignee;
        work_order.planned_start = request.planned_start;
        work_order.planned_end = request.planned_end;
        work_order.notes = request.notes;

        let requirements: Vec<MaterialRequirement> = needs
            .into_iter()
            .map(|need| MaterialRequirement {
                work_order: id,
                material: need.material,
                required_quantity: need.required_qty,
                unit: need.unit,
            })
            .collect();

        tx.work_orders.insert(id, work_order.clone());
        tx.requirements.insert(id, requirements.clone());

        tracing::info!(
            "建立工單 {}: 明細 {}，數量 {}，物料需求 {} 項",
            work_order.code,
            line.id,
            work_quantity,
            requirements.len()
        );

        if self.config.generate_status_on_create {
            self.tracker.generate(tx, id)?;
        }
        Ok(work_order)
    }

    fn transition<F>(
        &self,
        tx: &mut Transaction<'_>,
        id: WorkOrderId,
        label: &str,
        apply: F,
    ) -> Result<WorkOrder>
    where
        F: FnOnce(&mut WorkOrder) -> Result<()>,
    {
        let mut work_order = self.work_order(tx, id)?;
        if let Err(err) = apply(&mut work_order) {
            tracing::warn!("工單 {} 無法{}: {}", work_order.code, label, err);
            return Err(err);
        }
        tx.work_orders.insert(id, work_order.clone());
        tracing::info!("工單 {} {} → {}", work_order.code, label, work_order.status);
        Ok(work_order)
    }

    /// 開工（明細同時轉為生產中）
    pub fn start(&self, tx: &mut Transaction<'_>, id: WorkOrderId) -> Result<WorkOrder> {
        let work_order = self.transition(tx, id, "開工", |wo| wo.start(Utc::now()))?;
        self.lines.mark_started(tx, work_order.order_line)?;
        Ok(work_order)
    }

    /// 暫停
    pub fn pause(&self, tx: &mut Transaction<'_>, id: WorkOrderId) -> Result<WorkOrder> {
        self.transition(tx, id, "暫停", |wo| wo.pause())
    }

    /// 恢復
    pub fn resume(&self, tx: &mut Transaction<'_>, id: WorkOrderId) -> Result<WorkOrder> {
        self.transition(tx, id, "恢復", |wo| wo.resume())
    }

    /// 指派負責人
    pub fn assign(
        &self,
        tx: &mut Transaction<'_>,
        id: WorkOrderId,
        user: UserId,
    ) -> Result<WorkOrder> {
        self.catalog.require_user(user)?;
        self.transition(tx, id, "指派", |wo| wo.assign(user))
    }

    /// 完工
    ///
    /// 從生產倉扣除所有物料需求、成品入庫、累加明細已生產數量。
    /// 未指定完工數量時為工單數量。
    pub fn complete(
        &self,
        tx: &mut Transaction<'_>,
        id: WorkOrderId,
        completed_qty: Option<Decimal>,
    ) -> Result<WorkOrder> {
        let mut work_order = self.work_order(tx, id)?;
        let completed_qty = work_order.completion_quantity(completed_qty.map(quantity::round))?;
        let line = self.lines.line(tx, work_order.order_line)?;

        let reference = Reference::work_order(id).with_note(format!("生產工單 {}", work_order.code));
        let inputs: Vec<(ItemRef, Decimal)> = self
            .requirements(tx, id)
            .iter()
            .map(|r| (ItemRef::Material(r.material), r.required_quantity))
            .collect();

        if let Err(err) =
            self.ledger
                .debit_all(tx, &inputs, self.config.production_warehouse, &reference)
        {
            tracing::warn!("工單 {} 完工失敗: {}", work_order.code, err);
            return Err(err);
        }
        self.ledger.credit(
            tx,
            line.item,
            self.config.output_warehouse,
            completed_qty,
            reference.with_note(format!("完工入庫 {}", work_order.code)),
        )?;
        self.lines.record_production(tx, line.id, completed_qty)?;

        work_order.finish(completed_qty, Utc::now())?;
        tx.work_orders.insert(id, work_order.clone());

        tracing::info!(
            "工單 {} 完工: 數量 {}，扣料 {} 項",
            work_order.code,
            completed_qty,
            inputs.len()
        );
        Ok(work_order)
    }

    /// 取消（已扣料的工單不可取消）
    pub fn cancel(&self, tx: &mut Transaction<'_>, id: WorkOrderId) -> Result<WorkOrder> {
        let work_order = self.work_order(tx, id)?;
        let consumed = self
            .ledger
            .movements_by_reference(tx, ReferenceKind::WorkOrder, id.value())
            .iter()
            .any(|m| m.removes_stock());
        if consumed {
            tracing::warn!("工單 {} 已有扣料紀錄，不可取消", work_order.code);
            return Err(MfgError::invalid_state(
                "工單",
                id,
                work_order.status,
                "cancel",
            ));
        }

        self.transition(tx, id, "取消", |wo| wo.cancel())
    }

    /// 刪除工單及其物料需求與狀態（庫存異動保留）
    pub fn delete(&self, tx: &mut Transaction<'_>, id: WorkOrderId) -> Result<WorkOrder> {
        let work_order = self.work_order(tx, id)?;
        work_order.ensure_deletable()?;

        tx.work_orders.remove(&id);
        tx.requirements.remove(&id);
        let statuses = tx.remove_statuses_for(id);

        tracing::info!("刪除工單 {}（物料狀態 {} 筆）", work_order.code, statuses);
        Ok(work_order)
    }

    /// 工單是否尚未結案
    pub fn is_open(&self, tables: &Tables, id: WorkOrderId) -> Result<bool> {
        Ok(!self.work_order(tables, id)?.status.is_terminal())
    }
}

impl std::fmt::Debug for WorkOrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkOrderService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
