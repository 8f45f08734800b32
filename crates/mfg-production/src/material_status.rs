//! 工單物料狀態追蹤
//!
//! 物料狀態是依凍結的物料需求與生產倉庫存計算出的規劃視圖，
//! 分配與耗用只是規劃訊號，不會異動庫存。

use chrono::Utc;
use mfg_core::{
    ItemRef, MaterialId, MaterialRequirement, MaterialStatus, MfgError, ProductionConfig,
    ReadinessSummary, Result, WarehouseId, WorkOrderId,
};
use mfg_inventory::Ledger;
use mfg_store::{Tables, Transaction};
use rust_decimal::Decimal;

/// 物料狀態追蹤器
#[derive(Debug, Clone)]
pub struct MaterialStatusTracker {
    ledger: Ledger,
    warehouse: WarehouseId,
}

impl MaterialStatusTracker {
    /// 以生產倉的庫存計算可用量
    pub fn new(ledger: Ledger, config: &ProductionConfig) -> Self {
        Self {
            ledger,
            warehouse: config.production_warehouse,
        }
    }

    fn requirements(&self, tables: &Tables, work_order: WorkOrderId) -> Result<Vec<MaterialRequirement>> {
        if !tables.work_orders.contains_key(&work_order) {
            return Err(MfgError::not_found("工單", work_order));
        }
        Ok(tables
            .requirements
            .get(&work_order)
            .cloned()
            .unwrap_or_default())
    }

    fn available(&self, tables: &Tables, material: MaterialId) -> Decimal {
        self.ledger
            .quantity(tables, ItemRef::Material(material), self.warehouse)
    }

    fn evaluate(&self, tables: &Tables, requirement: &MaterialRequirement) -> MaterialStatus {
        MaterialStatus::evaluate(
            requirement.work_order,
            requirement.material,
            requirement.unit.clone(),
            requirement.required_quantity,
            self.available(tables, requirement.material),
            Utc::now(),
        )
    }

    /// 依物料需求重新產生所有狀態
    pub fn generate(
        &self,
        tx: &mut Transaction<'_>,
        work_order: WorkOrderId,
    ) -> Result<Vec<MaterialStatus>> {
        let requirements = self.requirements(tx, work_order)?;
        let statuses: Vec<MaterialStatus> = requirements
            .iter()
            .map(|requirement| self.evaluate(tx, requirement))
            .collect();

        tx.remove_statuses_for(work_order);
        for status in &statuses {
            tx.material_status
                .insert((work_order, status.material), status.clone());
        }

        tracing::info!("工單 {} 產生物料狀態 {} 筆", work_order, statuses.len());
        Ok(statuses)
    }

    /// 重新檢查庫存（已分配或已耗用的狀態不變）
    pub fn refresh(
        &self,
        tx: &mut Transaction<'_>,
        work_order: WorkOrderId,
    ) -> Result<Vec<MaterialStatus>> {
        let requirements = self.requirements(tx, work_order)?;
        if tx.statuses_for(work_order).is_empty() {
            return self.generate(tx, work_order);
        }

        let now = Utc::now();
        for requirement in &requirements {
            let available = self.available(tx, requirement.material);
            let key = (work_order, requirement.material);
            match tx.material_status.get_mut(&key) {
                Some(status) => {
                    if !status.recheck(requirement.required_quantity, available, now) {
                        tracing::debug!(
                            "物料 {} 狀態為 {}，略過重新檢查",
                            requirement.material,
                            status.status
                        );
                    }
                }
                None => {
                    let status = self.evaluate(tx, requirement);
                    tx.material_status.insert(key, status);
                }
            }
        }

        tracing::info!("工單 {} 物料狀態已重新檢查", work_order);
        Ok(tx.statuses_for(work_order))
    }

    /// 分配物料（全部成功或全部不做）
    pub fn allocate(
        &self,
        tx: &mut Transaction<'_>,
        work_order: WorkOrderId,
        allocations: &[(MaterialId, Decimal)],
    ) -> Result<Vec<MaterialStatus>> {
        self.update(tx, work_order, allocations, "allocate", |status, qty| {
            status.allocate(qty)
        })
    }

    /// 記錄耗用（累加，全部成功或全部不做）
    pub fn consume(
        &self,
        tx: &mut Transaction<'_>,
        work_order: WorkOrderId,
        consumptions: &[(MaterialId, Decimal)],
    ) -> Result<Vec<MaterialStatus>> {
        self.update(tx, work_order, consumptions, "consume", |status, qty| {
            status.consume(qty)
        })
    }

    fn update<F>(
        &self,
        tx: &mut Transaction<'_>,
        work_order: WorkOrderId,
        entries: &[(MaterialId, Decimal)],
        action: &str,
        apply: F,
    ) -> Result<Vec<MaterialStatus>>
    where
        F: Fn(&mut MaterialStatus, Decimal) -> Result<()>,
    {
        self.requirements(tx, work_order)?;
        if entries.is_empty() {
            return Err(MfgError::validation("未指定任何物料"));
        }

        tx.savepoint(|tx| {
            for &(material, qty) in entries {
                let status = tx
                    .material_status
                    .get_mut(&(work_order, material))
                    .ok_or_else(|| {
                        MfgError::not_found("物料狀態", format!("{}/{}", work_order, material))
                    })?;
                apply(status, qty)?;
            }
            Ok(())
        })?;

        tracing::info!("工單 {} 物料 {}: {} 筆", work_order, action, entries.len());
        Ok(tx.statuses_for(work_order))
    }

    /// 工單的物料狀態
    pub fn statuses(&self, tables: &Tables, work_order: WorkOrderId) -> Vec<MaterialStatus> {
        tables.statuses_for(work_order)
    }

    /// 備料摘要（尚未產生狀態時依當前庫存即時計算）
    pub fn readiness(&self, tables: &Tables, work_order: WorkOrderId) -> Result<ReadinessSummary> {
        let requirements = self.requirements(tables, work_order)?;
        let mut statuses = tables.statuses_for(work_order);
        if statuses.is_empty() {
            statuses = requirements
                .iter()
                .map(|requirement| self.evaluate(tables, requirement))
                .collect();
        }
        Ok(ReadinessSummary::from_statuses(work_order, &statuses))
    }
}
