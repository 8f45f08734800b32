//! 依 BOM 直接生產
//!
//! 不經工單：展開指定 BOM、從同一倉庫扣除所有原物料、產出品入庫，
//! 全部在同一個儲存點內完成。

use mfg_bom::{BomResolver, BomSource};
use mfg_core::{
    quantity, BomId, BomSelectionPolicy, Catalog, InventoryMovement, ItemRef, MfgError, Reference, Result,
    WarehouseId,
};
use mfg_inventory::Ledger;
use mfg_store::{Tables, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 直接生產結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionReceipt {
    pub bom_id: BomId,
    pub item: ItemRef,
    pub quantity: Decimal,

    /// 原物料出庫
    pub consumed: Vec<InventoryMovement>,

    /// 產出品入庫
    pub produced: InventoryMovement,
}

/// 依 BOM 直接生產
#[derive(Clone)]
pub struct BomProduction {
    catalog: Arc<dyn Catalog>,
    ledger: Ledger,
    policy: BomSelectionPolicy,
}

impl BomProduction {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            ledger: Ledger::new(Arc::clone(&catalog)),
            catalog,
            policy: BomSelectionPolicy::default(),
        }
    }

    /// 設置半成品的 BOM 選擇策略
    pub fn with_policy(mut self, policy: BomSelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 生產
    ///
    /// 任一原物料不足時回傳 [`MfgError::InsufficientStock`]，庫存不變。
    pub fn produce(
        &self,
        tx: &mut Transaction<'_>,
        bom_id: BomId,
        qty: Decimal,
        warehouse: WarehouseId,
        reference: Reference,
    ) -> Result<ProductionReceipt> {
        let qty = quantity::positive(qty, "quantity")?;
        self.catalog.require_warehouse(warehouse)?;

        let bom = tx
            .bom(bom_id)
            .ok_or_else(|| MfgError::not_found("BOM", bom_id))?;
        let needs = {
            let tables: &Tables = tx;
            BomResolver::new(tables, self.catalog.as_ref())
                .with_policy(self.policy)
                .resolve_with_bom(bom.item, Some(bom_id), qty)?
        };
        let inputs: Vec<(ItemRef, Decimal)> = needs
            .iter()
            .map(|need| (ItemRef::Material(need.material), need.required_qty))
            .collect();

        let receipt = tx.savepoint(|tx| {
            let consumed = self
                .ledger
                .debit_all(tx, &inputs, warehouse, &reference)?;
            let produced = self.ledger.credit(
                tx,
                bom.item,
                warehouse,
                qty,
                reference.clone().with_note(format!("BOM {} 生產入庫", bom_id)),
            )?;
            Ok(ProductionReceipt {
                bom_id,
                item: bom.item,
                quantity: qty,
                consumed,
                produced,
            })
        });

        match &receipt {
            Ok(receipt) => tracing::info!(
                "BOM {} 直接生產 {} × {}，扣料 {} 項",
                bom_id,
                receipt.item,
                qty,
                receipt.consumed.len()
            ),
            Err(err) => tracing::warn!("BOM {} 直接生產失敗: {}", bom_id, err),
        }
        receipt
    }
}

impl std::fmt::Debug for BomProduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BomProduction").finish_non_exhaustive()
    }
}
