//! # MFG
//!
//! 離散製造核心：多階 BOM、多倉庫存帳、工單生命週期
//!
//! [`ManufacturingSystem`] 的每個寫入操作都是一筆獨立交易，失敗時不留下任何異動。

pub use mfg_bom::{BomUpdate, ExplodedLine, MaterialNeed};
pub use mfg_cache::CacheStats;
pub use mfg_core::*;
pub use mfg_production::{LineProgress, NewWorkOrder, OrderLineDraft, ProductionReceipt};
pub use mfg_store::Database;

use mfg_bom::{BomAuthor, BomResolver, BomSource};
use mfg_cache::ResolutionCache;
use mfg_inventory::Ledger;
use mfg_production::{BomProduction, OrderLineService, WorkOrderService};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 製造系統
pub struct ManufacturingSystem {
    db: Database,
    catalog: Arc<dyn Catalog>,
    config: ProductionConfig,
    ledger: Ledger,
    boms: BomAuthor,
    production: BomProduction,
    lines: OrderLineService,
    work_orders: WorkOrderService,
    cache: Mutex<ResolutionCache>,
}

impl ManufacturingSystem {
    /// 以空的資料庫創建
    pub fn new(catalog: Arc<dyn Catalog>, config: ProductionConfig) -> Self {
        Self::with_database(Database::new(), catalog, config)
    }

    /// 使用既有資料庫創建
    pub fn with_database(db: Database, catalog: Arc<dyn Catalog>, config: ProductionConfig) -> Self {
        tracing::info!(
            "製造系統啟動：生產倉 {}，成品倉 {}，BOM 策略 {:?}",
            config.production_warehouse,
            config.output_warehouse,
            config.bom_policy
        );
        Self {
            ledger: Ledger::new(Arc::clone(&catalog)),
            boms: BomAuthor::new(Arc::clone(&catalog)),
            production: BomProduction::new(Arc::clone(&catalog)).with_policy(config.bom_policy),
            lines: OrderLineService::new(Arc::clone(&catalog)),
            work_orders: WorkOrderService::new(Arc::clone(&catalog), config.clone()),
            cache: Mutex::new(ResolutionCache::with_capacity(config.cache_capacity)),
            db,
            catalog,
            config,
        }
    }

    /// 從快照檔開啟
    pub fn open_snapshot(
        path: impl AsRef<Path>,
        catalog: Arc<dyn Catalog>,
        config: ProductionConfig,
    ) -> Result<Self> {
        Ok(Self::with_database(
            Database::open_snapshot(path)?,
            catalog,
            config,
        ))
    }

    /// 寫入快照檔
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        self.db.save_snapshot(path)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    fn cache(&self) -> MutexGuard<'_, ResolutionCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== BOM ==========

    /// 展開原物料需求（使用緩存）
    pub fn resolve_materials(&self, item: ItemRef, qty: Decimal) -> Result<Vec<MaterialNeed>> {
        let mut cache = self.cache();
        self.db.read(|tables| {
            let resolver = BomResolver::new(tables, self.catalog.as_ref())
                .with_policy(self.config.bom_policy);
            cache.resolve(&resolver, item, None, qty)
        })
    }

    /// 並行展開多個需求
    pub fn resolve_batch(&self, requests: &[(ItemRef, Decimal)]) -> Vec<Result<Vec<MaterialNeed>>> {
        self.db.read(|tables| {
            BomResolver::new(tables, self.catalog.as_ref())
                .with_policy(self.config.bom_policy)
                .resolve_batch(requests)
        })
    }

    /// 多階展開樹
    pub fn explode_tree(&self, item: ItemRef, qty: Decimal) -> Result<Vec<ExplodedLine>> {
        self.db.read(|tables| {
            BomResolver::new(tables, self.catalog.as_ref())
                .with_policy(self.config.bom_policy)
                .explode_tree(item, qty)
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    /// 建立 BOM
    pub fn create_bom(
        &self,
        item: ItemRef,
        version: &str,
        created_by: Option<UserId>,
        components: Vec<BomComponent>,
    ) -> Result<Bom> {
        let bom = self.db.transaction(|tx| {
            self.boms
                .create_bom(tx, item, version, created_by, components)
        })?;
        self.cache().invalidate(item);
        Ok(bom)
    }

    /// 替換 BOM
    pub fn replace_bom(
        &self,
        bom_id: BomId,
        update: BomUpdate,
        components: Vec<BomComponent>,
    ) -> Result<Bom> {
        let bom = self
            .db
            .transaction(|tx| self.boms.replace_bom(tx, bom_id, update, components))?;
        self.cache().invalidate(bom.item);
        Ok(bom)
    }

    /// 設置 BOM 啟用狀態
    pub fn set_bom_active(&self, bom_id: BomId, active: bool) -> Result<Bom> {
        let bom = self
            .db
            .transaction(|tx| self.boms.set_active(tx, bom_id, active))?;
        self.cache().invalidate(bom.item);
        Ok(bom)
    }

    /// 刪除 BOM
    pub fn delete_bom(&self, bom_id: BomId) -> Result<Bom> {
        let bom = self
            .db
            .transaction(|tx| self.boms.delete_bom(tx, bom_id))?;
        self.cache().invalidate(bom.item);
        Ok(bom)
    }

    /// 物料的所有 BOM 版本
    pub fn boms_for(&self, item: ItemRef) -> Vec<Bom> {
        self.db.read(|tables| tables.boms_for(item))
    }

    /// 依設定的策略取得當前 BOM
    pub fn current_bom(&self, item: ItemRef) -> Option<Bom> {
        self.db
            .read(|tables| tables.current_bom(item, self.config.bom_policy))
    }

    pub fn bom_components(&self, bom_id: BomId) -> Vec<BomComponent> {
        self.db.read(|tables| tables.components(bom_id))
    }

    // ========== 製造訂單明細 ==========

    /// 建立明細
    pub fn create_order_line(&self, draft: OrderLineDraft) -> Result<ManufacturingOrderLine> {
        self.db
            .transaction(|tx| self.lines.create_line(tx, draft))
    }

    pub fn order_line(&self, id: OrderLineId) -> Result<ManufacturingOrderLine> {
        self.db.read(|tables| self.lines.line(tables, id))
    }

    /// 明細進度
    pub fn line_progress(&self, id: OrderLineId) -> Result<LineProgress> {
        self.db.read(|tables| self.lines.progress(tables, id))
    }

    // ========== 工單 ==========

    /// 建立工單
    pub fn create_work_order(&self, request: NewWorkOrder) -> Result<WorkOrder> {
        self.db
            .transaction(|tx| self.work_orders.create(tx, request))
    }

    pub fn start_work_order(&self, id: WorkOrderId) -> Result<WorkOrder> {
        self.db.transaction(|tx| self.work_orders.start(tx, id))
    }

    pub fn pause_work_order(&self, id: WorkOrderId) -> Result<WorkOrder> {
        self.db.transaction(|tx| self.work_orders.pause(tx, id))
    }

    pub fn resume_work_order(&self, id: WorkOrderId) -> Result<WorkOrder> {
        self.db.transaction(|tx| self.work_orders.resume(tx, id))
    }

    pub fn assign_work_order(&self, id: WorkOrderId, user: UserId) -> Result<WorkOrder> {
        self.db
            .transaction(|tx| self.work_orders.assign(tx, id, user))
    }

    /// 完工（扣料、入庫、更新明細）
    pub fn complete_work_order(
        &self,
        id: WorkOrderId,
        completed_qty: Option<Decimal>,
    ) -> Result<WorkOrder> {
        self.db
            .transaction(|tx| self.work_orders.complete(tx, id, completed_qty))
    }

    pub fn cancel_work_order(&self, id: WorkOrderId) -> Result<WorkOrder> {
        self.db.transaction(|tx| self.work_orders.cancel(tx, id))
    }

    pub fn delete_work_order(&self, id: WorkOrderId) -> Result<WorkOrder> {
        self.db.transaction(|tx| self.work_orders.delete(tx, id))
    }

    pub fn work_order(&self, id: WorkOrderId) -> Result<WorkOrder> {
        self.db
            .read(|tables| self.work_orders.work_order(tables, id))
    }

    /// 工單的凍結物料需求
    pub fn work_order_requirements(&self, id: WorkOrderId) -> Vec<MaterialRequirement> {
        self.db
            .read(|tables| self.work_orders.requirements(tables, id))
    }

    // ========== 物料狀態 ==========

    pub fn generate_material_status(&self, id: WorkOrderId) -> Result<Vec<MaterialStatus>> {
        self.db
            .transaction(|tx| self.work_orders.tracker().generate(tx, id))
    }

    pub fn refresh_material_status(&self, id: WorkOrderId) -> Result<Vec<MaterialStatus>> {
        self.db
            .transaction(|tx| self.work_orders.tracker().refresh(tx, id))
    }

    pub fn allocate_materials(
        &self,
        id: WorkOrderId,
        allocations: &[(MaterialId, Decimal)],
    ) -> Result<Vec<MaterialStatus>> {
        self.db
            .transaction(|tx| self.work_orders.tracker().allocate(tx, id, allocations))
    }

    pub fn consume_materials(
        &self,
        id: WorkOrderId,
        consumptions: &[(MaterialId, Decimal)],
    ) -> Result<Vec<MaterialStatus>> {
        self.db
            .transaction(|tx| self.work_orders.tracker().consume(tx, id, consumptions))
    }

    pub fn material_status(&self, id: WorkOrderId) -> Vec<MaterialStatus> {
        self.db
            .read(|tables| self.work_orders.tracker().statuses(tables, id))
    }

    pub fn material_readiness(&self, id: WorkOrderId) -> Result<ReadinessSummary> {
        self.db
            .read(|tables| self.work_orders.tracker().readiness(tables, id))
    }

    // ========== 庫存 ==========

    pub fn quantity(&self, item: ItemRef, warehouse: WarehouseId) -> Decimal {
        self.db
            .read(|tables| self.ledger.quantity(tables, item, warehouse))
    }

    pub fn total_on_hand(&self, item: ItemRef) -> Decimal {
        self.db
            .read(|tables| self.ledger.total_on_hand(tables, item))
    }

    pub fn credit(
        &self,
        item: ItemRef,
        warehouse: WarehouseId,
        qty: Decimal,
        reference: Reference,
    ) -> Result<InventoryMovement> {
        self.db
            .transaction(|tx| self.ledger.credit(tx, item, warehouse, qty, reference))
    }

    pub fn debit(
        &self,
        item: ItemRef,
        warehouse: WarehouseId,
        qty: Decimal,
        reference: Reference,
    ) -> Result<InventoryMovement> {
        self.db
            .transaction(|tx| self.ledger.debit(tx, item, warehouse, qty, reference))
    }

    pub fn transfer(
        &self,
        item: ItemRef,
        from: WarehouseId,
        to: WarehouseId,
        qty: Decimal,
        reference: Reference,
    ) -> Result<InventoryMovement> {
        self.db
            .transaction(|tx| self.ledger.transfer(tx, item, from, to, qty, reference))
    }

    /// 批次出庫（全部成功或全部不做）
    pub fn debit_all(
        &self,
        items: &[(ItemRef, Decimal)],
        warehouse: WarehouseId,
        reference: Reference,
    ) -> Result<Vec<InventoryMovement>> {
        self.db
            .transaction(|tx| self.ledger.debit_all(tx, items, warehouse, &reference))
    }

    /// 依 BOM 直接生產
    ///
    /// 在同一倉庫扣除展開後的所有原物料並將產出品入庫；任一原物料不足時不留下任何異動。
    pub fn produce_from_bom(
        &self,
        bom_id: BomId,
        qty: Decimal,
        warehouse: WarehouseId,
        reference: Reference,
    ) -> Result<ProductionReceipt> {
        self.db
            .transaction(|tx| self.production.produce(tx, bom_id, qty, warehouse, reference))
    }

    pub fn movements_for(&self, item: ItemRef) -> Vec<InventoryMovement> {
        self.db
            .read(|tables| self.ledger.movements_for(tables, item))
    }

    pub fn movements_by_reference(&self, kind: ReferenceKind, id: u64) -> Vec<InventoryMovement> {
        self.db
            .read(|tables| self.ledger.movements_by_reference(tables, kind, id))
    }
}

impl std::fmt::Debug for ManufacturingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManufacturingSystem")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
