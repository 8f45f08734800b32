//! 庫存帳
//!
//! 所有寫入操作都需要呼叫端提供的交易；扣帳前的可用量在同一筆交易內重新讀取，
//! 因此同一物料與倉庫的並行扣帳會被寫入鎖串行化。

use chrono::Utc;
use mfg_core::{
    quantity, Catalog, InventoryMovement, InventoryRecord, ItemRef, MfgError, Reference,
    ReferenceKind, Result, WarehouseId,
};
use mfg_store::{Tables, Transaction};
use rust_decimal::Decimal;
use std::sync::Arc;

/// 庫存帳
#[derive(Clone)]
pub struct Ledger {
    catalog: Arc<dyn Catalog>,
}

impl Ledger {
    /// 創建新的庫存帳
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn ensure_exists(&self, item: ItemRef, warehouse: WarehouseId) -> Result<()> {
        self.catalog.require_item(item)?;
        self.catalog.require_warehouse(warehouse)?;
        Ok(())
    }

    /// 現有庫存（無記錄時為 0）
    pub fn quantity(&self, tables: &Tables, item: ItemRef, warehouse: WarehouseId) -> Decimal {
        tables
            .inventory
            .get(&(item, warehouse))
            .map(|record| record.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// 入庫
    pub fn credit(
        &self,
        tx: &mut Transaction<'_>,
        item: ItemRef,
        warehouse: WarehouseId,
        qty: Decimal,
        reference: Reference,
    ) -> Result<InventoryMovement> {
        let qty = quantity::positive(qty, "quantity")?;
        self.ensure_exists(item, warehouse)?;

        add_stock(tx, item, warehouse, qty)?;
        let movement = InventoryMovement::import(item, warehouse, qty, reference);
        tx.movements.append(movement.clone());

        tracing::info!("入庫 {} @ {}: +{} ({})", item, warehouse, qty, movement.reference);
        Ok(movement)
    }

    /// 出庫
    ///
    /// 庫存不足時回傳 [`MfgError::InsufficientStock`]，不做任何異動。
    pub fn debit(
        &self,
        tx: &mut Transaction<'_>,
        item: ItemRef,
        warehouse: WarehouseId,
        qty: Decimal,
        reference: Reference,
    ) -> Result<InventoryMovement> {
        let qty = quantity::positive(qty, "quantity")?;
        self.ensure_exists(item, warehouse)?;

        remove_stock(tx, item, warehouse, qty)?;
        let movement = InventoryMovement::export(item, warehouse, qty, reference);
        tx.movements.append(movement.clone());

        tracing::info!("出庫 {} @ {}: -{} ({})", item, warehouse, qty, movement.reference);
        Ok(movement)
    }

    /// 調撥（出庫與入庫為同一個原子單位）
    pub fn transfer(
        &self,
        tx: &mut Transaction<'_>,
        item: ItemRef,
        from: WarehouseId,
        to: WarehouseId,
        qty: Decimal,
        reference: Reference,
    ) -> Result<InventoryMovement> {
        if from == to {
            return Err(MfgError::validation(format!(
                "調撥的來源與目的倉庫不可相同（倉庫 {}）",
                from
            )));
        }
        let qty = quantity::positive(qty, "quantity")?;
        self.ensure_exists(item, from)?;
        self.catalog.require_warehouse(to)?;

        let movement = tx.savepoint(|tx| {
            remove_stock(tx, item, from, qty)?;
            add_stock(tx, item, to, qty)?;
            let movement = InventoryMovement::transfer(item, from, to, qty, reference);
            tx.movements.append(movement.clone());
            Ok(movement)
        })?;

        tracing::info!("調撥 {}: {} → {}，數量 {}", item, from, to, qty);
        Ok(movement)
    }

    /// 批次出庫（全部成功或全部不做）
    pub fn debit_all(
        &self,
        tx: &mut Transaction<'_>,
        items: &[(ItemRef, Decimal)],
        warehouse: WarehouseId,
        reference: &Reference,
    ) -> Result<Vec<InventoryMovement>> {
        tx.savepoint(|tx| {
            items
                .iter()
                .map(|&(item, qty)| self.debit(tx, item, warehouse, qty, reference.clone()))
                .collect()
        })
    }

    /// 物料在各倉庫的庫存記錄
    pub fn records_for(&self, tables: &Tables, item: ItemRef) -> Vec<InventoryRecord> {
        tables
            .inventory
            .values()
            .filter(|record| record.item == item)
            .cloned()
            .collect()
    }

    /// 物料在所有倉庫的庫存合計（超出範圍時取最大值）
    pub fn total_on_hand(&self, tables: &Tables, item: ItemRef) -> Decimal {
        self.records_for(tables, item)
            .iter()
            .fold(Decimal::ZERO, |total, record| total.saturating_add(record.quantity))
    }

    /// 物料的異動紀錄（依發生順序）
    pub fn movements_for(&self, tables: &Tables, item: ItemRef) -> Vec<InventoryMovement> {
        tables
            .movements
            .iter()
            .filter(|m| m.item == item)
            .cloned()
            .collect()
    }

    /// 指向某張單據的異動紀錄
    pub fn movements_by_reference(
        &self,
        tables: &Tables,
        kind: ReferenceKind,
        id: u64,
    ) -> Vec<InventoryMovement> {
        tables
            .movements
            .iter()
            .filter(|m| m.reference.points_to(kind, id))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}

fn add_stock(
    tables: &mut Tables,
    item: ItemRef,
    warehouse: WarehouseId,
    qty: Decimal,
) -> Result<()> {
    let key = (item, warehouse);
    match tables.inventory.get(&key) {
        Some(record) => {
            let updated = quantity::checked_add(record.quantity, qty)?;
            if let Some(record) = tables.inventory.get_mut(&key) {
                record.quantity = updated;
                record.updated_at = Utc::now();
            }
        }
        None => {
            let mut record = InventoryRecord::empty(item, warehouse);
            record.quantity = qty;
            tables.inventory.insert(key, record);
        }
    }
    Ok(())
}

fn remove_stock(
    tables: &mut Tables,
    item: ItemRef,
    warehouse: WarehouseId,
    qty: Decimal,
) -> Result<()> {
    let key = (item, warehouse);
    let available = tables
        .inventory
        .get(&key)
        .map(|record| record.quantity)
        .unwrap_or(Decimal::ZERO);

    if available < qty {
        tracing::warn!(
            "庫存不足 {} @ {}：可用 {}，需求 {}",
            item,
            warehouse,
            available,
            qty
        );
        return Err(MfgError::InsufficientStock {
            item,
            warehouse,
            available,
            requested: qty,
        });
    }

    if let Some(record) = tables.inventory.get_mut(&key) {
        record.quantity -= qty;
        record.updated_at = Utc::now();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfg_core::{InMemoryCatalog, MovementKind, WorkOrderId};
    use mfg_store::Database;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::thread;

    const RAW: WarehouseId = WarehouseId(1);
    const PRODUCTION: WarehouseId = WarehouseId(2);

    fn m1() -> ItemRef {
        ItemRef::material(1)
    }

    fn ledger() -> Ledger {
        let catalog = InMemoryCatalog::new()
            .with_item(m1(), "M1", "鋼管", "kg")
            .with_item(ItemRef::material(2), "M2", "螺絲", "pcs")
            .with_warehouse(RAW, "1000", "原料倉")
            .with_warehouse(PRODUCTION, "2000", "生產倉");
        Ledger::new(Arc::new(catalog))
    }

    fn manual() -> Reference {
        Reference::new(ReferenceKind::Manual, 1)
    }

    fn seeded(ledger: &Ledger, qty: Decimal) -> Database {
        let db = Database::new();
        db.transaction(|tx| ledger.credit(tx, m1(), PRODUCTION, qty, manual()))
            .unwrap();
        db
    }

    #[test]
    fn test_credit_creates_record_and_movement() {
        let ledger = ledger();
        let db = seeded(&ledger, dec!(40));

        db.read(|t| {
            assert_eq!(ledger.quantity(t, m1(), PRODUCTION), dec!(40));
            assert_eq!(ledger.quantity(t, m1(), RAW), Decimal::ZERO);

            let movements = ledger.movements_for(t, m1());
            assert_eq!(movements.len(), 1);
            assert_eq!(movements[0].kind, MovementKind::Import);
            assert_eq!(movements[0].to_warehouse, Some(PRODUCTION));
        });
    }

    #[test]
    fn test_debit_insufficient_leaves_stock_unchanged() {
        let ledger = ledger();
        let db = seeded(&ledger, dec!(25));

        let err = db
            .transaction(|tx| {
                ledger.debit(tx, m1(), PRODUCTION, dec!(30), Reference::work_order(WorkOrderId(42)))
            })
            .unwrap_err();

        match err {
            MfgError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, dec!(25));
                assert_eq!(requested, dec!(30));
            }
            other => panic!("unexpected error: {other}"),
        }
        db.read(|t| {
            assert_eq!(ledger.quantity(t, m1(), PRODUCTION), dec!(25));
            assert_eq!(t.movements.len(), 1);
        });
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-5))]
    #[case(dec!(0.004))]
    fn test_non_positive_quantity_is_rejected(#[case] qty: Decimal) {
        let ledger = ledger();
        let db = Database::new();

        let result = db.transaction(|tx| ledger.credit(tx, m1(), PRODUCTION, qty, manual()));

        assert!(matches!(result, Err(MfgError::Validation(_))));
    }

    #[test]
    fn test_unknown_item_or_warehouse() {
        let ledger = ledger();
        let db = Database::new();

        let unknown_item = db.transaction(|tx| {
            ledger.credit(tx, ItemRef::material(99), PRODUCTION, dec!(1), manual())
        });
        let unknown_wh =
            db.transaction(|tx| ledger.credit(tx, m1(), WarehouseId(99), dec!(1), manual()));

        assert!(matches!(unknown_item, Err(MfgError::NotFound { .. })));
        assert!(matches!(unknown_wh, Err(MfgError::NotFound { .. })));
    }

    #[test]
    fn test_quantity_is_normalized() {
        let ledger = ledger();
        let db = seeded(&ledger, dec!(10.005));

        db.read(|t| assert_eq!(ledger.quantity(t, m1(), PRODUCTION), dec!(10.01)));
    }

    #[test]
    fn test_transfer_moves_stock_atomically() {
        let ledger = ledger();
        let db = seeded(&ledger, dec!(40));

        db.transaction(|tx| ledger.transfer(tx, m1(), PRODUCTION, RAW, dec!(15), manual()))
            .unwrap();
        let failed =
            db.transaction(|tx| ledger.transfer(tx, m1(), PRODUCTION, RAW, dec!(30), manual()));

        assert!(failed.unwrap_err().is_insufficient_stock());
        db.read(|t| {
            assert_eq!(ledger.quantity(t, m1(), PRODUCTION), dec!(25));
            assert_eq!(ledger.quantity(t, m1(), RAW), dec!(15));
            assert_eq!(ledger.total_on_hand(t, m1()), dec!(40));
            assert_eq!(ledger.records_for(t, m1()).len(), 2);

            let last = t.movements.last().unwrap();
            assert_eq!(last.kind, MovementKind::Transfer);
            assert_eq!(last.from_warehouse, Some(PRODUCTION));
            assert_eq!(last.to_warehouse, Some(RAW));
        });
    }

    #[test]
    fn test_transfer_to_same_warehouse_is_rejected() {
        let ledger = ledger();
        let db = seeded(&ledger, dec!(40));

        let result =
            db.transaction(|tx| ledger.transfer(tx, m1(), PRODUCTION, PRODUCTION, dec!(1), manual()));

        assert!(matches!(result, Err(MfgError::Validation(_))));
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let ledger = ledger();
        let db = seeded(&ledger, Decimal::MAX - Decimal::ONE);
        db.transaction(|tx| ledger.credit(tx, m1(), RAW, dec!(10), manual()))
            .unwrap();

        let credit = db.transaction(|tx| ledger.credit(tx, m1(), PRODUCTION, dec!(10), manual()));
        assert!(matches!(credit, Err(MfgError::Validation(_))));

        let transfer =
            db.transaction(|tx| ledger.transfer(tx, m1(), RAW, PRODUCTION, dec!(10), manual()));
        assert!(matches!(transfer, Err(MfgError::Validation(_))));

        db.read(|t| {
            assert_eq!(
                ledger.quantity(t, m1(), PRODUCTION),
                Decimal::MAX - Decimal::ONE
            );
            assert_eq!(ledger.quantity(t, m1(), RAW), dec!(10));
            assert_eq!(ledger.movements_for(t, m1()).len(), 2);
            assert_eq!(ledger.total_on_hand(t, m1()), Decimal::MAX);
        });
    }

    #[test]
    fn test_debit_all_is_all_or_nothing() {
        let ledger = ledger();
        let db = seeded(&ledger, dec!(40));
        let m2 = ItemRef::material(2);
        db.transaction(|tx| ledger.credit(tx, m2, PRODUCTION, dec!(3), manual()))
            .unwrap();

        let reference = Reference::work_order(WorkOrderId(7));
        let result = db.transaction(|tx| {
            ledger.debit_all(tx, &[(m1(), dec!(30)), (m2, dec!(5))], PRODUCTION, &reference)
        });

        assert!(result.unwrap_err().is_insufficient_stock());
        db.read(|t| {
            assert_eq!(ledger.quantity(t, m1(), PRODUCTION), dec!(40));
            assert_eq!(ledger.quantity(t, m2, PRODUCTION), dec!(3));
            assert!(ledger
                .movements_by_reference(t, ReferenceKind::WorkOrder, 7)
                .is_empty());
        });

        let movements = db
            .transaction(|tx| {
                ledger.debit_all(tx, &[(m1(), dec!(30)), (m2, dec!(3))], PRODUCTION, &reference)
            })
            .unwrap();
        assert_eq!(movements.len(), 2);
        db.read(|t| {
            assert_eq!(
                ledger
                    .movements_by_reference(t, ReferenceKind::WorkOrder, 7)
                    .len(),
                2
            );
        });
    }

    #[test]
    fn test_concurrent_debits_never_oversell() {
        let ledger = ledger();
        let db = Arc::new(seeded(&ledger, dec!(100)));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let db = Arc::clone(&db);
                let ledger = ledger.clone();
                thread::spawn(move || {
                    db.transaction(|tx| ledger.debit(tx, m1(), PRODUCTION, dec!(15), manual()))
                        .is_ok()
                })
            })
            .collect();

        let approved = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(approved, 6);
        db.read(|t| assert_eq!(ledger.quantity(t, m1(), PRODUCTION), dec!(10)));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Credit(u32),
        Debit(u32),
        Transfer(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..500).prop_map(Op::Credit),
            (1u32..500).prop_map(Op::Debit),
            (1u32..500).prop_map(Op::Transfer),
        ]
    }

    proptest! {
        #[test]
        fn prop_stock_never_negative_and_matches_movements(ops in prop::collection::vec(op(), 1..40)) {
            let ledger = ledger();
            let db = Database::new();

            for op in ops {
                let _ = db.transaction(|tx| match op {
                    Op::Credit(n) => ledger.credit(tx, m1(), PRODUCTION, Decimal::from(n), manual()),
                    Op::Debit(n) => ledger.debit(tx, m1(), PRODUCTION, Decimal::from(n), manual()),
                    Op::Transfer(n) => ledger.transfer(tx, m1(), PRODUCTION, RAW, Decimal::from(n), manual()),
                });
            }

            db.read(|t| {
                for warehouse in [RAW, PRODUCTION] {
                    let on_hand = ledger.quantity(t, m1(), warehouse);
                    let net: Decimal = t.movements.iter().map(|m| m.net_effect_on(warehouse)).sum();
                    prop_assert!(on_hand >= Decimal::ZERO);
                    prop_assert_eq!(on_hand, net);
                }
                Ok(())
            })?;
        }

        #[test]
        fn prop_transfers_conserve_total(amounts in prop::collection::vec(1u32..80, 1..20)) {
            let ledger = ledger();
            let db = seeded(&ledger, dec!(500));

            for (i, n) in amounts.into_iter().enumerate() {
                let (from, to) = if i % 2 == 0 { (PRODUCTION, RAW) } else { (RAW, PRODUCTION) };
                let _ = db.transaction(|tx| ledger.transfer(tx, m1(), from, to, Decimal::from(n), manual()));
            }

            let total = db.read(|t| ledger.total_on_hand(t, m1()));
            prop_assert_eq!(total, dec!(500));
        }
    }
}
