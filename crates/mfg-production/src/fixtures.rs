//! 測試用主檔與 BOM

use mfg_bom::BomAuthor;
use mfg_core::{
    BomComponent, Catalog, InMemoryCatalog, ItemRef, ProductionConfig, UserId, WarehouseId,
};
use mfg_store::Database;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const RAW: WarehouseId = WarehouseId(1);
pub const PRODUCTION: WarehouseId = WarehouseId(2);
pub const OUTPUT: WarehouseId = WarehouseId(3);

pub fn m1() -> ItemRef {
    ItemRef::material(1)
}

pub fn m2() -> ItemRef {
    ItemRef::material(2)
}

pub fn product() -> ItemRef {
    ItemRef::product(100)
}

pub fn catalog() -> Arc<dyn Catalog> {
    Arc::new(
        InMemoryCatalog::new()
            .with_item(m1(), "M1", "鋼管", "kg")
            .with_item(m2(), "M2", "螺絲", "pcs")
            .with_item(ItemRef::semi_product(10), "SP10", "車架", "pcs")
            .with_item(product(), "P100", "腳踏車", "pcs")
            .with_warehouse(RAW, "1000", "原料倉")
            .with_warehouse(PRODUCTION, "2000", "生產倉")
            .with_warehouse(OUTPUT, "3000", "成品倉")
            .with_user(UserId(1), "planner")
            .with_user(UserId(2), "operator"),
    )
}

pub fn config() -> ProductionConfig {
    ProductionConfig::new(PRODUCTION, OUTPUT)
}

/// P100 = 3 × M1 + 1 × SP10，SP10 = 2 × M2
///
/// 每生產 10 個 P100 需要 30 kg M1 與 20 個 M2。
pub fn database(catalog: &Arc<dyn Catalog>) -> Database {
    let db = Database::new();
    let author = BomAuthor::new(Arc::clone(catalog));
    let result = db.transaction(|tx| {
        author.create_bom(
            tx,
            ItemRef::semi_product(10),
            "v1",
            None,
            vec![BomComponent::new(m2(), dec!(2))],
        )?;
        author.create_bom(
            tx,
            product(),
            "v1",
            Some(UserId(1)),
            vec![
                BomComponent::new(m1(), dec!(3)),
                BomComponent::new(ItemRef::semi_product(10), dec!(1)),
            ],
        )
    });
    assert!(result.is_ok(), "fixture BOM: {:?}", result.err());
    db
}
