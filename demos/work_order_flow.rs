//! # 腳踏車工單流程範例
//!
//! 這個範例展示從 BOM 到完工入庫的完整流程：
//! - 建立兩階 BOM（腳踏車 → 車架 → 螺絲）
//! - 原料入庫並調撥到生產倉
//! - 建立明細與工單、檢查備料
//! - 開工、完工扣料、成品入庫
//!
//! 以 `RUST_LOG=debug` 執行可看到展開與緩存的詳細日誌。

use anyhow::Result;
use mfg::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const RAW: WarehouseId = WarehouseId(1);
const PRODUCTION: WarehouseId = WarehouseId(2);
const OUTPUT: WarehouseId = WarehouseId(3);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🚲 ===== 腳踏車工單流程範例 =====");
    println!();

    let tube = ItemRef::material(1);
    let screw = ItemRef::material(2);
    let frame = ItemRef::semi_product(10);
    let bike = ItemRef::product(100);

    let catalog: Arc<dyn Catalog> = Arc::new(
        InMemoryCatalog::new()
            .with_item(tube, "M1", "鋼管", "kg")
            .with_item(screw, "M2", "螺絲", "pcs")
            .with_item(frame, "SP10", "車架", "pcs")
            .with_item(bike, "P100", "腳踏車", "pcs")
            .with_warehouse(RAW, "1000", "原料倉")
            .with_warehouse(PRODUCTION, "2000", "生產倉")
            .with_warehouse(OUTPUT, "3000", "成品倉")
            .with_user(UserId(1), "planner"),
    );
    let config = ProductionConfig::new(PRODUCTION, OUTPUT).with_status_on_create(true);
    let system = ManufacturingSystem::new(catalog, config);

    // ========== 1. 建立 BOM ==========
    println!("🔧 步驟 1: 建立 BOM 結構");
    system.create_bom(
        frame,
        "v1",
        Some(UserId(1)),
        vec![BomComponent::new(screw, dec!(2)).with_waste_percent(dec!(5))],
    )?;
    system.create_bom(
        bike,
        "v1",
        Some(UserId(1)),
        vec![
            BomComponent::new(tube, dec!(3)),
            BomComponent::new(frame, dec!(1)),
        ],
    )?;
    for line in system.explode_tree(bike, dec!(1))? {
        println!(
            "   {}└─ {} × {}（損耗 {}%）",
            "   ".repeat(line.level - 1),
            line.component,
            line.quantity_per_unit,
            line.waste_percent
        );
    }
    println!();

    // ========== 2. 展開原物料需求 ==========
    println!("📋 步驟 2: 展開 10 台腳踏車的原物料需求");
    for need in system.resolve_materials(bike, dec!(10))? {
        println!("   ✓ 物料 {}: {} {}", need.material, need.required_qty, need.unit);
    }
    println!();

    // ========== 3. 原料入庫與調撥 ==========
    println!("📦 步驟 3: 原料入庫並調撥到生產倉");
    let purchase = Reference::new(ReferenceKind::PurchaseOrder, 501);
    system.credit(tube, RAW, dec!(50), purchase.clone())?;
    system.credit(screw, RAW, dec!(30), purchase)?;
    let transfer = Reference::new(ReferenceKind::Manual, 1).with_note("備料調撥".to_string());
    system.transfer(tube, RAW, PRODUCTION, dec!(35), transfer.clone())?;
    system.transfer(screw, RAW, PRODUCTION, dec!(21), transfer)?;
    for item in [tube, screw] {
        println!(
            "   ✓ {}: 原料倉 {}，生產倉 {}",
            item,
            system.quantity(item, RAW),
            system.quantity(item, PRODUCTION)
        );
    }
    println!();

    // ========== 4. 建立明細與工單 ==========
    println!("📝 步驟 4: 建立明細與工單");
    let line = system.create_order_line(
        OrderLineDraft::new(1, bike, dec!(20)).with_priority(Priority::High),
    )?;
    let work_order = system.create_work_order(
        NewWorkOrder::new(line.id, dec!(10))
            .with_assignee(UserId(1))
            .with_notes("第一批"),
    )?;
    println!("   ✓ 明細 {}: 需求 {}", line.id, line.required_qty);
    println!("   ✓ 工單 {}: 數量 {}", work_order.code, work_order.work_quantity);

    let readiness = system.material_readiness(work_order.id)?;
    println!(
        "   備料: {}/{} 項足夠，缺料合計 {}",
        readiness.ready_materials, readiness.total_materials, readiness.total_shortage
    );
    println!();

    // ========== 5. 開工與完工 ==========
    println!("🏭 步驟 5: 開工與完工");
    system.start_work_order(work_order.id)?;
    let done = system.complete_work_order(work_order.id, None)?;
    println!("   ✓ 工單 {} 狀態: {}", done.code, done.status);

    let progress = system.line_progress(line.id)?;
    println!(
        "   ✓ 明細進度: {}/{}（{}%）",
        progress.produced_qty, progress.required_qty, progress.percent
    );
    println!("   ✓ 成品倉腳踏車: {}", system.quantity(bike, OUTPUT));
    println!();

    // ========== 6. 庫存不足的工單 ==========
    println!("⚠️  步驟 6: 第二張工單（生產倉庫存不足）");
    let second = system.create_work_order(NewWorkOrder::new(line.id, dec!(10)))?;
    system.start_work_order(second.id)?;
    match system.complete_work_order(second.id, None) {
        Ok(_) => println!("   意外完工"),
        Err(err) => println!("   ✗ {}", err),
    }
    println!(
        "   生產倉鋼管仍為 {}，工單狀態 {}",
        system.quantity(tube, PRODUCTION),
        system.work_order(second.id)?.status
    );
    println!();

    let stats = system.cache_stats();
    println!("📊 緩存: 命中 {}，未命中 {}，筆數 {}", stats.hits, stats.misses, stats.entries);
    println!();
    println!("✅ ===== 範例完成 =====");

    Ok(())
}
