//! BOM 維護
//!
//! 所有寫入都在呼叫端的交易內進行，並遞增該物料的 BOM 版次。

use mfg_core::{Bom, BomComponent, BomId, Catalog, ItemRef, MfgError, Result, UserId};
use mfg_store::{Tables, Transaction};
use std::sync::Arc;

use crate::source::BomSource;

/// BOM 表頭更新
#[derive(Debug, Clone, Default)]
pub struct BomUpdate {
    pub version: Option<String>,
    pub note: Option<String>,
    pub is_active: Option<bool>,
}

impl BomUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置版本
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// 建構器模式：設置備註
    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    /// 建構器模式：設置啟用狀態
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }
}

/// BOM 維護
#[derive(Clone)]
pub struct BomAuthor {
    catalog: Arc<dyn Catalog>,
}

impl BomAuthor {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn validate(&self, item: ItemRef, components: &[BomComponent]) -> Result<()> {
        if !item.is_buildable() {
            return Err(MfgError::validation(format!(
                "只有成品或半成品可以建立 BOM（收到 {}）",
                item
            )));
        }
        self.catalog.require_item(item)?;

        for component in components {
            component.validate()?;
            if component.component == item {
                return Err(MfgError::validation(format!(
                    "BOM 子件不可引用自身（{}）",
                    item
                )));
            }
            self.catalog.require_item(component.component)?;
        }
        Ok(())
    }

    /// 建立 BOM
    pub fn create_bom(
        &self,
        tx: &mut Transaction<'_>,
        item: ItemRef,
        version: &str,
        created_by: Option<UserId>,
        components: Vec<BomComponent>,
    ) -> Result<Bom> {
        self.validate(item, &components)?;
        if let Some(user) = created_by {
            self.catalog.require_user(user)?;
        }

        let id = tx.sequences.next_bom();
        let mut bom = Bom::new(id, item, version.to_string());
        bom.created_by = created_by;

        tx.boms.insert(id, bom.clone());
        tx.bom_components.insert(id, components);
        bump_revision(tx, item);

        tracing::info!("建立 BOM {}: {} 版本 {}", id, item, version);
        Ok(bom)
    }

    /// 替換 BOM（表頭更新，子件整批重建）
    pub fn replace_bom(
        &self,
        tx: &mut Transaction<'_>,
        bom_id: BomId,
        update: BomUpdate,
        components: Vec<BomComponent>,
    ) -> Result<Bom> {
        let mut bom = require_bom(tx, bom_id)?;
        self.validate(bom.item, &components)?;

        if let Some(version) = update.version {
            bom.version = version;
        }
        if let Some(note) = update.note {
            bom.note = Some(note);
        }
        if let Some(active) = update.is_active {
            bom.is_active = active;
        }

        tx.bom_components.remove(&bom_id);
        tx.bom_components.insert(bom_id, components);
        tx.boms.insert(bom_id, bom.clone());
        bump_revision(tx, bom.item);

        tracing::info!("替換 BOM {}: {}", bom_id, bom.item);
        Ok(bom)
    }

    /// 設置啟用狀態
    pub fn set_active(&self, tx: &mut Transaction<'_>, bom_id: BomId, active: bool) -> Result<Bom> {
        let mut bom = require_bom(tx, bom_id)?;
        bom.is_active = active;
        tx.boms.insert(bom_id, bom.clone());
        bump_revision(tx, bom.item);

        tracing::info!("BOM {} 啟用狀態: {}", bom_id, active);
        Ok(bom)
    }

    /// 刪除 BOM
    pub fn delete_bom(&self, tx: &mut Transaction<'_>, bom_id: BomId) -> Result<Bom> {
        let bom = require_bom(tx, bom_id)?;
        tx.boms.remove(&bom_id);
        tx.bom_components.remove(&bom_id);
        bump_revision(tx, bom.item);

        tracing::info!("刪除 BOM {}: {}", bom_id, bom.item);
        Ok(bom)
    }
}

impl std::fmt::Debug for BomAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BomAuthor").finish_non_exhaustive()
    }
}

fn require_bom(tables: &Tables, bom_id: BomId) -> Result<Bom> {
    tables
        .bom(bom_id)
        .ok_or_else(|| MfgError::not_found("BOM", bom_id))
}

fn bump_revision(tables: &mut Tables, item: ItemRef) {
    let next = tables.revision(item) + 1;
    tables.bom_revisions.insert(item, next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::catalog;
    use crate::BomResolver;
    use mfg_store::Database;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn author() -> BomAuthor {
        BomAuthor::new(Arc::new(catalog().with_user(UserId(1), "engineer")))
    }

    fn frame_components() -> Vec<BomComponent> {
        vec![BomComponent::new(ItemRef::material(1), dec!(5)).with_waste_percent(dec!(10))]
    }

    #[test]
    fn test_create_bom_bumps_revision() {
        let db = Database::new();
        let author = author();

        let bom = db
            .transaction(|tx| {
                author.create_bom(
                    tx,
                    ItemRef::semi_product(10),
                    "v1",
                    Some(UserId(1)),
                    frame_components(),
                )
            })
            .unwrap();

        db.read(|t| {
            assert_eq!(t.revision(ItemRef::semi_product(10)), 1);
            assert_eq!(t.components(bom.id).len(), 1);
            assert_eq!(t.boms_for(ItemRef::semi_product(10)).len(), 1);
        });
        assert_eq!(bom.created_by, Some(UserId(1)));
    }

    #[rstest]
    #[case(ItemRef::material(1), frame_components())]
    #[case(ItemRef::semi_product(10), vec![BomComponent::new(ItemRef::product(100), dec!(1))])]
    #[case(ItemRef::semi_product(10), vec![BomComponent::new(ItemRef::material(1), dec!(0))])]
    #[case(ItemRef::semi_product(10), vec![BomComponent::new(ItemRef::material(1), dec!(1)).with_waste_percent(dec!(-1))])]
    #[case(ItemRef::semi_product(10), vec![BomComponent::new(ItemRef::semi_product(10), dec!(1))])]
    fn test_invalid_bom_is_rejected(#[case] item: ItemRef, #[case] components: Vec<BomComponent>) {
        let db = Database::new();
        let author = author();

        let result = db.transaction(|tx| author.create_bom(tx, item, "v1", None, components));

        assert!(matches!(result, Err(MfgError::Validation(_))));
        db.read(|t| assert!(t.boms.is_empty()));
    }

    #[test]
    fn test_replace_bom_rebuilds_components() {
        let db = Database::new();
        let author = author();
        let catalog = catalog();
        let bom = db
            .transaction(|tx| {
                author.create_bom(tx, ItemRef::product(100), "v1", None, frame_components())
            })
            .unwrap();

        let replaced = db
            .transaction(|tx| {
                author.replace_bom(
                    tx,
                    bom.id,
                    BomUpdate::new().with_version("v2").with_note("改用塗料"),
                    vec![BomComponent::new(ItemRef::material(3), dec!(2))],
                )
            })
            .unwrap();

        assert_eq!(replaced.version, "v2");
        db.read(|t| {
            assert_eq!(t.revision(ItemRef::product(100)), 2);
            let needs = BomResolver::new(t, &catalog)
                .resolve(ItemRef::product(100), dec!(1))
                .unwrap();
            assert_eq!(needs.len(), 1);
            assert_eq!(needs[0].material.0, 3);
        });
    }

    #[test]
    fn test_failed_replace_keeps_old_components() {
        let db = Database::new();
        let author = author();
        let bom = db
            .transaction(|tx| {
                author.create_bom(tx, ItemRef::product(100), "v1", None, frame_components())
            })
            .unwrap();

        let result = db.transaction(|tx| {
            author.replace_bom(
                tx,
                bom.id,
                BomUpdate::new(),
                vec![BomComponent::new(ItemRef::material(99), dec!(1))],
            )
        });

        assert!(matches!(result, Err(MfgError::NotFound { .. })));
        db.read(|t| {
            assert_eq!(t.components(bom.id), frame_components());
            assert_eq!(t.revision(ItemRef::product(100)), 1);
        });
    }

    #[test]
    fn test_set_active_and_delete() {
        let db = Database::new();
        let author = author();
        let item = ItemRef::semi_product(10);
        let bom = db
            .transaction(|tx| author.create_bom(tx, item, "v1", None, frame_components()))
            .unwrap();

        db.transaction(|tx| author.set_active(tx, bom.id, false))
            .unwrap();
        db.read(|t| {
            assert!(t
                .current_bom(item, mfg_core::BomSelectionPolicy::LatestActive)
                .is_none());
            assert!(t
                .current_bom(item, mfg_core::BomSelectionPolicy::LatestCreated)
                .is_some());
        });

        db.transaction(|tx| author.delete_bom(tx, bom.id)).unwrap();
        db.read(|t| {
            assert!(t.bom(bom.id).is_none());
            assert!(t.components(bom.id).is_empty());
            assert_eq!(t.revision(item), 3);
        });

        let missing = db.transaction(|tx| author.delete_bom(tx, bom.id));
        assert!(matches!(missing, Err(MfgError::NotFound { .. })));
    }
}
