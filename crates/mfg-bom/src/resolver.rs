//! BOM 展開
//!
//! 深度優先展開多階 BOM，把所有原物料需求依原物料ID彙總。
//! 每一層的需求量 = 父件數量 × 單位用量 × (1 + 損耗率 / 100)，
//! 遞迴過程保持精確小數，只在輸出彙總值時進位到兩位小數。

use mfg_core::{
    quantity, Bom, BomId, BomSelectionPolicy, Catalog, ItemRef, MaterialId, MfgError, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::source::BomSource;

/// 原物料需求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialNeed {
    /// 原物料
    pub material: MaterialId,

    /// 需求數量（兩位小數）
    pub required_qty: Decimal,

    /// 單位
    pub unit: String,
}

/// 展開樹的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplodedLine {
    /// 階層（根的子件為 1）
    pub level: usize,

    /// 父件
    pub parent: ItemRef,

    /// 父件使用的 BOM
    pub bom_id: BomId,

    /// 子件
    pub component: ItemRef,

    pub quantity_per_unit: Decimal,

    pub waste_percent: Decimal,

    /// 展開後的需求量（未進位）
    pub extended_qty: Decimal,
}

/// 展開結果與相依物料
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// 原物料需求（依原物料ID排序）
    pub needs: Vec<MaterialNeed>,

    /// 展開時走訪的成品與半成品（含根）
    pub dependencies: BTreeSet<ItemRef>,
}

#[derive(Default)]
struct Walk {
    totals: BTreeMap<MaterialId, Decimal>,
    lines: Vec<ExplodedLine>,
    dependencies: BTreeSet<ItemRef>,
}

/// BOM 展開器
pub struct BomResolver<'a, S: ?Sized> {
    source: &'a S,
    catalog: &'a dyn Catalog,
    policy: BomSelectionPolicy,
}

impl<'a, S: BomSource + ?Sized> BomResolver<'a, S> {
    /// 創建新的展開器（預設選擇最新建立的 BOM）
    pub fn new(source: &'a S, catalog: &'a dyn Catalog) -> Self {
        Self {
            source,
            catalog,
            policy: BomSelectionPolicy::default(),
        }
    }

    /// 建構器模式：設置 BOM 選擇策略
    pub fn with_policy(mut self, policy: BomSelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> BomSelectionPolicy {
        self.policy
    }

    /// BOM 資料來源
    pub fn source(&self) -> &'a S {
        self.source
    }

    /// 展開為原物料需求
    pub fn resolve(&self, root: ItemRef, qty: Decimal) -> Result<Vec<MaterialNeed>> {
        Ok(self.resolve_traced(root, None, qty)?.needs)
    }

    /// 展開為原物料需求，根可指定 BOM
    pub fn resolve_with_bom(
        &self,
        root: ItemRef,
        bom_id: Option<BomId>,
        qty: Decimal,
    ) -> Result<Vec<MaterialNeed>> {
        Ok(self.resolve_traced(root, bom_id, qty)?.needs)
    }

    /// 展開並回傳走訪過的物料
    pub fn resolve_traced(
        &self,
        root: ItemRef,
        bom_id: Option<BomId>,
        qty: Decimal,
    ) -> Result<Resolution> {
        tracing::debug!("展開 BOM: {} × {}", root, qty);

        let walk = self.explode(root, bom_id, qty)?;
        let needs = walk
            .totals
            .into_iter()
            .map(|(material, total)| {
                let info = self.catalog.require_item(ItemRef::Material(material))?;
                Ok(MaterialNeed {
                    material,
                    required_qty: quantity::round(total),
                    unit: info.unit,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("{} 展開完成：{} 項原物料", root, needs.len());
        Ok(Resolution {
            needs,
            dependencies: walk.dependencies,
        })
    }

    /// 多階展開樹（深度優先順序）
    pub fn explode_tree(&self, root: ItemRef, qty: Decimal) -> Result<Vec<ExplodedLine>> {
        Ok(self.explode(root, None, qty)?.lines)
    }

    /// 展開時會走訪的成品與半成品
    pub fn dependencies(&self, root: ItemRef) -> Result<BTreeSet<ItemRef>> {
        Ok(self.explode(root, None, Decimal::ONE)?.dependencies)
    }

    fn explode(&self, root: ItemRef, bom_id: Option<BomId>, qty: Decimal) -> Result<Walk> {
        if !root.is_buildable() {
            return Err(MfgError::validation(format!(
                "只有成品或半成品可以展開 BOM（收到 {}）",
                root
            )));
        }
        if qty <= Decimal::ZERO {
            return Err(MfgError::validation(format!(
                "展開數量必須大於 0（收到 {}）",
                qty
            )));
        }

        let bom = match bom_id {
            Some(id) => {
                let bom = self
                    .source
                    .bom(id)
                    .ok_or_else(|| MfgError::not_found("BOM", id))?;
                if bom.item != root {
                    return Err(MfgError::validation(format!(
                        "BOM {} 屬於 {}，不是 {}",
                        id, bom.item, root
                    )));
                }
                bom
            }
            None => self.current_bom(root)?,
        };

        let mut walk = Walk::default();
        let mut path = vec![root];
        self.walk(root, &bom, qty, 1, &mut path, &mut walk)?;
        Ok(walk)
    }

    fn current_bom(&self, item: ItemRef) -> Result<Bom> {
        self.source
            .current_bom(item, self.policy)
            .ok_or(MfgError::MissingBom(item))
    }

    fn walk(
        &self,
        item: ItemRef,
        bom: &Bom,
        qty: Decimal,
        level: usize,
        path: &mut Vec<ItemRef>,
        walk: &mut Walk,
    ) -> Result<()> {
        walk.dependencies.insert(item);

        for component in self.source.components(bom.id) {
            let needed = component.extended_quantity(qty)?;
            walk.lines.push(ExplodedLine {
                level,
                parent: item,
                bom_id: bom.id,
                component: component.component,
                quantity_per_unit: component.quantity_per_unit,
                waste_percent: component.waste_percent,
                extended_qty: needed,
            });

            match component.component {
                ItemRef::Material(material) => {
                    let total = walk.totals.entry(material).or_insert(Decimal::ZERO);
                    *total = quantity::checked_add(*total, needed)?;
                }
                child @ (ItemRef::SemiProduct(_) | ItemRef::Product(_)) => {
                    if path.contains(&child) {
                        let mut cycle = path.clone();
                        cycle.push(child);
                        tracing::warn!("BOM 循環引用: {:?}", cycle);
                        return Err(MfgError::BomCycle { path: cycle });
                    }

                    let child_bom = self.current_bom(child)?;
                    tracing::debug!("第 {} 階: {} × {}", level + 1, child, needed);

                    path.push(child);
                    self.walk(child, &child_bom, needed, level + 1, path, walk)?;
                    path.pop();
                }
            }
        }
        Ok(())
    }
}
