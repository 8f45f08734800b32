//! 並行批次展開

use mfg_core::{quantity, ItemRef, MaterialId, Result};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::resolver::{BomResolver, MaterialNeed};
use crate::source::BomSource;

impl<S: BomSource + Sync + ?Sized> BomResolver<'_, S> {
    /// 並行展開多個需求，結果順序與輸入相同，各項各自成功或失敗
    pub fn resolve_batch(&self, requests: &[(ItemRef, Decimal)]) -> Vec<Result<Vec<MaterialNeed>>> {
        tracing::info!("開始批次展開：{} 筆", requests.len());

        requests
            .par_iter()
            .map(|&(root, qty)| self.resolve(root, qty))
            .collect()
    }

    /// 並行展開並彙總為一份原物料需求，任一項失敗即回傳該錯誤
    pub fn resolve_combined(&self, requests: &[(ItemRef, Decimal)]) -> Result<Vec<MaterialNeed>> {
        let mut totals: BTreeMap<MaterialId, MaterialNeed> = BTreeMap::new();

        for needs in self.resolve_batch(requests) {
            for need in needs? {
                totals
                    .entry(need.material)
                    .and_modify(|total| total.required_qty += need.required_qty)
                    .or_insert(need);
            }
        }

        Ok(totals
            .into_values()
            .map(|mut need| {
                need.required_qty = quantity::round(need.required_qty);
                need
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::resolver::tests::{bicycle, catalog};
    use crate::BomResolver;
    use mfg_core::{ItemRef, MfgError};
    use rust_decimal_macros::dec;

    #[test]
    fn test_batch_keeps_input_order() {
        let tables = bicycle();
        let catalog = catalog();
        let resolver = BomResolver::new(&tables, &catalog);

        let results = resolver.resolve_batch(&[
            (ItemRef::product(100), dec!(1)),
            (ItemRef::material(1), dec!(1)),
            (ItemRef::semi_product(10), dec!(2)),
        ]);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().len(), 3);
        assert!(matches!(results[1], Err(MfgError::Validation(_))));
        assert_eq!(results[2].as_ref().unwrap()[0].required_qty, dec!(11.00));
    }

    #[test]
    fn test_combined_totals() {
        let tables = bicycle();
        let catalog = catalog();
        let resolver = BomResolver::new(&tables, &catalog);

        let needs = resolver
            .resolve_combined(&[
                (ItemRef::product(100), dec!(1)),
                (ItemRef::semi_product(10), dec!(1)),
            ])
            .unwrap();

        // 2 個車架 + 1 個車架
        assert_eq!(needs[0].required_qty, dec!(16.50));
        assert_eq!(needs[1].required_qty, dec!(12));

        let failed = resolver.resolve_combined(&[
            (ItemRef::product(100), dec!(1)),
            (ItemRef::product(999), dec!(1)),
        ]);
        assert!(matches!(failed, Err(MfgError::MissingBom(_))));
    }
}
