//! 強型別識別碼

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! impl_u64_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// 取得原始數值
            pub fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

impl_u64_id!(
    /// 原物料ID
    MaterialId
);
impl_u64_id!(
    /// 半成品ID
    SemiProductId
);
impl_u64_id!(
    /// 成品ID
    ProductId
);
impl_u64_id!(
    /// 倉庫ID
    WarehouseId
);
impl_u64_id!(
    /// 使用者ID
    UserId
);
impl_u64_id!(
    /// BOM ID
    BomId
);
impl_u64_id!(
    /// 製造訂單明細ID
    OrderLineId
);
impl_u64_id!(
    /// 工單ID
    WorkOrderId
);
