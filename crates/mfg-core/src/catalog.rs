//! 主檔查詢介面
//!
//! 原物料、半成品、成品、倉庫與使用者主檔由外部系統維護，
//! 本模組只定義唯讀查詢介面與一個記憶體實作。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::id::{UserId, WarehouseId};
use crate::item::ItemRef;
use crate::{MfgError, Result};

/// 物料主檔摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub item: ItemRef,
    pub code: String,
    pub name: String,
    pub unit: String,
}

/// 倉庫主檔摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseInfo {
    pub id: WarehouseId,
    pub code: String,
    pub name: String,
}

/// 使用者摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
}

/// 主檔查詢
pub trait Catalog: Send + Sync {
    /// 查詢物料
    fn item(&self, item: ItemRef) -> Option<ItemInfo>;

    /// 查詢倉庫
    fn warehouse(&self, id: WarehouseId) -> Option<WarehouseInfo>;

    /// 查詢使用者
    fn user(&self, id: UserId) -> Option<UserInfo>;

    /// 查詢物料，不存在時回傳錯誤
    fn require_item(&self, item: ItemRef) -> Result<ItemInfo> {
        self.item(item)
            .ok_or_else(|| MfgError::not_found("物料", item))
    }

    /// 查詢倉庫，不存在時回傳錯誤
    fn require_warehouse(&self, id: WarehouseId) -> Result<WarehouseInfo> {
        self.warehouse(id)
            .ok_or_else(|| MfgError::not_found("倉庫", id))
    }

    /// 查詢使用者，不存在時回傳錯誤
    fn require_user(&self, id: UserId) -> Result<UserInfo> {
        self.user(id)
            .ok_or_else(|| MfgError::not_found("使用者", id))
    }
}

/// 記憶體主檔
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: HashMap<ItemRef, ItemInfo>,
    warehouses: HashMap<WarehouseId, WarehouseInfo>,
    users: HashMap<UserId, UserInfo>,
}

impl InMemoryCatalog {
    /// 創建空的主檔
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：新增物料
    pub fn with_item(mut self, item: ItemRef, code: &str, name: &str, unit: &str) -> Self {
        self.add_item(item, code, name, unit);
        self
    }

    /// 建構器模式：新增倉庫
    pub fn with_warehouse(mut self, id: WarehouseId, code: &str, name: &str) -> Self {
        self.warehouses.insert(
            id,
            WarehouseInfo {
                id,
                code: code.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    /// 建構器模式：新增使用者
    pub fn with_user(mut self, id: UserId, username: &str) -> Self {
        self.users.insert(
            id,
            UserInfo {
                id,
                username: username.to_string(),
            },
        );
        self
    }

    /// 新增物料
    pub fn add_item(&mut self, item: ItemRef, code: &str, name: &str, unit: &str) {
        self.items.insert(
            item,
            ItemInfo {
                item,
                code: code.to_string(),
                name: name.to_string(),
                unit: unit.to_string(),
            },
        );
    }
}

impl Catalog for InMemoryCatalog {
    fn item(&self, item: ItemRef) -> Option<ItemInfo> {
        self.items.get(&item).cloned()
    }

    fn warehouse(&self, id: WarehouseId) -> Option<WarehouseInfo> {
        self.warehouses.get(&id).cloned()
    }

    fn user(&self, id: UserId) -> Option<UserInfo> {
        self.users.get(&id).cloned()
    }
}
