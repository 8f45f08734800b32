//! # MFG Store
//!
//! 記憶體交易式儲存層
//!
//! 所有寫入都在 [`Database::transaction`] 內進行：閉包回傳 `Ok` 時提交，
//! 回傳 `Err` 或發生 panic 時依相反順序還原所有寫入。
//! 交易期間持有唯一的寫入鎖，交易內讀到的庫存即為扣帳當下的數量。

pub mod table;
pub mod tables;

// Re-export 主要類型
pub use table::{Log, Table};
pub use tables::{Sequences, StatusKey, StockKey, Tables};

use mfg_core::Result;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::tables::Mark;

/// 資料庫
#[derive(Debug, Default)]
pub struct Database {
    tables: Mutex<Tables>,
}

impl Database {
    /// 創建空的資料庫
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // 中斷的交易已在 Drop 時回復，鎖內資料仍一致
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 開始一筆交易
    pub fn begin(&self) -> Transaction<'_> {
        let guard = self.lock();
        let mark = guard.mark();
        Transaction {
            guard,
            mark,
            finished: false,
        }
    }

    /// 在交易內執行，成功提交、失敗回復
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut tx = self.begin();
        match f(&mut tx) {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("交易回復: {}", err);
                tx.rollback();
                Err(err)
            }
        }
    }

    /// 唯讀存取
    pub fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Tables) -> T,
    {
        let guard = self.lock();
        f(&guard)
    }

    /// 匯出為 JSON 快照
    pub fn to_json(&self) -> Result<String> {
        let guard = self.lock();
        Ok(serde_json::to_string_pretty(&*guard)?)
    }

    /// 從 JSON 快照載入
    pub fn from_json(json: &str) -> Result<Self> {
        let tables: Tables = serde_json::from_str(json)?;
        Ok(Self {
            tables: Mutex::new(tables),
        })
    }

    /// 寫入快照檔
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json)?;
        tracing::info!("快照已寫入: {}", path.display());
        Ok(())
    }

    /// 開啟快照檔
    pub fn open_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let db = Self::from_json(&json)?;
        tracing::info!("快照已載入: {}", path.display());
        Ok(db)
    }
}

/// 交易
///
/// 未提交即被丟棄時（包含 panic）自動回復。
pub struct Transaction<'a> {
    guard: MutexGuard<'a, Tables>,
    mark: Mark,
    finished: bool,
}

impl Transaction<'_> {
    /// 保存點：閉包失敗時只回復閉包內的寫入
    pub fn savepoint<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let mark = self.guard.mark();
        let result = f(self);
        if result.is_err() {
            self.guard.rollback_to(mark);
        }
        result
    }

    /// 提交
    pub fn commit(mut self) {
        self.guard.commit();
        self.finished = true;
    }

    /// 回復
    pub fn rollback(mut self) {
        self.guard.rollback_to(self.mark);
        self.guard.commit();
        self.finished = true;
    }
}

impl Deref for Transaction<'_> {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.guard
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Tables {
        &mut self.guard
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("交易未提交即結束，回復所有寫入");
            self.guard.rollback_to(self.mark);
            self.guard.commit();
        }
    }
}
