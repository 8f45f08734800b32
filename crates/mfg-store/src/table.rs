//! 具回復日誌的資料表
//!
//! 每次寫入都會記錄舊值，交易或保存點失敗時依相反順序還原。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::ops::RangeBounds;

/// 鍵值資料表
#[derive(Debug, Clone)]
pub struct Table<K, V> {
    rows: BTreeMap<K, V>,
    undo: Vec<(K, Option<V>)>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            undo: Vec::new(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> Table<K, V> {
    /// 創建空的資料表
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.rows.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.rows.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.rows.values()
    }

    pub fn range<R: RangeBounds<K>>(&self, range: R) -> impl Iterator<Item = (&K, &V)> {
        self.rows.range(range)
    }

    /// 寫入一列，回傳舊值
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.rows.insert(key.clone(), value);
        self.undo.push((key, old.clone()));
        old
    }

    /// 刪除一列
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let old = self.rows.remove(key);
        if let Some(value) = &old {
            self.undo.push((key.clone(), Some(value.clone())));
        }
        old
    }

    /// 取得可變參照（取出前先記錄舊值）
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let old = self.rows.get(key)?.clone();
        self.undo.push((key.clone(), Some(old)));
        self.rows.get_mut(key)
    }

    pub(crate) fn mark(&self) -> usize {
        self.undo.len()
    }

    pub(crate) fn rollback_to(&mut self, mark: usize) {
        while self.undo.len() > mark {
            let Some((key, old)) = self.undo.pop() else {
                break;
            };
            match old {
                Some(value) => {
                    self.rows.insert(key, value);
                }
                None => {
                    self.rows.remove(&key);
                }
            }
        }
    }

    pub(crate) fn commit(&mut self) {
        self.undo.clear();
    }
}

impl<K: Serialize, V: Serialize> Serialize for Table<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows.iter())
    }
}

impl<'de, K, V> Deserialize<'de> for Table<K, V>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(Self {
            rows: rows.into_iter().collect(),
            undo: Vec::new(),
        })
    }
}

/// 只增不改的紀錄
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Log<T> {
    entries: Vec<T>,
}

impl<T> Default for Log<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Log<T> {
    pub fn append(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    pub(crate) fn mark(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn rollback_to(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_restores_previous_rows() {
        let mut table: Table<u32, String> = Table::new();
        table.insert(1, "a".to_string());
        table.commit();

        let mark = table.mark();
        table.insert(1, "b".to_string());
        table.insert(2, "c".to_string());
        table.remove(&1);
        if let Some(value) = table.get_mut(&2) {
            value.push('!');
        }
        assert_eq!(table.get(&2).map(String::as_str), Some("c!"));

        table.rollback_to(mark);
        assert_eq!(table.get(&1).map(String::as_str), Some("a"));
        assert!(!table.contains_key(&2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_nested_marks() {
        let mut table: Table<u32, u32> = Table::new();
        table.insert(1, 10);

        let outer = table.mark();
        table.insert(1, 20);
        let inner = table.mark();
        table.insert(1, 30);

        table.rollback_to(inner);
        assert_eq!(table.get(&1), Some(&20));

        table.rollback_to(outer);
        assert_eq!(table.get(&1), Some(&10));
    }

    #[test]
    fn test_log_rollback_truncates() {
        let mut log = Log::default();
        log.append(1);
        let mark = log.mark();
        log.append(2);
        log.append(3);

        log.rollback_to(mark);
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_table_serializes_as_pairs() {
        let mut table: Table<(u32, u32), String> = Table::new();
        table.insert((1, 2), "x".to_string());

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"[[[1,2],"x"]]"#);

        let back: Table<(u32, u32), String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&(1, 2)).map(String::as_str), Some("x"));
    }
}
