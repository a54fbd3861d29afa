use crate::error::{ReaderError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

// 子模块声明
pub mod chunked;
pub mod records;
pub mod sqlite;

pub use sqlite::SqliteStore;

/// 键值存储
///
/// 同步读写；写入可能因配额不足失败，调用方负责降级处理
pub trait KeyValueStore: Send {
    /// 读取键对应的值，不存在时返回 None
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入键值（覆盖旧值）
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// 删除键，不存在时忽略
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// 读取 JSON 值
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// 写入 JSON 值
pub fn set_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

/// 内存存储
///
/// 可设置字节配额，用于测试和持久化失败时的降级
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带配额（键与值的总字节数上限）的存储
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    /// 已用字节数
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(limit) = self.quota {
            let others: usize = self
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(ReaderError::PersistenceQuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
