use super::KeyValueStore;
use crate::error::{ReaderError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ops::Range;

/// 分块的键名：`<base>.chunk.<i>`
pub fn chunk_key(base: &str, index: usize) -> String {
    format!("{}.chunk.{}", base, index)
}

/// 分块清单
///
/// 与书籍元数据一起保存，恢复时用于逐块读取并校验
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkManifest {
    pub chunk_count: usize,
    pub total_bytes: usize,
    /// 完整正文的 SHA-256（十六进制）
    pub checksum: String,
}

/// 计算文本的 SHA-256
pub fn checksum(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 按字符数切分文本，不会切断多字节字符
pub fn split_chunks(text: &str, chunk_chars: usize) -> Vec<&str> {
    let chunk_chars = chunk_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == chunk_chars {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

/// 分块写入正文
///
/// 写入中途失败时删除已写入的块后返回错误
pub fn write_chunks(
    store: &mut dyn KeyValueStore,
    base: &str,
    text: &str,
    chunk_chars: usize,
) -> Result<ChunkManifest> {
    let chunks = split_chunks(text, chunk_chars);

    for (i, chunk) in chunks.iter().enumerate() {
        if let Err(e) = store.set(&chunk_key(base, i), chunk) {
            warn!("写入第 {} 块失败: {}，清理已写入的块", i, e);
            remove_chunks(store, base, 0..i);
            return Err(e);
        }
    }

    debug!("{} 分 {} 块写入，共 {} 字节", base, chunks.len(), text.len());

    Ok(ChunkManifest {
        chunk_count: chunks.len(),
        total_bytes: text.len(),
        checksum: checksum(text),
    })
}

/// 按清单读取并拼接正文
///
/// 任意一块缺失返回 `PersistedContentIncomplete`，校验和不符返回 `PersistedContentCorrupted`
pub fn read_chunks(store: &dyn KeyValueStore, base: &str, manifest: &ChunkManifest) -> Result<String> {
    let mut text = String::with_capacity(manifest.total_bytes);

    for i in 0..manifest.chunk_count {
        match store.get(&chunk_key(base, i))? {
            Some(chunk) => text.push_str(&chunk),
            None => {
                return Err(ReaderError::PersistedContentIncomplete {
                    key: base.to_string(),
                    missing_chunk: i,
                    expected_chunks: manifest.chunk_count,
                })
            }
        }
    }

    let actual = checksum(&text);
    if actual != manifest.checksum {
        return Err(ReaderError::PersistedContentCorrupted {
            key: base.to_string(),
            expected: manifest.checksum.clone(),
            actual,
        });
    }

    Ok(text)
}

/// 删除指定范围内的块，删除失败只记录日志
pub fn remove_chunks(store: &mut dyn KeyValueStore, base: &str, range: Range<usize>) {
    for i in range {
        if let Err(e) = store.remove(&chunk_key(base, i)) {
            warn!("删除 {} 失败: {}", chunk_key(base, i), e);
        }
    }
}
