use thiserror::Error;

/// 阅读器核心错误类型
///
/// 只有 `PersistedContentIncomplete` 需要由 UI 层展示给用户，
/// 其余错误在核心内部被记录并降级处理。
#[derive(Error, Debug)]
pub enum ReaderError {
    /// 备用编码全部被拒绝；编码解析器记录到日志后保留原始解码结果
    #[error("解码失败: {0}")]
    DecodeFailure(String),
    /// 没有匹配到标题；分章引擎记录到日志后输出单一合成章节
    #[error("未识别到任何章节结构")]
    EmptyOrUnstructuredInput,
    #[error("存储空间不足: 写入 {key} 需要 {needed} 字节，上限 {limit} 字节")]
    PersistenceQuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
    #[error("已保存的内容不完整: {key} 缺少第 {missing_chunk} 块（共 {expected_chunks} 块），请重新选择文件")]
    PersistedContentIncomplete {
        key: String,
        missing_chunk: usize,
        expected_chunks: usize,
    },
    #[error("已保存的内容校验失败: {key} 期望 {expected}，实际 {actual}，请重新选择文件")]
    PersistedContentCorrupted {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),
    #[error("配置错误: {0}")]
    Config(String),
    #[error("数据库错误: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    /// 是否为存储配额不足（调用方可降级为只保存元数据）
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, ReaderError::PersistenceQuotaExceeded { .. })
    }

    /// 已保存的正文无法还原，UI 需要提示用户重新选择源文件
    pub fn requires_reselect(&self) -> bool {
        matches!(
            self,
            ReaderError::PersistedContentIncomplete { .. }
                | ReaderError::PersistedContentCorrupted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;
