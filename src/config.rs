use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 阅读器配置
///
/// 所有字段都有默认值，JSON 中缺失的字段使用默认值补齐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReaderConfig {
    /// 增量分章时每批处理的行数
    pub batch_lines: usize,
    /// 超过该行数的文本使用增量（分批让出）分章
    pub incremental_threshold_lines: usize,
    /// 是否启用 `^\d+[.\s]` 纯数字编号标题规则（容易误判正文中的编号列表）
    pub numbered_headings: bool,
    /// 追加到标题规则表末尾的自定义正则
    pub extra_heading_patterns: Vec<String>,
    /// 正文超过该字节数时分块存储
    pub chunk_threshold_bytes: usize,
    /// 每块的字符数
    pub chunk_chars: usize,
    /// 定期保存进度的间隔（秒）
    pub autosave_interval_secs: u64,
    /// 滚动后延迟保存的时间（毫秒）
    pub scroll_save_debounce_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            batch_lines: 1000,
            incremental_threshold_lines: 5000,
            numbered_headings: true,
            extra_heading_patterns: Vec::new(),
            chunk_threshold_bytes: 1024 * 1024,
            chunk_chars: 256 * 1024,
            autosave_interval_secs: 30,
            scroll_save_debounce_ms: 1000,
        }
    }
}

impl ReaderConfig {
    /// 从 JSON 字符串加载配置并校验
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ReaderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// 校验配置取值范围
    pub fn validate(&self) -> Result<()> {
        if self.batch_lines == 0 {
            return Err(ReaderError::Config("batchLines 必须大于 0".to_string()));
        }
        if self.chunk_chars == 0 {
            return Err(ReaderError::Config("chunkChars 必须大于 0".to_string()));
        }
        if self.autosave_interval_secs == 0 {
            return Err(ReaderError::Config(
                "autosaveIntervalSecs 必须大于 0".to_string(),
            ));
        }
        for pattern in &self.extra_heading_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                ReaderError::Config(format!("无效的标题正则 {}: {}", pattern, e))
            })?;
        }
        Ok(())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn scroll_save_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_save_debounce_ms)
    }
}
