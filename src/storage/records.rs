use super::chunked::{self, ChunkManifest};
use super::{get_json, set_json, KeyValueStore};
use crate::config::ReaderConfig;
use crate::error::Result;
use crate::parser::book_title_from_file_name;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CURRENT_BOOK_KEY: &str = "currentBook";
pub const READING_PROGRESS_KEY: &str = "readingProgress";
pub const READING_SETTINGS_KEY: &str = "readingSettings";

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 24;

/// 当前 Unix 毫秒时间戳
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 归一化书名，用于比较进度记录是否属于当前书籍
///
/// 去掉 `.txt` 扩展名，合并连续空白，转小写
pub fn normalize_title(title: &str) -> String {
    book_title_from_file_name(title.trim())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 书籍正文的保存方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StoredContent {
    /// 正文直接保存在记录中
    Inline { text: String },
    /// 正文分块保存在 `currentBook.chunk.<i>` 下
    Chunked(ChunkManifest),
    /// 空间不足，只保存了元数据
    Omitted,
}

impl StoredContent {
    fn kind(&self) -> &'static str {
        match self {
            StoredContent::Inline { .. } => "inline",
            StoredContent::Chunked(_) => "chunked",
            StoredContent::Omitted => "omitted",
        }
    }

    fn chunk_count(&self) -> usize {
        match self {
            StoredContent::Chunked(manifest) => manifest.chunk_count,
            _ => 0,
        }
    }
}

/// `currentBook` 记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub title: String,
    /// 章节数
    pub chapters: usize,
    /// 正文字节数
    pub size: usize,
    pub timestamp: i64,
    pub content: StoredContent,
}

/// 从存储中还原的书籍
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBook {
    pub title: String,
    pub chapters: usize,
    pub timestamp: i64,
    /// 只保存了元数据时为 None
    pub content: Option<String>,
}

/// `readingProgress` 记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub book_title: String,
    pub chapter_index: usize,
    pub scroll_position: f64,
    #[serde(default)]
    pub chapter_title: String,
    #[serde(default)]
    pub total_chapters: usize,
    #[serde(default)]
    pub timestamp: i64,
}

impl ReadingProgress {
    /// 进度是否属于该书且章节索引仍然有效
    pub fn applies_to(&self, title: &str, chapter_count: usize) -> bool {
        normalize_title(&self.book_title) == normalize_title(title)
            && self.chapter_index < chapter_count
    }
}

/// `readingSettings` 记录
///
/// 缺失的字段使用默认值补齐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadingSettings {
    pub left_margin: u32,
    pub right_margin: u32,
    pub background_color: String,
    pub font_size: u32,
    pub dark_theme: bool,
}

impl Default for ReadingSettings {
    fn default() -> Self {
        Self {
            left_margin: 32,
            right_margin: 32,
            background_color: "transparent".to_string(),
            font_size: 16,
            dark_theme: false,
        }
    }
}

impl ReadingSettings {
    /// 调整字号，结果限制在 12 到 24 之间
    pub fn change_font_size(&mut self, delta: i32) -> u32 {
        let size = (self.font_size as i64 + delta as i64)
            .clamp(MIN_FONT_SIZE as i64, MAX_FONT_SIZE as i64);
        self.font_size = size as u32;
        self.font_size
    }

    /// 读取设置，记录损坏时返回默认值
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match get_json::<ReadingSettings>(store, READING_SETTINGS_KEY) {
            Ok(Some(mut settings)) => {
                settings.font_size = settings.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
                settings
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("读取阅读设置失败，使用默认设置: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        set_json(store, READING_SETTINGS_KEY, self)
    }
}

/// 保存当前书籍
///
/// 正文超过阈值时分块保存；空间不足时降级为只保存元数据。
/// 旧书籍留下的分块会被清理
pub fn save_current_book(
    store: &mut dyn KeyValueStore,
    title: &str,
    content: &str,
    chapter_count: usize,
    config: &ReaderConfig,
) -> Result<BookRecord> {
    let previous_chunks = match get_json::<BookRecord>(store, CURRENT_BOOK_KEY) {
        Ok(Some(record)) => record.content.chunk_count(),
        Ok(None) => 0,
        Err(e) => {
            warn!("旧的书籍记录无法解析，直接覆盖: {}", e);
            0
        }
    };

    // 先释放旧书占用的空间；记录与分块一起删除，不留下指向缺失分块的清单
    if previous_chunks > 0 {
        store.remove(CURRENT_BOOK_KEY)?;
        chunked::remove_chunks(store, CURRENT_BOOK_KEY, 0..previous_chunks);
    }

    let stored = if content.len() > config.chunk_threshold_bytes {
        match chunked::write_chunks(store, CURRENT_BOOK_KEY, content, config.chunk_chars) {
            Ok(manifest) => StoredContent::Chunked(manifest),
            Err(e) if e.is_quota_exceeded() => {
                warn!("《{}》正文分块保存失败，只保存元数据: {}", title, e);
                StoredContent::Omitted
            }
            Err(e) => return Err(e),
        }
    } else {
        StoredContent::Inline {
            text: content.to_string(),
        }
    };

    let mut record = BookRecord {
        title: title.to_string(),
        chapters: chapter_count,
        size: content.len(),
        timestamp: now_millis(),
        content: stored,
    };

    match set_json(store, CURRENT_BOOK_KEY, &record) {
        Ok(()) => {}
        Err(e) if e.is_quota_exceeded() && record.content != StoredContent::Omitted => {
            warn!("《{}》书籍记录保存失败，改为只保存元数据: {}", title, e);
            chunked::remove_chunks(store, CURRENT_BOOK_KEY, 0..record.content.chunk_count());
            record.content = StoredContent::Omitted;
            set_json(store, CURRENT_BOOK_KEY, &record)?;
        }
        Err(e) => return Err(e),
    }

    info!(
        "《{}》已保存（{}，{} 字节，{} 章）",
        title,
        record.content.kind(),
        record.size,
        record.chapters
    );
    Ok(record)
}

/// 读取当前书籍
///
/// 分块缺失或校验失败时返回错误，不会返回残缺的正文
pub fn load_current_book(store: &dyn KeyValueStore) -> Result<Option<StoredBook>> {
    let record = match get_json::<BookRecord>(store, CURRENT_BOOK_KEY)? {
        Some(record) => record,
        None => return Ok(None),
    };

    let content = match record.content {
        StoredContent::Inline { text } => Some(text),
        StoredContent::Chunked(manifest) => {
            Some(chunked::read_chunks(store, CURRENT_BOOK_KEY, &manifest)?)
        }
        StoredContent::Omitted => None,
    };

    Ok(Some(StoredBook {
        title: record.title,
        chapters: record.chapters,
        timestamp: record.timestamp,
        content,
    }))
}

/// 读取阅读进度，记录损坏时视为没有进度
pub fn load_progress(store: &dyn KeyValueStore) -> Option<ReadingProgress> {
    match get_json::<ReadingProgress>(store, READING_PROGRESS_KEY) {
        Ok(progress) => progress,
        Err(e) => {
            warn!("读取阅读进度失败: {}", e);
            None
        }
    }
}

/// 覆盖保存阅读进度
pub fn save_progress(store: &mut dyn KeyValueStore, progress: &ReadingProgress) -> Result<()> {
    set_json(store, READING_PROGRESS_KEY, progress)
}
