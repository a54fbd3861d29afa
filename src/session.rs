//! 阅读会话
//!
//! 持有当前书籍、章节列表、阅读位置和排版设置。
//! 每个会话独立拥有自己的存储，多个会话可以同时存在

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::import::{ImportOutcome, ImportProgress, Importer};
use crate::parser::{Book, Chapter};
use crate::search::{self, SearchHit};
use crate::storage::records::{
    self, now_millis, ReadingProgress, ReadingSettings, StoredBook,
};
use crate::storage::KeyValueStore;
use log::{debug, info, warn};

/// 恢复上次书籍的结果
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// 书籍已重新分章，阅读进度已恢复（如果有）
    Restored { title: String, chapter_index: usize },
    /// 只保存了元数据，需要用户重新选择文件
    MetadataOnly { title: String },
    /// 没有保存的书籍
    Nothing,
}

/// 阅读会话
pub struct ReaderSession {
    config: ReaderConfig,
    importer: Importer,
    store: Box<dyn KeyValueStore>,
    book: Option<Book>,
    chapters: Vec<Chapter>,
    current_index: usize,
    scroll_position: f64,
    settings: ReadingSettings,
}

impl ReaderSession {
    /// 创建会话并读取已保存的排版设置
    pub fn new(config: ReaderConfig, store: Box<dyn KeyValueStore>) -> Result<Self> {
        let importer = Importer::new(&config)?;
        let settings = ReadingSettings::load(store.as_ref());

        Ok(Self {
            config,
            importer,
            store,
            book: None,
            chapters: Vec::new(),
            current_index: 0,
            scroll_position: 0.0,
            settings,
        })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// 导入器句柄，可在会话锁之外执行导入，完成后交给 `install`
    pub fn importer(&self) -> Importer {
        self.importer.clone()
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn book(&self) -> Option<&Book> {
        self.book.as_ref()
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.chapters.get(self.current_index)
    }

    pub fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    pub fn settings(&self) -> &ReadingSettings {
        &self.settings
    }

    /// 打开文件字节
    ///
    /// # 返回
    /// 书籍是否已切换；被更新的导入取代时返回 false
    pub async fn open_bytes<F>(&mut self, bytes: &[u8], file_name: &str, on_progress: F) -> bool
    where
        F: FnMut(ImportProgress),
    {
        let importer = self.importer.clone();
        match importer.import_bytes(bytes, file_name, on_progress).await {
            Some(outcome) => self.install(outcome),
            None => false,
        }
    }

    /// 打开已解码的文本（例如粘贴的内容）
    pub async fn open_text<F>(&mut self, text: String, file_name: &str, on_progress: F) -> bool
    where
        F: FnMut(ImportProgress),
    {
        let importer = self.importer.clone();
        match importer.import_text(text, file_name, on_progress).await {
            Some(outcome) => self.install(outcome),
            None => false,
        }
    }

    /// 用导入结果整体替换当前书籍
    ///
    /// 过期的导入结果被丢弃，返回 false
    pub fn install(&mut self, outcome: ImportOutcome) -> bool {
        if !self.importer.generations().is_latest(outcome.generation) {
            info!("丢弃过期的导入结果 #{}", outcome.generation);
            return false;
        }

        let result = outcome.result;
        info!(
            "打开《{}》: 编码 {}，{} 章",
            result.book.title,
            result.encoding,
            result.chapters.len()
        );

        self.book = Some(result.book);
        self.chapters = result.chapters;
        self.current_index = 0;
        self.scroll_position = 0.0;

        if !self.try_restore_progress() {
            debug!("没有可用的阅读进度，从第一章开始");
            self.load_chapter(0);
        }

        self.save_current_book();
        true
    }

    /// 跳转到指定章节，越界时忽略
    pub fn load_chapter(&mut self, index: usize) -> Option<&Chapter> {
        if index >= self.chapters.len() {
            return None;
        }

        self.current_index = index;
        self.scroll_position = 0.0;
        self.save_progress();
        self.chapters.get(index)
    }

    pub fn has_next(&self) -> bool {
        self.current_index + 1 < self.chapters.len()
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }

    /// 下一章，已在最后一章时不动
    pub fn next_chapter(&mut self) -> Option<&Chapter> {
        if !self.has_next() {
            return None;
        }
        self.load_chapter(self.current_index + 1)
    }

    /// 上一章，已在第一章时不动
    pub fn previous_chapter(&mut self) -> Option<&Chapter> {
        if !self.has_previous() {
            return None;
        }
        self.load_chapter(self.current_index - 1)
    }

    /// 章节位置标签，例如 "3 / 10"
    pub fn chapter_label(&self) -> String {
        if self.chapters.is_empty() {
            return String::new();
        }
        format!("{} / {}", self.current_index + 1, self.chapters.len())
    }

    /// 阅读百分比（按章节计）
    pub fn progress_percent(&self) -> f64 {
        if self.chapters.is_empty() {
            return 0.0;
        }
        (self.current_index + 1) as f64 / self.chapters.len() as f64 * 100.0
    }

    /// 记录滚动位置（只更新内存，由防抖或定时任务保存）
    pub fn record_scroll(&mut self, position: f64) {
        self.scroll_position = position.max(0.0);
    }

    /// 当前阅读进度快照，没有打开书籍时为 None
    pub fn progress_snapshot(&self) -> Option<ReadingProgress> {
        let book = self.book.as_ref()?;
        Some(ReadingProgress {
            book_title: book.title.clone(),
            chapter_index: self.current_index,
            scroll_position: self.scroll_position,
            chapter_title: self
                .current_chapter()
                .map(|c| c.title.clone())
                .unwrap_or_default(),
            total_chapters: self.chapters.len(),
            timestamp: now_millis(),
        })
    }

    /// 保存阅读进度（覆盖旧记录）
    ///
    /// 失败只记录日志，内存中的状态不受影响
    pub fn save_progress(&mut self) -> bool {
        let Some(progress) = self.progress_snapshot() else {
            return false;
        };

        match records::save_progress(self.store.as_mut(), &progress) {
            Ok(()) => {
                debug!(
                    "阅读进度已保存: 第{}章, 滚动位置: {}",
                    progress.chapter_index + 1,
                    progress.scroll_position
                );
                true
            }
            Err(e) => {
                warn!("保存阅读进度失败: {}", e);
                false
            }
        }
    }

    /// 保存当前书籍
    ///
    /// 空间不足时自动降级为只保存元数据；其他失败只记录日志
    pub fn save_current_book(&mut self) -> bool {
        let Some(book) = self.book.as_ref() else {
            return false;
        };

        match records::save_current_book(
            self.store.as_mut(),
            &book.title,
            &book.content,
            self.chapters.len(),
            &self.config,
        ) {
            Ok(_) => true,
            Err(e) => {
                warn!("保存《{}》失败: {}", book.title, e);
                false
            }
        }
    }

    /// 尝试恢复当前书籍的阅读进度
    ///
    /// 只有书名一致且章节索引有效时才恢复
    pub fn try_restore_progress(&mut self) -> bool {
        let Some(book) = self.book.as_ref() else {
            return false;
        };
        let Some(progress) = records::load_progress(self.store.as_ref()) else {
            return false;
        };

        if !progress.applies_to(&book.title, self.chapters.len()) {
            debug!(
                "进度记录《{}》第{}章不适用于当前书籍",
                progress.book_title,
                progress.chapter_index + 1
            );
            return false;
        }

        info!(
            "恢复阅读进度: 第{}章, 滚动位置: {}",
            progress.chapter_index + 1,
            progress.scroll_position
        );
        self.load_chapter(progress.chapter_index);
        self.scroll_position = progress.scroll_position.max(0.0);
        true
    }

    /// 恢复上次打开的书籍
    ///
    /// 分块缺失或损坏时返回错误，UI 需要提示用户重新选择文件
    pub async fn restore_last_book(&mut self) -> Result<RestoreOutcome> {
        let stored = match records::load_current_book(self.store.as_ref())? {
            Some(stored) => stored,
            None => return Ok(RestoreOutcome::Nothing),
        };

        let StoredBook { title, content, .. } = stored;
        let Some(content) = content else {
            info!("《{}》只保存了元数据，需要重新选择文件", title);
            return Ok(RestoreOutcome::MetadataOnly { title });
        };

        let file_name = format!("{}.txt", title);
        if !self.open_text(content, &file_name, |_| {}).await {
            return Ok(RestoreOutcome::Nothing);
        }

        Ok(RestoreOutcome::Restored {
            title,
            chapter_index: self.current_index,
        })
    }

    /// 页面隐藏：保存进度和书籍
    pub fn on_visibility_lost(&mut self) {
        if self.book.is_some() {
            self.save_progress();
            self.save_current_book();
        }
    }

    /// 失去焦点：只保存进度
    pub fn on_focus_lost(&mut self) {
        if self.book.is_some() {
            self.save_progress();
        }
    }

    /// 调整字号并保存，返回新的字号
    pub fn change_font_size(&mut self, delta: i32) -> u32 {
        let size = self.settings.change_font_size(delta);
        self.persist_settings();
        size
    }

    pub fn set_margins(&mut self, left: u32, right: u32) {
        self.settings.left_margin = left;
        self.settings.right_margin = right;
        self.persist_settings();
    }

    pub fn set_background_color(&mut self, color: &str) {
        self.settings.background_color = color.to_string();
        self.persist_settings();
    }

    /// 切换日间/夜间主题，返回切换后是否为夜间
    pub fn toggle_theme(&mut self) -> bool {
        self.settings.dark_theme = !self.settings.dark_theme;
        self.persist_settings();
        self.settings.dark_theme
    }

    /// 恢复默认排版设置
    pub fn reset_settings(&mut self) {
        self.settings = ReadingSettings::default();
        self.persist_settings();
    }

    fn persist_settings(&mut self) {
        if let Err(e) = self.settings.save(self.store.as_mut()) {
            warn!("保存阅读设置失败: {}", e);
        }
    }

    /// 在当前书籍中搜索
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search::search(&self.chapters, query)
    }
}
