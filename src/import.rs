//! 异步导入模块
//!
//! 解码并分章；大文本按批次分章，批次之间让出执行权，
//! 新的导入开始后旧的导入在下一次恢复时自动放弃

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::parser::txt_parser::TxtParser;
use crate::parser::{Book, ParseResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 导入状态枚举
///
/// 表示导入任务的各个阶段
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ImportStatus {
    /// 正在解码
    Decoding,
    /// 正在分章
    Segmenting,
    /// 完成
    Completed,
    /// 被更新的导入取代，结果已丢弃
    Superseded,
}

/// 导入进度
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    /// 导入代号
    pub generation: u64,
    pub status: ImportStatus,
    /// 已处理行数
    pub processed_lines: usize,
    /// 总行数（解码前为 0）
    pub total_lines: usize,
}

impl ImportProgress {
    /// 进度（0.0 - 1.0）
    pub fn ratio(&self) -> f32 {
        if self.total_lines == 0 {
            match self.status {
                ImportStatus::Completed => 1.0,
                _ => 0.0,
            }
        } else {
            self.processed_lines as f32 / self.total_lines as f32
        }
    }
}

/// 导入代号计数器
///
/// 每次导入递增，单调不减
#[derive(Clone, Debug, Default)]
pub struct GenerationCounter {
    latest: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新一代导入，之前的代号全部失效
    pub fn advance(&self) -> GenerationToken {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationToken {
            id,
            latest: Arc::clone(&self.latest),
        }
    }

    /// 最新代号（尚未导入时为 0）
    pub fn current(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// 导入代号
#[derive(Clone, Debug)]
pub struct GenerationToken {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl GenerationToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 是否仍是最新的导入
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }
}

/// 导入结果
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub generation: u64,
    pub result: ParseResult,
}

/// 导入器
///
/// 可克隆的句柄，所有克隆共享同一个代号计数器
#[derive(Clone)]
pub struct Importer {
    parser: Arc<TxtParser>,
    generations: GenerationCounter,
    batch_lines: usize,
    incremental_threshold_lines: usize,
}

impl Importer {
    /// 根据配置创建导入器
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_parser(
            TxtParser::from_config(config)?,
            config.batch_lines,
            config.incremental_threshold_lines,
        ))
    }

    pub fn with_parser(parser: TxtParser, batch_lines: usize, incremental_threshold_lines: usize) -> Self {
        Self {
            parser: Arc::new(parser),
            generations: GenerationCounter::new(),
            batch_lines: batch_lines.max(1),
            incremental_threshold_lines,
        }
    }

    pub fn parser(&self) -> &TxtParser {
        &self.parser
    }

    pub fn generations(&self) -> &GenerationCounter {
        &self.generations
    }

    /// 导入文件字节
    ///
    /// # 参数
    /// - `bytes`: 文件字节
    /// - `file_name`: 文件名
    /// - `on_progress`: 进度回调
    ///
    /// # 返回
    /// 导入结果；被更新的导入取代时返回 None
    pub async fn import_bytes<F>(&self, bytes: &[u8], file_name: &str, mut on_progress: F) -> Option<ImportOutcome>
    where
        F: FnMut(ImportProgress),
    {
        let token = self.generations.advance();
        on_progress(ImportProgress {
            generation: token.id(),
            status: ImportStatus::Decoding,
            processed_lines: 0,
            total_lines: 0,
        });

        let decoded = self.parser.resolver().resolve(bytes);
        self.run(token, decoded.text, file_name, decoded.encoding, on_progress)
            .await
    }

    /// 导入已解码的文本
    pub async fn import_text<F>(&self, text: String, file_name: &str, on_progress: F) -> Option<ImportOutcome>
    where
        F: FnMut(ImportProgress),
    {
        let token = self.generations.advance();
        self.run(token, text, file_name, "UTF-8".to_string(), on_progress)
            .await
    }

    async fn run<F>(
        &self,
        token: GenerationToken,
        text: String,
        file_name: &str,
        encoding: String,
        mut on_progress: F,
    ) -> Option<ImportOutcome>
    where
        F: FnMut(ImportProgress),
    {
        let generation = token.id();
        let book = Book::from_file_name(file_name, text);

        tokio::task::yield_now().await;
        if !token.is_current() {
            return superseded(generation, 0, 0, &mut on_progress);
        }

        let detector = self.parser.detector();
        let mut run = detector.begin(&book.content, book.fallback_title());
        let total_lines = run.total_lines();

        if total_lines > self.incremental_threshold_lines {
            info!(
                "《{}》共 {} 行，按每批 {} 行增量分章",
                book.title, total_lines, self.batch_lines
            );

            while !run.is_done() {
                run.step(self.batch_lines);
                on_progress(ImportProgress {
                    generation,
                    status: ImportStatus::Segmenting,
                    processed_lines: run.processed_lines(),
                    total_lines,
                });

                tokio::task::yield_now().await;
                if !token.is_current() {
                    return superseded(generation, run.processed_lines(), total_lines, &mut on_progress);
                }
            }
        }

        let chapters = run.finish();
        debug!("《{}》分章得到 {} 个章节", book.title, chapters.len());

        on_progress(ImportProgress {
            generation,
            status: ImportStatus::Completed,
            processed_lines: total_lines,
            total_lines,
        });

        Some(ImportOutcome {
            generation,
            result: ParseResult {
                book,
                chapters,
                encoding,
            },
        })
    }
}

fn superseded<F>(generation: u64, processed_lines: usize, total_lines: usize, on_progress: &mut F) -> Option<ImportOutcome>
where
    F: FnMut(ImportProgress),
{
    info!("导入 #{} 已被新的导入取代，放弃结果", generation);
    on_progress(ImportProgress {
        generation,
        status: ImportStatus::Superseded,
        processed_lines,
        total_lines,
    });
    None
}
