use super::line_classifier::{LineClass, LineClassifier};
use super::{Chapter, DEFAULT_FALLBACK_TITLE};
use crate::error::ReaderError;
use log::{debug, info};

/// 分章累积状态
///
/// 在批次之间显式传递，增量分章与一次性分章共享同一份逻辑
#[derive(Debug, Default)]
struct SegmentState {
    /// 已完成的章节
    chapters: Vec<Chapter>,
    /// 正在累积的章节
    current: Option<Chapter>,
    /// 当前章节尚未拼接的正文行（空字符串表示段落间隔）
    pending_body: Vec<String>,
    /// 下一个待处理的行号
    next_line: usize,
}

impl SegmentState {
    /// 结束当前章节：正文按换行拼接并去除首尾空白
    ///
    /// 没有正文的章节会被丢弃
    fn finalize_current(&mut self) {
        if self.pending_body.is_empty() {
            return;
        }
        if let Some(mut chapter) = self.current.take() {
            chapter.content = self.pending_body.join("\n").trim().to_string();
            self.chapters.push(chapter);
        }
    }
}

/// 去除行首尾的空白和 BOM
fn trim_line(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

/// 一次分章过程
///
/// 可恢复的状态机：每次 `step` 处理若干行，处理完毕后调用 `finish` 取得章节列表
pub struct Segmentation<'a> {
    classifier: &'a LineClassifier,
    text: &'a str,
    lines: Vec<&'a str>,
    fallback_title: String,
    state: SegmentState,
}

impl<'a> Segmentation<'a> {
    fn new(classifier: &'a LineClassifier, text: &'a str, fallback_title: &str) -> Self {
        let fallback_title = if fallback_title.trim().is_empty() {
            DEFAULT_FALLBACK_TITLE.to_string()
        } else {
            fallback_title.to_string()
        };

        Self {
            classifier,
            text,
            lines: text.split('\n').collect(),
            fallback_title,
            state: SegmentState::default(),
        }
    }

    /// 总行数
    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    /// 已处理行数
    pub fn processed_lines(&self) -> usize {
        self.state.next_line
    }

    /// 是否已处理完所有行
    pub fn is_done(&self) -> bool {
        self.state.next_line >= self.lines.len()
    }

    /// 处理至多 `max_lines` 行
    ///
    /// # 返回
    /// 本次实际处理的行数
    pub fn step(&mut self, max_lines: usize) -> usize {
        let start = self.state.next_line;
        let end = start.saturating_add(max_lines).min(self.lines.len());

        for i in start..end {
            let raw: &'a str = self.lines[i];
            self.consume(i, trim_line(raw));
        }

        self.state.next_line = end;
        end - start
    }

    fn consume(&mut self, index: usize, line: &str) {
        let state = &mut self.state;

        match self.classifier.classify(line) {
            LineClass::Blank => {
                // 保留段落间隔
                if !state.pending_body.is_empty() && state.current.is_some() {
                    state.pending_body.push(String::new());
                }
            }
            LineClass::Heading => {
                if state.current.is_some() {
                    state.finalize_current();
                }
                state.current = Some(Chapter::open(line, index));
                state.pending_body.clear();
            }
            LineClass::Body => {
                if state.current.is_some() {
                    state.pending_body.push(line.to_string());
                } else if state.chapters.is_empty() {
                    // 第一个标题之前的前言放入合成章节
                    state.current = Some(Chapter::open(self.fallback_title.as_str(), 0));
                    state.pending_body.push(line.to_string());
                }
            }
        }
    }

    /// 处理剩余行并返回章节列表
    ///
    /// 结果保证非空：没有任何章节时，整个原文作为一个合成章节
    pub fn finish(mut self) -> Vec<Chapter> {
        if !self.is_done() {
            self.step(usize::MAX);
        }

        let mut state = self.state;
        state.finalize_current();

        if state.chapters.is_empty() {
            info!(
                "{}，全文作为单一章节 \"{}\"",
                ReaderError::EmptyOrUnstructuredInput,
                self.fallback_title
            );
            return vec![Chapter {
                title: self.fallback_title,
                content: self.text.to_string(),
                start_line: 0,
            }];
        }

        debug!(
            "分章完成：{} 行，{} 个章节",
            self.lines.len(),
            state.chapters.len()
        );
        state.chapters
    }
}

/// 章节检测器
///
/// 驱动行分类器遍历全文，按文档顺序输出章节
pub struct ChapterDetector {
    classifier: LineClassifier,
}

impl ChapterDetector {
    /// 使用默认规则创建检测器
    pub fn new() -> Self {
        Self::with_classifier(LineClassifier::new())
    }

    pub fn with_classifier(classifier: LineClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &LineClassifier {
        &self.classifier
    }

    /// 开始一次可分批推进的分章
    pub fn begin<'a>(&'a self, text: &'a str, fallback_title: &str) -> Segmentation<'a> {
        Segmentation::new(&self.classifier, text, fallback_title)
    }

    /// 一次性分章
    ///
    /// # 参数
    /// - `text`: 解码后的全文
    /// - `fallback_title`: 未识别到标题时使用的合成章节标题
    ///
    /// # 返回
    /// 非空的章节列表，任何输入都不会失败
    pub fn detect(&self, text: &str, fallback_title: &str) -> Vec<Chapter> {
        self.begin(text, fallback_title).finish()
    }

    /// 按固定批次大小分章（同步执行），结果与 `detect` 完全一致
    pub fn detect_batched(&self, text: &str, fallback_title: &str, batch_lines: usize) -> Vec<Chapter> {
        let batch_lines = batch_lines.max(1);
        let mut run = self.begin(text, fallback_title);
        while !run.is_done() {
            run.step(batch_lines);
        }
        run.finish()
    }
}

impl Default for ChapterDetector {
    fn default() -> Self {
        Self::new()
    }
}
