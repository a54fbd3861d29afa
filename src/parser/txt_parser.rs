use super::chapter_detector::ChapterDetector;
use super::encoding::EncodingResolver;
use super::line_classifier::{ClassifierOptions, LineClassifier};
use super::{Book, ParseResult};
use crate::config::ReaderConfig;
use crate::error::{ReaderError, Result};
use std::fs;
use std::path::Path;

/// TXT 解析器
///
/// 自动检测编码（UTF-8, GBK 等），解码后按标题规则分章
pub struct TxtParser {
    resolver: EncodingResolver,
    detector: ChapterDetector,
}

impl TxtParser {
    /// 使用默认规则创建解析器
    pub fn new() -> Self {
        Self {
            resolver: EncodingResolver::new(),
            detector: ChapterDetector::new(),
        }
    }

    /// 根据配置创建解析器
    pub fn from_config(config: &ReaderConfig) -> Result<Self> {
        let classifier = LineClassifier::with_options(&ClassifierOptions::from(config))?;
        Ok(Self::with_parts(
            EncodingResolver::new(),
            ChapterDetector::with_classifier(classifier),
        ))
    }

    pub fn with_parts(resolver: EncodingResolver, detector: ChapterDetector) -> Self {
        Self { resolver, detector }
    }

    pub fn resolver(&self) -> &EncodingResolver {
        &self.resolver
    }

    pub fn detector(&self) -> &ChapterDetector {
        &self.detector
    }

    /// 是否支持该文件（仅 .txt，不区分大小写）
    pub fn supports(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false)
    }

    /// 解析字节数据
    ///
    /// # 参数
    /// - `bytes`: 文件字节
    /// - `file_name`: 文件名，用于推导书名
    ///
    /// # 返回
    /// 书籍与非空的章节列表
    pub fn parse_bytes(&self, bytes: &[u8], file_name: &str) -> ParseResult {
        let decoded = self.resolver.resolve(bytes);
        self.parse_text(decoded.text, file_name, decoded.encoding)
    }

    /// 解析已解码的文本（例如从剪贴板粘贴）
    pub fn parse_text(&self, text: String, file_name: &str, encoding: String) -> ParseResult {
        let book = Book::from_file_name(file_name, text);
        let chapters = self.detector.detect(&book.content, book.fallback_title());

        ParseResult {
            book,
            chapters,
            encoding,
        }
    }

    /// 读取并解析文件
    pub fn parse_file(&self, file_path: &Path) -> Result<ParseResult> {
        if !self.supports(file_path) {
            return Err(ReaderError::UnsupportedFormat(
                file_path.display().to_string(),
            ));
        }

        let bytes = fs::read(file_path)?;
        let file_name = file_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        Ok(self.parse_bytes(&bytes, file_name))
    }
}

impl Default for TxtParser {
    fn default() -> Self {
        Self::new()
    }
}
