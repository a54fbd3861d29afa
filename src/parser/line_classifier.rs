use crate::config::ReaderConfig;
use crate::error::{ReaderError, Result};
use regex::Regex;

/// 行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// 空行或分隔线
    Blank,
    /// 章节标题
    Heading,
    /// 正文
    Body,
}

/// 分类器选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierOptions {
    /// 是否启用纯数字编号标题（`1. xxx`、`12 xxx`）
    pub numbered_headings: bool,
    /// 追加的自定义标题正则
    pub extra_patterns: Vec<String>,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            numbered_headings: true,
            extra_patterns: Vec::new(),
        }
    }
}

impl From<&ReaderConfig> for ClassifierOptions {
    fn from(config: &ReaderConfig) -> Self {
        Self {
            numbered_headings: config.numbered_headings,
            extra_patterns: config.extra_heading_patterns.clone(),
        }
    }
}

/// 中文数字或阿拉伯数字
const NUMERAL: &str = "[一二三四五六七八九十零〇百千万0-9]";

/// 行分类器
///
/// 按顺序匹配标题规则表，任一规则命中即为标题。
/// 所有规则都从行首锚定并匹配到行尾，判断的是整行而非子串。
/// 无状态，可在多次分章之间复用。
pub struct LineClassifier {
    /// 空行/分隔线匹配模式
    blank_patterns: Vec<Regex>,
    /// 章节标题匹配模式列表
    heading_patterns: Vec<Regex>,
}

impl LineClassifier {
    /// 使用默认规则创建分类器
    pub fn new() -> Self {
        Self::build(&ClassifierOptions::default(), Vec::new())
    }

    /// 根据选项创建分类器
    ///
    /// 自定义正则无效时返回配置错误
    pub fn with_options(options: &ClassifierOptions) -> Result<Self> {
        let extra = options
            .extra_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| ReaderError::Config(format!("无效的标题正则 {}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::build(options, extra))
    }

    fn build(options: &ClassifierOptions, extra: Vec<Regex>) -> Self {
        let blank_patterns = vec![
            // 分隔线
            Regex::new(r"^-+$").unwrap(),
            // 空行
            Regex::new(r"^\s*$").unwrap(),
            // 全角空格行
            Regex::new(r"^[　\s]*$").unwrap(),
        ];

        let mut sources = vec![
            // "第一卷 第1章" 格式
            format!(r"^第{NUMERAL}+卷\s+第[0-9]+章.*$"),
            // "第X卷 ... 第Y章" 变体
            format!(r"^第{NUMERAL}+卷.*第[0-9]+章.*$"),
            // 传统章节格式
            format!(r"^第{NUMERAL}+章.*$"),
            r"^第[0-9]+章.*$".to_string(),
            // 回、篇、节
            format!(r"^第{NUMERAL}+[回篇节].*$"),
            // 英文章节
            r"(?i)^Chapter\s*[0-9]+.*$".to_string(),
            // 列表式编号 "一、" "3."
            format!(r"^{NUMERAL}+\s*[.、].*$"),
        ];

        if options.numbered_headings {
            // 纯数字编号，会误判正文中的 "3. 买牛奶" 之类
            sources.push(r"^[0-9]+[.\s].*$".to_string());
        }

        // 前面带中文前缀的章节标题
        sources.push(r"^[\u{4e00}-\u{9fa5}]*第[0-9]+章.*$".to_string());

        let mut heading_patterns: Vec<Regex> = sources
            .iter()
            .map(|s| Regex::new(s).unwrap())
            .collect();
        heading_patterns.extend(extra);

        Self {
            blank_patterns,
            heading_patterns,
        }
    }

    /// 对一行（已去除首尾空白）分类
    ///
    /// # 参数
    /// - `line`: 已 trim 的行文本
    ///
    /// # 返回
    /// 行类型
    pub fn classify(&self, line: &str) -> LineClass {
        if self.is_blank(line) {
            LineClass::Blank
        } else if self.is_heading(line) {
            LineClass::Heading
        } else {
            LineClass::Body
        }
    }

    /// 是否为空行或分隔线
    pub fn is_blank(&self, line: &str) -> bool {
        self.blank_patterns.iter().any(|p| p.is_match(line))
    }

    /// 是否匹配任一标题规则
    pub fn is_heading(&self, line: &str) -> bool {
        self.heading_patterns.iter().any(|p| p.is_match(line))
    }

    /// 标题规则数量
    pub fn heading_rule_count(&self) -> usize {
        self.heading_patterns.len()
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines() {
        let classifier = LineClassifier::new();

        assert_eq!(classifier.classify(""), LineClass::Blank);
        assert_eq!(classifier.classify("   "), LineClass::Blank);
        assert_eq!(classifier.classify("　　"), LineClass::Blank);
        assert_eq!(classifier.classify("-----"), LineClass::Blank);
        assert_eq!(classifier.classify("-"), LineClass::Blank);
    }

    #[test]
    fn test_volume_chapter_headings() {
        let classifier = LineClassifier::new();

        assert_eq!(classifier.classify("第一卷 第1章 拜师"), LineClass::Heading);
        assert_eq!(classifier.classify("第二卷风云再起第12章"), LineClass::Heading);
        assert_eq!(classifier.classify("第3卷　第45章 归来"), LineClass::Heading);
    }

    #[test]
    fn test_chapter_headings() {
        let classifier = LineClassifier::new();

        assert_eq!(classifier.classify("第一章 开始"), LineClass::Heading);
        assert_eq!(classifier.classify("第1章"), LineClass::Heading);
        assert_eq!(classifier.classify("第一百零八章 聚义"), LineClass::Heading);
        assert_eq!(classifier.classify("第〇章 序"), LineClass::Heading);
    }

    #[test]
    fn test_alternate_unit_headings() {
        let classifier = LineClassifier::new();

        assert_eq!(classifier.classify("第三回 大闹天宫"), LineClass::Heading);
        assert_eq!(classifier.classify("第二篇 总论"), LineClass::Heading);
        assert_eq!(classifier.classify("第5节"), LineClass::Heading);
        // "|" 不是单位字
        assert_eq!(classifier.classify("第五|"), LineClass::Body);
    }

    #[test]
    fn test_latin_chapter_headings() {
        let classifier = LineClassifier::new();

        assert_eq!(classifier.classify("Chapter 1"), LineClass::Heading);
        assert_eq!(classifier.classify("CHAPTER 12: The End"), LineClass::Heading);
        assert_eq!(classifier.classify("chapter3"), LineClass::Heading);
        assert_eq!(classifier.classify("Chapters are fun"), LineClass::Body);
    }

    #[test]
    fn test_enumerated_headings() {
        let classifier = LineClassifier::new();

        assert_eq!(classifier.classify("一、缘起"), LineClass::Heading);
        assert_eq!(classifier.classify("十二. 终局"), LineClass::Heading);
        assert_eq!(classifier.classify("3. Buy milk"), LineClass::Heading);
        assert_eq!(classifier.classify("42 号房间"), LineClass::Heading);
    }

    #[test]
    fn test_prefixed_chapter_heading() {
        let classifier = LineClassifier::new();

        assert_eq!(classifier.classify("正文第12章 风起"), LineClass::Heading);
        assert_eq!(classifier.classify("卷一第3章"), LineClass::Heading);
    }

    #[test]
    fn test_body_lines() {
        let classifier = LineClassifier::new();

        assert_eq!(classifier.classify("这是第一章的内容。"), LineClass::Body);
        assert_eq!(classifier.classify("他说：第一次见面。"), LineClass::Body);
        assert_eq!(classifier.classify("just some prose"), LineClass::Body);
        assert_eq!(classifier.classify("2024年的春天"), LineClass::Body);
    }

    #[test]
    fn test_numbered_headings_can_be_disabled() {
        let options = ClassifierOptions {
            numbered_headings: false,
            extra_patterns: Vec::new(),
        };
        let classifier = LineClassifier::with_options(&options).unwrap();

        assert_eq!(classifier.classify("42 号房间"), LineClass::Body);
        // 带 "." 的仍被列表式编号规则识别
        assert_eq!(classifier.classify("3. Buy milk"), LineClass::Heading);
        assert_eq!(
            classifier.heading_rule_count(),
            LineClassifier::new().heading_rule_count() - 1
        );
    }

    #[test]
    fn test_extra_patterns() {
        let options = ClassifierOptions {
            numbered_headings: true,
            extra_patterns: vec![r"^(?i)prologue$".to_string()],
        };
        let classifier = LineClassifier::with_options(&options).unwrap();

        assert_eq!(classifier.classify("Prologue"), LineClass::Heading);
        assert_eq!(LineClassifier::new().classify("Prologue"), LineClass::Body);
    }

    #[test]
    fn test_invalid_extra_pattern() {
        let options = ClassifierOptions {
            numbered_headings: true,
            extra_patterns: vec!["(".to_string()],
        };
        assert!(matches!(
            LineClassifier::with_options(&options),
            Err(ReaderError::Config(_))
        ));
    }
}
