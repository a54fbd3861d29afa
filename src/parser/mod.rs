use serde::{Deserialize, Serialize};
use std::path::Path;

// 子模块声明
pub mod chapter_detector;
pub mod encoding;
pub mod line_classifier;
pub mod txt_parser;

/// 未知书名时使用的合成章节标题
pub const DEFAULT_FALLBACK_TITLE: &str = "全文";

/// 章节数据
///
/// 分章引擎的输出单元，按文档顺序排列，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// 章节标题（匹配到的标题行，或合成标题）
    pub title: String,
    /// 标题与下一标题之间的正文，按换行拼接并去除首尾空白
    pub content: String,
    /// 章节在原文中的起始行号（从 0 开始），仅用于诊断和排序
    pub start_line: usize,
}

impl Chapter {
    /// 打开一个尚未填充正文的章节
    pub fn open(title: impl Into<String>, start_line: usize) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            start_line,
        }
    }
}

/// 书籍
///
/// 由会话独占，重新导入时整体替换
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// 书名（文件名去掉扩展名）
    pub title: String,
    /// 解码后的完整文本
    pub content: String,
}

impl Book {
    /// 根据文件名和正文创建书籍
    pub fn from_file_name(file_name: &str, content: String) -> Self {
        Self {
            title: book_title_from_file_name(file_name),
            content,
        }
    }

    /// 分章使用的合成标题：书名为空时回退为 "全文"
    pub fn fallback_title(&self) -> &str {
        if self.title.trim().is_empty() {
            DEFAULT_FALLBACK_TITLE
        } else {
            &self.title
        }
    }
}

/// 解析结果
///
/// 一次分章调用同时产生书籍和章节列表
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub book: Book,
    /// 章节列表，保证非空
    pub chapters: Vec<Chapter>,
    /// 实际使用的文本编码名称
    pub encoding: String,
}

/// 从文件名推导书名
///
/// 去掉目录部分和末尾的 `.txt` 扩展名（不区分大小写）
pub fn book_title_from_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let split = name.len().saturating_sub(4);
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".txt") => stem.to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_title_strips_extension() {
        assert_eq!(book_title_from_file_name("斗破苍穹.txt"), "斗破苍穹");
        assert_eq!(book_title_from_file_name("Novel.TXT"), "Novel");
        assert_eq!(book_title_from_file_name("/books/长篇.txt"), "长篇");
    }

    #[test]
    fn test_book_title_keeps_other_extensions() {
        assert_eq!(book_title_from_file_name("notes.md"), "notes.md");
        assert_eq!(book_title_from_file_name("无扩展名"), "无扩展名");
    }

    #[test]
    fn test_fallback_title() {
        let book = Book::from_file_name("MyBook.txt", String::new());
        assert_eq!(book.fallback_title(), "MyBook");

        let unnamed = Book::from_file_name(".txt", String::new());
        assert_eq!(unnamed.fallback_title(), DEFAULT_FALLBACK_TITLE);
    }

    #[test]
    fn test_chapter_open() {
        let chapter = Chapter::open("第一章", 3);
        assert_eq!(chapter.title, "第一章");
        assert!(chapter.content.is_empty());
        assert_eq!(chapter.start_line, 3);
    }
}
