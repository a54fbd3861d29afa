use crate::parser::Chapter;
use serde::{Deserialize, Serialize};

/// 预览中关键词两侧保留的字符数
const PREVIEW_CONTEXT_CHARS: usize = 30;

/// 搜索结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub chapter_index: usize,
    pub chapter_title: String,
    /// 在章节正文中的行号（从 0 开始）
    pub line_index: usize,
    /// 去除首尾空白的整行
    pub line: String,
    /// 关键词附近的片段，被截断的一侧加 `...`
    pub preview: String,
}

/// 在所有章节正文中逐行查找关键词（不区分大小写）
///
/// 结果按文档顺序排列；空关键词不返回结果
pub fn search(chapters: &[Chapter], query: &str) -> Vec<SearchHit> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();

    let mut hits = Vec::new();
    for (chapter_index, chapter) in chapters.iter().enumerate() {
        for (line_index, line) in chapter.content.split('\n').enumerate() {
            if let Some(preview) = preview_for(line, &needle) {
                hits.push(SearchHit {
                    chapter_index,
                    chapter_title: chapter.title.clone(),
                    line_index,
                    line: line.trim().to_string(),
                    preview,
                });
            }
        }
    }
    hits
}

/// 找到关键词时返回预览片段
fn preview_for(line: &str, needle: &[char]) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();

    // 小写化后的字符及其在原行中的位置
    let mut lowered = Vec::with_capacity(chars.len());
    let mut origin = Vec::with_capacity(chars.len());
    for (i, c) in chars.iter().enumerate() {
        for lc in c.to_lowercase() {
            lowered.push(lc);
            origin.push(i);
        }
    }

    let pos = lowered
        .windows(needle.len())
        .position(|window| window == needle)?;

    let match_start = origin[pos];
    let match_end = origin[pos + needle.len() - 1] + 1;
    let start = match_start.saturating_sub(PREVIEW_CONTEXT_CHARS);
    let end = (match_end + PREVIEW_CONTEXT_CHARS).min(chars.len());

    let mut preview = String::new();
    if start > 0 {
        preview.push_str("...");
    }
    preview.extend(&chars[start..end]);
    if end < chars.len() {
        preview.push_str("...");
    }
    Some(preview)
}
