// Novel Reader 核心
// TXT 小说的编码识别、章节切分、阅读进度与设置的持久化

pub mod autosave;
pub mod config;
pub mod error;
pub mod import;
pub mod parser;
pub mod search;
pub mod session;
pub mod storage;

#[cfg(test)]
mod integration_tests;

// 重新导出主要类型
pub use config::ReaderConfig;
pub use error::{ReaderError, Result};
pub use import::{ImportOutcome, ImportProgress, ImportStatus, Importer};
pub use parser::chapter_detector::ChapterDetector;
pub use parser::encoding::EncodingResolver;
pub use parser::line_classifier::{LineClass, LineClassifier};
pub use parser::txt_parser::TxtParser;
pub use parser::{Book, Chapter, ParseResult};
pub use search::SearchHit;
pub use session::{ReaderSession, RestoreOutcome};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
