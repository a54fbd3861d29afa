// 集成测试：打开、阅读、保存、重新打开的完整流程

#[cfg(test)]
mod integration_tests {
    use crate::storage::records::{load_progress, CURRENT_BOOK_KEY, READING_PROGRESS_KEY};
    use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};
    use crate::{ReaderConfig, ReaderError, ReaderSession, RestoreOutcome};
    use encoding_rs::GBK;

    fn novel(chapters: usize) -> String {
        let mut text = String::from("序言：这是一本测试用的小说。\n\n");
        for c in 1..=chapters {
            text.push_str(&format!("第{}章 标题{}\n", c, c));
            text.push_str(&format!("正文内容{}。\n\n第二段正文。\n", c));
        }
        text
    }

    fn chunking_config() -> ReaderConfig {
        ReaderConfig {
            chunk_threshold_bytes: 128,
            chunk_chars: 50,
            ..ReaderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_open_gbk_file_and_navigate() {
        let mut session =
            ReaderSession::new(ReaderConfig::default(), Box::new(MemoryStore::new())).unwrap();
        let source = novel(3);
        let (bytes, _, _) = GBK.encode(&source);

        assert!(session.open_bytes(&bytes, "测试.txt", |_| {}).await);

        // 序言成为合成的第一章
        let chapters = session.chapters();
        assert_eq!(chapters.len(), 4);
        assert_eq!(chapters[0].title, "测试");
        assert_eq!(chapters[0].content, "序言：这是一本测试用的小说。");
        assert_eq!(chapters[1].title, "第1章 标题1");
        assert_eq!(chapters[1].content, "正文内容1。\n\n第二段正文。");

        session.load_chapter(2);
        assert_eq!(session.chapter_label(), "3 / 4");
        assert_eq!(session.progress_percent(), 75.0);
    }

    #[tokio::test]
    async fn test_progress_restored_when_reopening_same_book() {
        let mut session =
            ReaderSession::new(ReaderConfig::default(), Box::new(MemoryStore::new())).unwrap();
        session.open_text(novel(5), "长夜.txt", |_| {}).await;
        session.load_chapter(3);
        session.record_scroll(480.0);
        session.on_focus_lost();

        // 打开别的书时进度不适用
        session.open_text(novel(2), "短篇.txt", |_| {}).await;
        assert_eq!(session.current_index(), 0);

        session.load_chapter(1);
        session.open_text(novel(5), "长夜.txt", |_| {}).await;
        assert_eq!(session.current_index(), 0);

        session.load_chapter(4);
        session.record_scroll(96.0);
        session.save_progress();
        session.open_text(novel(5), "长夜.txt", |_| {}).await;
        assert_eq!(session.current_index(), 4);
        assert_eq!(session.scroll_position(), 96.0);
    }

    #[tokio::test]
    async fn test_progress_index_out_of_range_starts_at_first_chapter() {
        let mut session =
            ReaderSession::new(ReaderConfig::default(), Box::new(MemoryStore::new())).unwrap();
        session.open_text(novel(5), "书.txt", |_| {}).await;
        session.load_chapter(5);

        // 同名但章节变少
        session.open_text(novel(2), "书.txt", |_| {}).await;
        assert_eq!(session.current_index(), 0);
    }

    #[tokio::test]
    async fn test_restore_last_book_from_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reader.db");
        let text = novel(20);

        {
            let store = SqliteStore::open(&path).unwrap();
            let mut session = ReaderSession::new(chunking_config(), Box::new(store)).unwrap();
            session.open_text(text.clone(), "大部头.txt", |_| {}).await;
            session.load_chapter(7);
            session.record_scroll(33.0);
            session.on_visibility_lost();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get("currentBook.chunk.0").unwrap().is_some());

        let mut session = ReaderSession::new(chunking_config(), Box::new(store)).unwrap();
        let outcome = session.restore_last_book().await.unwrap();

        assert_eq!(
            outcome,
            RestoreOutcome::Restored {
                title: "大部头".to_string(),
                chapter_index: 7,
            }
        );
        assert_eq!(session.book().unwrap().content, text);
        assert_eq!(session.chapters().len(), 21);
        assert_eq!(session.scroll_position(), 33.0);
    }

    #[tokio::test]
    async fn test_restore_with_missing_chunk_fails_loudly() {
        let mut store = MemoryStore::new();
        {
            let mut session =
                ReaderSession::new(chunking_config(), Box::new(store.clone())).unwrap();
            session.open_text(novel(10), "残本.txt", |_| {}).await;

            // 取出会话写入的数据
            for key in [CURRENT_BOOK_KEY, READING_PROGRESS_KEY] {
                let value = session.store().get(key).unwrap().unwrap();
                store.set(key, &value).unwrap();
            }
            let mut i = 0;
            while let Some(chunk) = session
                .store()
                .get(&format!("{}.chunk.{}", CURRENT_BOOK_KEY, i))
                .unwrap()
            {
                if i != 2 {
                    store
                        .set(&format!("{}.chunk.{}", CURRENT_BOOK_KEY, i), &chunk)
                        .unwrap();
                }
                i += 1;
            }
            assert!(i > 3);
        }

        let mut session = ReaderSession::new(chunking_config(), Box::new(store)).unwrap();
        let err = session.restore_last_book().await.unwrap_err();

        assert!(matches!(
            err,
            ReaderError::PersistedContentIncomplete { missing_chunk: 2, .. }
        ));
        assert!(err.requires_reselect());
        assert!(session.book().is_none());
    }

    #[tokio::test]
    async fn test_quota_fallback_restores_metadata_only() {
        let text = novel(30);
        let mut session = ReaderSession::new(
            chunking_config(),
            Box::new(MemoryStore::with_quota(600)),
        )
        .unwrap();

        assert!(session.open_text(text, "巨著.txt", |_| {}).await);
        assert_eq!(session.chapters().len(), 31);
        assert!(load_progress(session.store()).is_some());

        let outcome = session.restore_last_book().await.unwrap();
        assert_eq!(
            outcome,
            RestoreOutcome::MetadataOnly {
                title: "巨著".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_restore_with_empty_store() {
        let mut session =
            ReaderSession::new(ReaderConfig::default(), Box::new(MemoryStore::new())).unwrap();
        assert_eq!(
            session.restore_last_book().await.unwrap(),
            RestoreOutcome::Nothing
        );
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let mut first =
            ReaderSession::new(ReaderConfig::default(), Box::new(MemoryStore::new())).unwrap();
        let mut second =
            ReaderSession::new(ReaderConfig::default(), Box::new(MemoryStore::new())).unwrap();

        first.open_text(novel(3), "甲.txt", |_| {}).await;
        second.open_text(novel(6), "乙.txt", |_| {}).await;
        first.change_font_size(4);

        assert_eq!(first.chapters().len(), 4);
        assert_eq!(second.chapters().len(), 7);
        assert_eq!(second.settings().font_size, 16);
    }
}
