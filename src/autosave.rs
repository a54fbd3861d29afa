//! 后台保存任务
//!
//! 定期保存阅读进度，滚动停止后延迟保存滚动位置。
//! 两者都是尽力而为，失败只记录日志

use crate::session::ReaderSession;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// 共享的阅读会话
pub type SharedSession = Arc<Mutex<ReaderSession>>;

/// 后台任务句柄，丢弃时停止任务
pub struct AutosaveHandle {
    handle: JoinHandle<()>,
}

impl AutosaveHandle {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 按固定间隔保存阅读进度
pub fn spawn_autosave(session: SharedSession, interval: Duration) -> AutosaveHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即返回
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let saved = session.lock().await.save_progress();
            debug!("定时保存阅读进度: {}", saved);
        }
    });

    AutosaveHandle { handle }
}

/// 滚动位置上报器
///
/// 滚动时持续上报位置，停止滚动 `delay` 之后才写入存储
pub struct ScrollSaver {
    sender: mpsc::UnboundedSender<f64>,
    _task: AutosaveHandle,
}

impl ScrollSaver {
    pub fn spawn(session: SharedSession, delay: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_scroll_saver(session, receiver, delay));

        Self {
            sender,
            _task: AutosaveHandle { handle },
        }
    }

    /// 上报滚动位置
    pub fn scrolled(&self, position: f64) {
        // 任务已停止时忽略
        let _ = self.sender.send(position);
    }
}

async fn run_scroll_saver(
    session: SharedSession,
    mut receiver: mpsc::UnboundedReceiver<f64>,
    delay: Duration,
) {
    while let Some(position) = receiver.recv().await {
        session.lock().await.record_scroll(position);

        // 持续滚动时推迟保存
        loop {
            match tokio::time::timeout(delay, receiver.recv()).await {
                Ok(Some(position)) => session.lock().await.record_scroll(position),
                Ok(None) => {
                    session.lock().await.save_progress();
                    return;
                }
                Err(_) => {
                    session.lock().await.save_progress();
                    break;
                }
            }
        }
    }
}
