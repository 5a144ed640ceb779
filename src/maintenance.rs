//! 定期维护
//!
//! # 设计思路
//!
//! 后台线程按固定周期执行三项维护：
//! - 删除已过期的临时条目；
//! - 删除超过保留期的回收站条目；
//! - 每日自动备份（当天已备份则跳过）。
//!
//! 任何一项失败只记录日志，下个周期再试，线程不会因此退出。
//!
//! # 实现思路
//!
//! - 停止标志使用 `AtomicBool`，线程在两次维护之间用 `park_timeout` 等待，
//!   `stop()` 设置标志后 `unpark` 唤醒线程，因此不必等满一个周期。
//! - 启动后立即执行一次，之后每 `period` 执行一次。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::db::ClipboardStore;

pub const DEFAULT_MAINTENANCE_PERIOD: Duration = Duration::from_secs(60);

/// 单次维护的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_items: usize,
    pub expired_trash: usize,
    pub backup_ok: bool,
}

/// 执行一次维护
pub fn run_maintenance(store: &ClipboardStore) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();

    match store.cleanup_expired_items() {
        Ok(count) => report.expired_items = count,
        Err(e) => log::error!("清理过期临时条目失败: {}", e),
    }
    match store.cleanup_expired_trash() {
        Ok(count) => report.expired_trash = count,
        Err(e) => log::error!("清理过期回收站条目失败: {}", e),
    }
    match store.backup(None, false) {
        Ok(_) => report.backup_ok = true,
        Err(e) => log::error!("自动备份失败: {}", e),
    }

    if report.expired_items > 0 || report.expired_trash > 0 {
        log::info!(
            "维护完成: 过期条目 {} 个，过期回收站条目 {} 个",
            report.expired_items,
            report.expired_trash
        );
    }
    report
}

pub struct MaintenanceTimer {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MaintenanceTimer {
    pub fn start(store: Arc<ClipboardStore>, period: Duration) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = stop_flag.clone();

        let handle = thread::Builder::new()
            .name("smartclip-maintenance".to_string())
            .spawn(move || maintenance_loop(&store, period, &flag));

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("启动维护线程失败: {}", e);
                None
            }
        };
        Self { stop_flag, handle }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 通知线程退出并等待其结束
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("维护线程异常退出");
            }
        }
    }
}

impl Drop for MaintenanceTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn maintenance_loop(store: &ClipboardStore, period: Duration, stop_flag: &AtomicBool) {
    log::info!("维护线程已启动，周期 {}s", period.as_secs());
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            break;
        }
        run_maintenance(store);

        let deadline = Instant::now() + period;
        loop {
            if stop_flag.load(Ordering::SeqCst) {
                log::info!("维护线程已停止");
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
    log::info!("维护线程已停止");
}
