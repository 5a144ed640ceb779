//! # 智能剪贴板无界面入口
//!
//! 从标准输入逐行读取文本，当作剪贴板内容送入捕获流水线，
//! 把捕获结果和异步动作事件以 JSON 行输出到标准输出。
//! 平台剪贴板监听由宿主应用提供，这里只用于脚本化使用与排查。
//!
//! 数据目录取自 `SMARTCLIP_DATA_DIR`，未设置时使用当前目录下的 `smartclip-data`。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use smartclip_core::capture::CapturePipeline;
use smartclip_core::db::{ClipboardStore, StoreConfig};
use smartclip_core::error::AppError;
use smartclip_core::maintenance::{MaintenanceTimer, DEFAULT_MAINTENANCE_PERIOD};
use smartclip_core::rules::EngineConfig;

const DATA_DIR_ENV: &str = "SMARTCLIP_DATA_DIR";
/// 输入结束后等待未完成标题抓取的最长时间
const DRAIN_TIMEOUT: Duration = Duration::from_secs(6);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("smartclip-data"))
}

fn emit<T: Serialize>(out: &mut impl Write, value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => {
            if let Err(e) = writeln!(out, "{}", line) {
                log::warn!("写入输出失败: {}", e);
            }
        }
        Err(e) => log::warn!("序列化输出失败: {}", e),
    }
}

fn run() -> Result<(), AppError> {
    let app_dir = data_dir();
    let config = StoreConfig::load(&app_dir)?;
    let store = Arc::new(ClipboardStore::open(config)?);
    let info = store.db_info();
    log::info!("数据目录: {}，数据库: {} ({} 字节)", app_dir.display(), info.path, info.size);

    let maintenance = MaintenanceTimer::start(store.clone(), DEFAULT_MAINTENANCE_PERIOD);
    let mut pipeline = CapturePipeline::new(store, &EngineConfig::default())?;

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        match pipeline.capture_text(&line) {
            Ok(Some(result)) => emit(&mut out, &result),
            Ok(None) => {}
            Err(e) => log::error!("保存剪贴板内容失败: {}", e),
        }
        for event in pipeline.drain_events() {
            emit(&mut out, &event);
        }
    }

    while pipeline.engine_mut().pending_fetches() > 0 {
        match pipeline.wait_event(DRAIN_TIMEOUT) {
            Some(event) => emit(&mut out, &event),
            None => break,
        }
    }

    pipeline.shutdown(SHUTDOWN_TIMEOUT);
    maintenance.stop();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("运行失败: {}", e);
        std::process::exit(1);
    }
}
