//! 数据库文件管理子模块
//!
//! ## 职责
//! - 查询当前数据库路径与文件大小
//! - 在线备份（SQLite backup API，写入进行中也安全）
//! - 每日自动备份与旧备份清理
//!
//! ## 自动备份约定
//! - 文件名 `clipboard_history_YYYYMMDD.db`，位于 `StoreConfig::backup_dir`
//! - 当天文件已存在且未强制时跳过
//! - 只保留最新的 `backup_retention` 个自动备份；显式指定目标路径的备份不参与清理
//!
//! ## 错误语义
//! - 目录与文件操作失败映射为 `AppError::Storage`，备份 API 失败映射为 `AppError::Database`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::AppError;

use super::{now_local, ClipboardStore};

const AUTO_BACKUP_PREFIX: &str = "clipboard_history_";
const AUTO_BACKUP_EXT: &str = ".db";
/// 每步复制的页数；步间让出锁给其他连接
const BACKUP_PAGES_PER_STEP: std::os::raw::c_int = 256;

#[derive(Debug, Clone, Serialize)]
pub struct DbInfo {
    pub path: String,
    pub size: u64,
}

fn build_db_info(path: &Path) -> DbInfo {
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    DbInfo {
        path: path.to_string_lossy().to_string(),
        size,
    }
}

fn auto_backup_path(backup_dir: &Path) -> PathBuf {
    let day = now_local().format("%Y%m%d");
    backup_dir.join(format!("{AUTO_BACKUP_PREFIX}{day}{AUTO_BACKUP_EXT}"))
}

fn is_auto_backup(name: &str) -> bool {
    name.starts_with(AUTO_BACKUP_PREFIX) && name.ends_with(AUTO_BACKUP_EXT)
}

fn copy_to(conn: &Connection, target: &Path) -> Result<(), AppError> {
    let mut dest = Connection::open(target)
        .map_err(|e| AppError::Database(format!("打开备份目标失败: {}", e)))?;
    let backup = Backup::new(conn, &mut dest)
        .map_err(|e| AppError::Database(format!("初始化备份失败: {}", e)))?;
    backup
        .run_to_completion(BACKUP_PAGES_PER_STEP, Duration::from_millis(10), None)
        .map_err(|e| AppError::Database(format!("执行备份失败: {}", e)))
}

/// 按文件名排序（日期在名中，字典序即时间序），删除超出保留数的最旧备份
fn prune_auto_backups(backup_dir: &Path, keep: usize) -> Result<usize, AppError> {
    let mut backups: Vec<String> = fs::read_dir(backup_dir)
        .map_err(|e| AppError::Storage(format!("读取备份目录失败: {}", e)))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_auto_backup(name))
        .collect();

    if backups.len() <= keep {
        return Ok(0);
    }
    backups.sort();

    let excess = backups.len() - keep;
    let mut removed = 0;
    for name in backups.into_iter().take(excess) {
        match fs::remove_file(backup_dir.join(&name)) {
            Ok(()) => {
                log::info!("已删除旧备份: {}", name);
                removed += 1;
            }
            Err(e) => log::warn!("删除旧备份失败 {}: {}", name, e),
        }
    }
    Ok(removed)
}

impl ClipboardStore {
    pub fn db_info(&self) -> DbInfo {
        build_db_info(&self.config.db_path)
    }

    /// 在线备份数据库，返回备份文件路径
    ///
    /// `target` 为 `None` 时执行每日自动备份；当天已有备份且 `force == false` 时
    /// 直接返回已存在的文件路径。
    pub fn backup(&self, target: Option<&Path>, force: bool) -> Result<PathBuf, AppError> {
        let backup_dir = &self.config.backup_dir;
        let (path, is_auto) = match target {
            Some(path) => (path.to_path_buf(), false),
            None => (auto_backup_path(backup_dir), true),
        };

        if is_auto && path.exists() && !force {
            log::debug!("今日备份已存在，跳过: {}", path.display());
            return Ok(path);
        }

        let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Storage(format!("创建备份目录失败: {}", e)))?;

        self.with_conn(|conn| copy_to(conn, &path))
            .inspect_err(|e| log::error!("备份失败: {}", e))?;
        log::info!("数据库备份完成: {}", path.display());

        if is_auto {
            prune_auto_backups(backup_dir, self.config.backup_retention)?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rusqlite::Connection;

    use super::{is_auto_backup, prune_auto_backups};
    use crate::db::test_support::unique_temp_dir;
    use crate::db::{ClipboardStore, ItemType, StoreConfig};

    fn history_rows(path: &std::path::Path) -> i64 {
        let conn = Connection::open(path).expect("open backup");
        conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))
            .expect("count backup rows")
    }

    fn file_store(prefix: &str) -> (ClipboardStore, std::path::PathBuf) {
        let dir = unique_temp_dir(prefix);
        let store = ClipboardStore::open(StoreConfig::from_app_dir(&dir)).expect("open file store");
        (store, dir)
    }

    #[test]
    fn explicit_backup_is_readable_copy() {
        let (store, dir) = file_store("smartclip-backup-explicit");
        store.add_item(Some("backed up"), None, ItemType::Text).expect("add");

        let target = dir.join("manual").join("copy.db");
        let written = store.backup(Some(&target), false).expect("backup");
        assert_eq!(written, target);

        let copy = Connection::open(&target).expect("open copy");
        let content: String = copy
            .query_row("SELECT content FROM history", [], |row| row.get(0))
            .expect("read copy");
        assert_eq!(content, "backed up");

        drop(store);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn daily_backup_skips_existing_unless_forced() {
        let (store, dir) = file_store("smartclip-backup-daily");

        let first = store.backup(None, false).expect("first backup");
        assert!(first.starts_with(dir.join("backups")));
        let name = first.file_name().and_then(|n| n.to_str()).expect("file name");
        assert!(is_auto_backup(name));

        store.add_item(Some("after first backup"), None, ItemType::Text).expect("add");
        store.backup(None, false).expect("skipped backup");
        assert_eq!(history_rows(&first), 0, "existing daily backup must not be rewritten");

        store.backup(None, true).expect("forced backup");
        assert_eq!(history_rows(&first), 1);

        drop(store);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn prune_keeps_newest_auto_backups_only() {
        let dir = unique_temp_dir("smartclip-backup-prune");
        for day in 1..=9 {
            fs::write(dir.join(format!("clipboard_history_202601{day:02}.db")), b"x").expect("write");
        }
        fs::write(dir.join("manual.db"), b"x").expect("write manual");

        assert_eq!(prune_auto_backups(&dir, 7).expect("prune"), 2);

        assert!(!dir.join("clipboard_history_20260101.db").exists());
        assert!(!dir.join("clipboard_history_20260102.db").exists());
        assert!(dir.join("clipboard_history_20260103.db").exists());
        assert!(dir.join("manual.db").exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn db_info_reports_configured_path() {
        let (store, dir) = file_store("smartclip-db-info");
        let info = store.db_info();
        assert!(info.path.ends_with("clipboard_history_v6.db"));
        drop(store);
        let _ = fs::remove_dir_all(dir);
    }
}
