//! 存储配置子模块
//!
//! `StoreConfig` 在进程启动时构造一次，之后按引用传给存储、维护定时器等组件，
//! 取代模块级的全局数据库单例。
//!
//! 应用目录下可选的 `config.json` 只能覆盖数据库目录；文件缺失或格式错误时
//! 静默回退到默认值。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DB_FILE_NAME: &str = "clipboard_history_v6.db";
const CONFIG_FILE_NAME: &str = "config.json";

/// 每 N 次成功插入执行一次容量淘汰
pub const DEFAULT_CLEANUP_INTERVAL: u32 = 10;
/// 每 N 次容量淘汰执行一次 VACUUM
pub const DEFAULT_COMPACTION_INTERVAL: u32 = 50;
pub const DEFAULT_MAX_IMAGE_HISTORY: i64 = 20;
pub const DEFAULT_TRASH_RETENTION_DAYS: i64 = 7;
pub const DEFAULT_BACKUP_RETENTION: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbConfig {
    #[serde(default)]
    db_dir: Option<String>,
}

/// 存储实例配置
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 数据库文件路径
    pub db_path: PathBuf,
    /// 自动备份目录
    pub backup_dir: PathBuf,
    pub cleanup_interval: u32,
    pub compaction_interval: u32,
    /// 未置顶图片条目上限
    pub max_image_history: i64,
    pub trash_retention_days: i64,
    /// 自动备份保留个数
    pub backup_retention: usize,
}

impl StoreConfig {
    /// 以应用数据目录为根构造默认配置
    pub fn from_app_dir(app_dir: &Path) -> Self {
        Self {
            db_path: app_dir.join(DB_FILE_NAME),
            backup_dir: app_dir.join("backups"),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            compaction_interval: DEFAULT_COMPACTION_INTERVAL,
            max_image_history: DEFAULT_MAX_IMAGE_HISTORY,
            trash_retention_days: DEFAULT_TRASH_RETENTION_DAYS,
            backup_retention: DEFAULT_BACKUP_RETENTION,
        }
    }

    /// 读取 `app_dir/config.json` 并解析出最终配置
    pub fn load(app_dir: &Path) -> Result<Self, AppError> {
        let db_config = load_db_config_from_path(&app_dir.join(CONFIG_FILE_NAME));
        let mut config = Self::from_app_dir(app_dir);
        config.db_path = resolve_db_path_from_config(app_dir, &db_config)?;
        Ok(config)
    }
}

fn load_db_config_from_path(config_path: &Path) -> DbConfig {
    if config_path.exists() {
        if let Ok(content) = fs::read_to_string(config_path) {
            if let Ok(config) = serde_json::from_str(&content) {
                return config;
            }
            log::warn!("配置文件格式错误，使用默认数据库目录: {}", config_path.display());
        }
    }
    DbConfig { db_dir: None }
}

fn resolve_db_path_from_config(app_data_dir: &Path, config: &DbConfig) -> Result<PathBuf, AppError> {
    if let Some(ref dir) = config.db_dir {
        if !dir.is_empty() {
            let dir_path = PathBuf::from(dir);
            fs::create_dir_all(&dir_path).map_err(|e| {
                AppError::Storage(format!("创建数据库目录失败: {}", e))
            })?;
            return Ok(dir_path.join(DB_FILE_NAME));
        }
    }
    Ok(app_data_dir.join(DB_FILE_NAME))
}
