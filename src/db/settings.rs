//! 设置子模块
//!
//! `settings` 表是简单的 key → value 字符串映射。类型化访问器负责默认值与
//! 边界：存储值缺失或无法解析时回退默认值，不向调用方报错。

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::ClipboardStore;

pub const DEFAULT_THEME: &str = "dark";
pub const DEFAULT_MAX_HISTORY: i64 = 100;
pub const MIN_MAX_HISTORY: i64 = 10;
pub const MAX_MAX_HISTORY: i64 = 500;

const KEY_THEME: &str = "theme";
const KEY_MAX_HISTORY: &str = "max_history";
const KEY_HOTKEYS: &str = "hotkeys";
const KEY_VAULT_SALT: &str = "vault_salt";
const KEY_VAULT_VERIFICATION: &str = "vault_verification";

fn default_show_main() -> String {
    "ctrl+shift+v".to_string()
}

fn default_show_mini() -> String {
    "alt+v".to_string()
}

fn default_paste_last() -> String {
    "ctrl+shift+z".to_string()
}

/// 全局快捷键绑定；存储的 JSON 缺字段时逐项补默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotkeys {
    #[serde(default = "default_show_main")]
    pub show_main: String,
    #[serde(default = "default_show_mini")]
    pub show_mini: String,
    #[serde(default = "default_paste_last")]
    pub paste_last: String,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            show_main: default_show_main(),
            show_mini: default_show_mini(),
            paste_last: default_paste_last(),
        }
    }
}

/// 解析并夹紧历史上限
pub(crate) fn parse_max_history(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_MAX_HISTORY)
        .clamp(MIN_MAX_HISTORY, MAX_MAX_HISTORY)
}

fn parse_hotkeys(raw: Option<&str>) -> Hotkeys {
    match raw {
        Some(json) => serde_json::from_str(json).unwrap_or_else(|e| {
            log::warn!("快捷键设置格式错误，使用默认值: {}", e);
            Hotkeys::default()
        }),
        None => Hotkeys::default(),
    }
}

impl ClipboardStore {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
                .optional()
                .map_err(|e| AppError::Database(format!("读取设置失败: {}", e)))
        })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, value],
            ).map_err(|e| AppError::Database(format!("保存设置失败: {}", e)))?;
            Ok(())
        })
    }

    pub fn theme(&self) -> Result<String, AppError> {
        Ok(self
            .get_setting(KEY_THEME)?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THEME.to_string()))
    }

    pub fn set_theme(&self, theme: &str) -> Result<(), AppError> {
        self.set_setting(KEY_THEME, theme)
    }

    /// 未置顶条目上限，始终落在 `10..=500`
    pub fn max_history(&self) -> Result<i64, AppError> {
        Ok(parse_max_history(self.get_setting(KEY_MAX_HISTORY)?.as_deref()))
    }

    pub fn set_max_history(&self, value: i64) -> Result<(), AppError> {
        self.set_setting(KEY_MAX_HISTORY, &value.clamp(MIN_MAX_HISTORY, MAX_MAX_HISTORY).to_string())
    }

    pub fn hotkeys(&self) -> Result<Hotkeys, AppError> {
        Ok(parse_hotkeys(self.get_setting(KEY_HOTKEYS)?.as_deref()))
    }

    pub fn set_hotkeys(&self, hotkeys: &Hotkeys) -> Result<(), AppError> {
        let json = serde_json::to_string(hotkeys)
            .map_err(|e| AppError::Config(format!("序列化快捷键失败: {}", e)))?;
        self.set_setting(KEY_HOTKEYS, &json)
    }

    pub fn vault_salt(&self) -> Result<Option<String>, AppError> {
        self.get_setting(KEY_VAULT_SALT)
    }

    pub fn set_vault_salt(&self, salt: &str) -> Result<(), AppError> {
        self.set_setting(KEY_VAULT_SALT, salt)
    }

    pub fn vault_verification(&self) -> Result<Option<String>, AppError> {
        self.get_setting(KEY_VAULT_VERIFICATION)
    }

    pub fn set_vault_verification(&self, token: &str) -> Result<(), AppError> {
        self.set_setting(KEY_VAULT_VERIFICATION, token)
    }
}
