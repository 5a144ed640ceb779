//! 回收站子模块
//!
//! 软删除把条目的内容、图片、类型快照搬到 `deleted_history`，保留
//! `trash_retention_days` 天；恢复时重新插入为新条目（新 id、新时间戳），
//! 不复用原 id。两个方向都在单个事务内完成。

use chrono::Duration;
use rusqlite::{params, OptionalExtension};

use crate::error::AppError;

use super::{format_timestamp, now_local, ClipboardStore, ItemType, TrashEntry};

impl ClipboardStore {
    /// 移入回收站；条目不存在时返回 `false`
    pub fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let retention = self.config.trash_retention_days;
        self.with_transaction(|tx| {
            let item: Option<(Option<String>, Option<Vec<u8>>, ItemType)> = tx
                .query_row(
                    "SELECT content, image_data, type FROM history WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|e| AppError::Database(format!("读取待删除条目失败: {}", e)))?;

            let Some((content, image_data, item_type)) = item else {
                return Ok(false);
            };

            let now = now_local();
            tx.execute(
                "INSERT INTO deleted_history (original_id, content, image_data, type, deleted_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    content,
                    image_data,
                    item_type,
                    format_timestamp(now),
                    format_timestamp(now + Duration::days(retention)),
                ],
            ).map_err(|e| AppError::Database(format!("写入回收站失败: {}", e)))?;

            tx.execute("DELETE FROM history WHERE id = ?1", params![id])
                .map_err(|e| AppError::Database(format!("删除原条目失败: {}", e)))?;
            log::info!("条目 {} 已移入回收站", id);
            Ok(true)
        })
    }

    /// 从回收站恢复为新条目；回收站记录不存在时返回 `false`
    pub fn restore_item(&self, trash_id: i64) -> Result<bool, AppError> {
        self.with_transaction(|tx| {
            let entry: Option<(Option<String>, Option<Vec<u8>>, ItemType)> = tx
                .query_row(
                    "SELECT content, image_data, type FROM deleted_history WHERE id = ?1",
                    params![trash_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|e| AppError::Database(format!("读取回收站条目失败: {}", e)))?;

            let Some((content, image_data, item_type)) = entry else {
                return Ok(false);
            };

            tx.execute(
                "INSERT INTO history (content, image_data, type, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![content, image_data, item_type, format_timestamp(now_local())],
            ).map_err(|e| AppError::Database(format!("恢复条目失败: {}", e)))?;

            tx.execute("DELETE FROM deleted_history WHERE id = ?1", params![trash_id])
                .map_err(|e| AppError::Database(format!("删除回收站记录失败: {}", e)))?;
            Ok(true)
        })
    }

    /// 回收站列表，最近删除的在前
    pub fn get_deleted_items(&self) -> Result<Vec<TrashEntry>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, original_id, content, type, deleted_at, expires_at
                     FROM deleted_history ORDER BY deleted_at DESC, id DESC",
                )
                .map_err(|e| AppError::Database(format!("准备回收站查询失败: {}", e)))?;
            stmt.query_map([], |row| {
                Ok(TrashEntry {
                    id: row.get(0)?,
                    original_id: row.get(1)?,
                    content: row.get(2)?,
                    item_type: row.get(3)?,
                    deleted_at: row.get(4).unwrap_or(None),
                    expires_at: row.get(5).unwrap_or(None),
                })
            })
            .map_err(|e| AppError::Database(format!("查询回收站失败: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("读取回收站失败: {}", e)))
        })
    }

    pub fn empty_trash(&self) -> Result<usize, AppError> {
        self.with_conn(|conn| {
            let removed = conn
                .execute("DELETE FROM deleted_history", [])
                .map_err(|e| AppError::Database(format!("清空回收站失败: {}", e)))?;
            log::info!("回收站已清空 ({} 条)", removed);
            Ok(removed)
        })
    }

    /// 永久删除已过保留期的回收站记录
    pub fn cleanup_expired_trash(&self) -> Result<usize, AppError> {
        let now = format_timestamp(now_local());
        self.with_conn(|conn| {
            let removed = conn
                .execute("DELETE FROM deleted_history WHERE expires_at < ?1", params![now])
                .map_err(|e| AppError::Database(format!("清理过期回收站失败: {}", e)))?;
            if removed > 0 {
                log::info!("已永久删除 {} 条过期回收站记录", removed);
            }
            Ok(removed)
        })
    }
}
