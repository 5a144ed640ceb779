//! 集合子模块
//!
//! 条目通过 `collection_id` 弱引用集合；删除集合只解除引用，不删除条目。

use rusqlite::types::Value;
use rusqlite::params;

use crate::error::AppError;

use super::history::query_items;
use super::{format_timestamp, now_local, ClipboardStore, Collection, HistoryItem};

pub const DEFAULT_COLLECTION_ICON: &str = "📁";
pub const DEFAULT_COLLECTION_COLOR: &str = "#6366f1";

impl ClipboardStore {
    pub fn add_collection(&self, name: &str, icon: &str, color: &str) -> Result<i64, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("集合名称不能为空".to_string()));
        }
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collections (name, icon, color, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![name.trim(), icon, color, format_timestamp(now_local())],
            ).map_err(|e| AppError::Database(format!("新增集合失败: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// 按名称排序的全部集合
    pub fn get_collections(&self) -> Result<Vec<Collection>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, icon, color, created_at FROM collections ORDER BY name")
                .map_err(|e| AppError::Database(format!("准备集合查询失败: {}", e)))?;
            stmt.query_map([], |row| {
                Ok(Collection {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    icon: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| DEFAULT_COLLECTION_ICON.to_string()),
                    color: row.get::<_, Option<String>>(3)?.unwrap_or_else(|| DEFAULT_COLLECTION_COLOR.to_string()),
                    created_at: row.get(4).unwrap_or(None),
                })
            })
            .map_err(|e| AppError::Database(format!("查询集合失败: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("读取集合失败: {}", e)))
        })
    }

    pub fn update_collection(&self, id: i64, name: &str, icon: &str, color: &str) -> Result<bool, AppError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE collections SET name = ?1, icon = ?2, color = ?3 WHERE id = ?4",
                    params![name, icon, color, id],
                )
                .map_err(|e| AppError::Database(format!("更新集合失败: {}", e)))?;
            Ok(changed > 0)
        })
    }

    /// 删除集合并在同一事务内解除所有条目的引用
    pub fn delete_collection(&self, id: i64) -> Result<bool, AppError> {
        self.with_transaction(|tx| {
            let detached = tx
                .execute("UPDATE history SET collection_id = NULL WHERE collection_id = ?1", params![id])
                .map_err(|e| AppError::Database(format!("解除集合引用失败: {}", e)))?;
            let removed = tx
                .execute("DELETE FROM collections WHERE id = ?1", params![id])
                .map_err(|e| AppError::Database(format!("删除集合失败: {}", e)))?;
            log::debug!("删除集合 {}，解除 {} 个条目", id, detached);
            Ok(removed > 0)
        })
    }

    /// 把条目移入集合；`None` 表示移出
    pub fn assign_to_collection(&self, item_id: i64, collection_id: Option<i64>) -> Result<bool, AppError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE history SET collection_id = ?1 WHERE id = ?2",
                    params![collection_id, item_id],
                )
                .map_err(|e| AppError::Database(format!("分配集合失败: {}", e)))?;
            Ok(changed > 0)
        })
    }

    pub fn get_items_by_collection(&self, collection_id: i64) -> Result<Vec<HistoryItem>, AppError> {
        self.with_conn(|conn| query_items(conn, "collection_id = ?", vec![Value::Integer(collection_id)]))
    }
}
