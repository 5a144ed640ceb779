//! 片段子模块：可复用文本模板，按分类浏览

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

use crate::error::AppError;

use super::{format_timestamp, now_local, ClipboardStore, Snippet};

pub const DEFAULT_SNIPPET_CATEGORY: &str = "일반";
/// 分类过滤中表示"全部"的标签
const ALL_CATEGORIES: &str = "전체";

impl ClipboardStore {
    pub fn add_snippet(&self, name: &str, content: &str, shortcut: &str, category: &str) -> Result<i64, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("片段名称不能为空".to_string()));
        }
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snippets (name, content, shortcut, category, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, content, shortcut, category, format_timestamp(now_local())],
            ).map_err(|e| AppError::Database(format!("新增片段失败: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// `category` 为空或 "전체" 时返回全部片段
    pub fn get_snippets(&self, category: &str) -> Result<Vec<Snippet>, AppError> {
        let (clause, values) = if category.is_empty() || category == ALL_CATEGORIES {
            ("", Vec::new())
        } else {
            ("WHERE category = ?", vec![Value::Text(category.to_string())])
        };

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT id, name, content, shortcut, category FROM snippets {clause} ORDER BY id ASC"
                ))
                .map_err(|e| AppError::Database(format!("准备片段查询失败: {}", e)))?;
            stmt.query_map(params_from_iter(values), |row| {
                Ok(Snippet {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    content: row.get(2)?,
                    shortcut: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    category: row
                        .get::<_, Option<String>>(4)?
                        .unwrap_or_else(|| DEFAULT_SNIPPET_CATEGORY.to_string()),
                })
            })
            .map_err(|e| AppError::Database(format!("查询片段失败: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("读取片段失败: {}", e)))
        })
    }

    pub fn update_snippet(
        &self,
        id: i64,
        name: &str,
        content: &str,
        shortcut: &str,
        category: &str,
    ) -> Result<bool, AppError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE snippets SET name = ?1, content = ?2, shortcut = ?3, category = ?4 WHERE id = ?5",
                    params![name, content, shortcut, category, id],
                )
                .map_err(|e| AppError::Database(format!("更新片段失败: {}", e)))?;
            Ok(changed > 0)
        })
    }

    pub fn delete_snippet(&self, id: i64) -> Result<bool, AppError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute("DELETE FROM snippets WHERE id = ?1", params![id])
                .map_err(|e| AppError::Database(format!("删除片段失败: {}", e)))?;
            Ok(changed > 0)
        })
    }
}
