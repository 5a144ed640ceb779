//! 标签子模块
//!
//! 标签以逗号分隔的单个字符串存在 `history.tags` 中。按标签查询必须是
//! "整词"匹配：查 `a` 不能命中只带 `data` 标签的条目。

use std::collections::BTreeSet;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppError;

use super::history::query_items;
use super::{ClipboardStore, HistoryItem};

/// 规范化用户输入的标签：全角逗号转半角，去掉首尾空白和多余的逗号
fn normalize_tag(tag: &str) -> String {
    tag.replace('，', ",").trim().trim_matches(',').trim().to_string()
}

/// 把存储的标签串拆成去空白的 token 列表
pub(crate) fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
    tags.split([',', '，']).map(str::trim).filter(|t| !t.is_empty())
}

fn get_items_by_tag(conn: &Connection, tag: &str) -> Result<Vec<HistoryItem>, AppError> {
    let normalized = normalize_tag(tag);
    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    // SQL 只做子串粗筛，整词判断交给 split_tags，分隔符两侧的任意空白都能容忍
    let candidates = query_items(
        conn,
        "tags IS NOT NULL AND tags != '' AND instr(tags, ?) > 0",
        vec![Value::Text(normalized.clone())],
    )?;
    Ok(candidates
        .into_iter()
        .filter(|item| split_tags(&item.tags).any(|token| token == normalized))
        .collect())
}

fn get_all_tags(conn: &Connection) -> Result<Vec<String>, AppError> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT tags FROM history WHERE tags IS NOT NULL AND tags != ''")
        .map_err(|e| AppError::Database(format!("准备标签查询失败: {}", e)))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| AppError::Database(format!("查询标签失败: {}", e)))?;

    let mut all = BTreeSet::new();
    for row in rows {
        let tags = row.map_err(|e| AppError::Database(format!("读取标签失败: {}", e)))?;
        all.extend(split_tags(&tags).map(str::to_string));
    }
    Ok(all.into_iter().collect())
}

impl ClipboardStore {
    /// 覆盖条目的标签串；写入前统一为 `a, b, c` 形式
    pub fn set_item_tags(&self, id: i64, tags: &str) -> Result<bool, AppError> {
        let joined = split_tags(tags).collect::<Vec<_>>().join(", ");
        self.with_conn(|conn| {
            let changed = conn
                .execute("UPDATE history SET tags = ?1 WHERE id = ?2", params![joined, id])
                .map_err(|e| AppError::Database(format!("更新标签失败: {}", e)))?;
            Ok(changed > 0)
        })
    }

    pub fn get_item_tags(&self, id: i64) -> Result<String, AppError> {
        self.with_conn(|conn| {
            let tags: Option<Option<String>> = conn
                .query_row("SELECT tags FROM history WHERE id = ?1", params![id], |row| row.get(0))
                .optional()
                .map_err(|e| AppError::Database(format!("读取标签失败: {}", e)))?;
            Ok(tags.flatten().unwrap_or_default())
        })
    }

    /// 所有出现过的标签（去重、排序）
    pub fn get_all_tags(&self) -> Result<Vec<String>, AppError> {
        self.with_conn(get_all_tags)
    }

    pub fn get_items_by_tag(&self, tag: &str) -> Result<Vec<HistoryItem>, AppError> {
        self.with_conn(|conn| get_items_by_tag(conn, tag))
    }
}
