//! 规则表子模块
//!
//! 复制规则（`copy_rules`）与动作规则（`clipboard_actions`）的持久化。这里只存取
//! 原始字符串；动作类型和参数的解析在 `crate::rules` 中完成。
//!
//! 每次写入都会递增对应表的版本号，`RuleCache` 据此惰性重载。

use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::error::AppError;

use super::ClipboardStore;

/// 规则表，两张表各自维护版本号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTable {
    Copy,
    Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyRuleRecord {
    pub id: i64,
    pub name: String,
    pub pattern: String,
    pub action: String,
    pub replacement: String,
    pub enabled: bool,
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRuleRecord {
    pub id: i64,
    pub name: String,
    pub pattern: String,
    pub action_type: String,
    /// JSON 对象字符串
    pub action_params: String,
    pub enabled: bool,
    pub priority: i64,
}

fn row_to_copy_rule(row: &Row<'_>) -> rusqlite::Result<CopyRuleRecord> {
    Ok(CopyRuleRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        pattern: row.get(2)?,
        action: row.get(3)?,
        replacement: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        enabled: row.get::<_, Option<i64>>(5)?.unwrap_or(1) != 0,
        priority: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
    })
}

fn row_to_action_rule(row: &Row<'_>) -> rusqlite::Result<ActionRuleRecord> {
    Ok(ActionRuleRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        pattern: row.get(2)?,
        action_type: row.get(3)?,
        action_params: row.get::<_, Option<String>>(4)?.unwrap_or_else(|| "{}".to_string()),
        enabled: row.get::<_, Option<i64>>(5)?.unwrap_or(1) != 0,
        priority: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
    })
}

fn load<T>(
    conn: &Connection,
    sql: &str,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, AppError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AppError::Database(format!("准备规则查询失败: {}", e)))?;
    stmt.query_map([], map)
        .map_err(|e| AppError::Database(format!("查询规则失败: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(format!("读取规则失败: {}", e)))
}

impl ClipboardStore {
    /// 执行一条规则表写语句，成功后递增规则版本号
    fn write_rules(
        &self,
        table: RuleTable,
        sql: &str,
        values: impl rusqlite::Params,
        what: &str,
    ) -> Result<usize, AppError> {
        let changed = self.with_conn(|conn| {
            conn.execute(sql, values)
                .map_err(|e| AppError::Database(format!("{}失败: {}", what, e)))
        })?;
        self.bump_rules_generation(table);
        Ok(changed)
    }

    /// 全部复制规则，优先级高的在前
    pub fn get_copy_rules(&self) -> Result<Vec<CopyRuleRecord>, AppError> {
        self.with_conn(|conn| {
            load(
                conn,
                "SELECT id, name, pattern, action, replacement, enabled, priority
                 FROM copy_rules ORDER BY priority DESC, id ASC",
                row_to_copy_rule,
            )
        })
    }

    pub fn add_copy_rule(
        &self,
        name: &str,
        pattern: &str,
        action: &str,
        replacement: &str,
        priority: i64,
    ) -> Result<i64, AppError> {
        self.with_conn(|conn| {
            self.write_rules(
                RuleTable::Copy,
                "INSERT INTO copy_rules (name, pattern, action, replacement, priority) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, pattern, action, replacement, priority],
                "新增复制规则",
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn toggle_copy_rule(&self, id: i64, enabled: bool) -> Result<bool, AppError> {
        self.write_rules(
            RuleTable::Copy,
            "UPDATE copy_rules SET enabled = ?1 WHERE id = ?2",
            params![enabled as i64, id],
            "切换复制规则",
        )
        .map(|changed| changed > 0)
    }

    pub fn delete_copy_rule(&self, id: i64) -> Result<bool, AppError> {
        self.write_rules(RuleTable::Copy, "DELETE FROM copy_rules WHERE id = ?1", params![id], "删除复制规则")
            .map(|changed| changed > 0)
    }

    /// 全部动作规则，优先级高的在前
    pub fn get_action_rules(&self) -> Result<Vec<ActionRuleRecord>, AppError> {
        self.with_conn(|conn| {
            load(
                conn,
                "SELECT id, name, pattern, action_type, action_params, enabled, priority
                 FROM clipboard_actions ORDER BY priority DESC, id ASC",
                row_to_action_rule,
            )
        })
    }

    pub fn add_action_rule(
        &self,
        name: &str,
        pattern: &str,
        action_type: &str,
        action_params: &str,
        priority: i64,
    ) -> Result<i64, AppError> {
        self.with_conn(|conn| {
            self.write_rules(
                RuleTable::Action,
                "INSERT INTO clipboard_actions (name, pattern, action_type, action_params, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, pattern, action_type, action_params, priority],
                "新增动作规则",
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn toggle_action_rule(&self, id: i64, enabled: bool) -> Result<bool, AppError> {
        self.write_rules(
            RuleTable::Action,
            "UPDATE clipboard_actions SET enabled = ?1 WHERE id = ?2",
            params![enabled as i64, id],
            "切换动作规则",
        )
        .map(|changed| changed > 0)
    }

    pub fn delete_action_rule(&self, id: i64) -> Result<bool, AppError> {
        self.write_rules(RuleTable::Action, "DELETE FROM clipboard_actions WHERE id = ?1", params![id], "删除动作规则")
            .map(|changed| changed > 0)
    }
}
