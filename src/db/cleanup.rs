//! 容量淘汰与过期清理子模块
//!
//! ## 职责
//! - 两级容量上限：未置顶图片条目单独一个小上限，全部未置顶条目一个大上限
//! - 每 `compaction_interval` 次淘汰执行一次 `VACUUM` 回收空间
//! - 删除 `expires_at` 已过的临时条目（不论是否置顶）
//!
//! ## 语义
//! 淘汰是永久删除，不进入回收站；两级上限都按 id 从旧到新删除，且从不触碰置顶条目。

use std::sync::atomic::Ordering;

use rusqlite::{params, Connection};

use crate::error::AppError;

use super::{format_timestamp, now_local, ClipboardStore};

/// 一次淘汰的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub images_removed: usize,
    pub items_removed: usize,
    pub compacted: bool,
}

fn count(conn: &Connection, sql: &str) -> Result<i64, AppError> {
    conn.query_row(sql, [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("统计条目失败: {}", e)))
}

/// 删除最旧的 `excess` 条未置顶条目，`type_clause` 为附加的类型条件
fn evict_oldest(conn: &Connection, type_clause: &str, excess: i64) -> Result<usize, AppError> {
    if excess <= 0 {
        return Ok(0);
    }
    let sql = format!(
        "DELETE FROM history WHERE id IN (
            SELECT id FROM history WHERE pinned = 0 {type_clause} ORDER BY id ASC LIMIT ?1
        )"
    );
    conn.execute(&sql, params![excess])
        .map_err(|e| AppError::Database(format!("淘汰旧条目失败: {}", e)))
}

fn enforce_limits(conn: &Connection, max_images: i64, max_history: i64) -> Result<(usize, usize), AppError> {
    let images = count(conn, "SELECT COUNT(*) FROM history WHERE type = 'IMAGE' AND pinned = 0")?;
    let images_removed = evict_oldest(conn, "AND type = 'IMAGE'", images - max_images)?;

    let unpinned = count(conn, "SELECT COUNT(*) FROM history WHERE pinned = 0")?;
    let items_removed = evict_oldest(conn, "", unpinned - max_history)?;

    Ok((images_removed, items_removed))
}

impl ClipboardStore {
    /// 按设置中的 `max_history` 执行一次淘汰
    pub fn cleanup(&self) -> Result<EvictionReport, AppError> {
        self.with_conn(|_| {
            let max_history = self.max_history()?;
            self.cleanup_with_limit(max_history)
        })
    }

    /// 以显式的未置顶条目上限执行一次淘汰
    pub fn cleanup_with_limit(&self, max_history: i64) -> Result<EvictionReport, AppError> {
        let max_images = self.config.max_image_history;
        self.with_conn(|conn| {
            let (images_removed, items_removed) =
                self.with_transaction(|tx| enforce_limits(tx, max_images, max_history.max(0)))?;
            if images_removed > 0 {
                log::info!("已淘汰 {} 个旧图片条目", images_removed);
            }
            if items_removed > 0 {
                log::info!("已淘汰 {} 个旧条目", items_removed);
            }

            // VACUUM 不能在事务中执行
            let passes = self.cleanups_since_compaction.fetch_add(1, Ordering::AcqRel) + 1;
            let mut compacted = false;
            if passes >= self.config.compaction_interval {
                self.cleanups_since_compaction.store(0, Ordering::Release);
                conn.execute_batch("VACUUM")
                    .map_err(|e| AppError::Database(format!("VACUUM 失败: {}", e)))?;
                log::info!("数据库 VACUUM 完成");
                compacted = true;
            }

            Ok(EvictionReport { images_removed, items_removed, compacted })
        })
    }

    /// 删除已过期的临时条目，返回删除数量
    pub fn cleanup_expired_items(&self) -> Result<usize, AppError> {
        let now = format_timestamp(now_local());
        self.with_conn(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM history WHERE expires_at IS NOT NULL AND expires_at < ?1",
                    params![now],
                )
                .map_err(|e| AppError::Database(format!("清理过期条目失败: {}", e)))?;
            if removed > 0 {
                log::info!("已删除 {} 个过期临时条目", removed);
            }
            Ok(removed)
        })
    }
}
