//! 历史条目子模块
//!
//! ## 职责
//! - 插入（非图片内容去重并"提到最前"）、列表查询、置顶与置顶排序
//! - 使用次数、书签、备注、链接标题等单条目字段更新
//! - 统计信息
//!
//! ## 排序约定
//! 所有列表查询统一为 `pinned DESC, pin_order ASC, id DESC`：
//! 置顶条目在前并按 `pin_order` 排列（相同时 id 大者在前），其余按最近优先。

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use chrono::{Duration, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::AppError;

use super::{format_timestamp, now_local, ClipboardStore, HistoryItem, ItemContent, ItemFilter, ItemType, Statistics};

pub(super) const ITEM_COLUMNS: &str = "id, content, type, timestamp, pinned, pin_order, use_count, tags, \
     collection_id, note, bookmark, url_title, expires_at, image_data IS NOT NULL";

pub(super) const ITEM_ORDER: &str = "ORDER BY pinned DESC, pin_order ASC, id DESC";

pub(super) fn row_to_item(row: &Row<'_>) -> rusqlite::Result<HistoryItem> {
    Ok(HistoryItem {
        id: row.get(0)?,
        content: row.get(1)?,
        item_type: row.get(2)?,
        created_at: row.get::<_, Option<NaiveDateTime>>(3).unwrap_or(None),
        pinned: row.get::<_, Option<i64>>(4)?.unwrap_or(0) != 0,
        pin_order: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        use_count: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
        tags: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        collection_id: row.get(8)?,
        note: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        bookmark: row.get::<_, Option<i64>>(10)?.unwrap_or(0) != 0,
        url_title: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        expires_at: row.get::<_, Option<NaiveDateTime>>(12).unwrap_or(None),
        has_image: row.get(13)?,
    })
}

/// 按条件查询条目，统一使用标准排序
pub(super) fn query_items(
    conn: &Connection,
    where_clause: &str,
    values: Vec<Value>,
) -> Result<Vec<HistoryItem>, AppError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM history WHERE {where_clause} {ITEM_ORDER}");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::Database(format!("准备查询失败: {}", e)))?;

    let items = stmt
        .query_map(params_from_iter(values), row_to_item)
        .map_err(|e| AppError::Database(format!("查询历史失败: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(format!("读取行失败: {}", e)))?;

    Ok(items)
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn insert_item(
    conn: &Connection,
    content: Option<&str>,
    image_data: Option<&[u8]>,
    item_type: ItemType,
    expires_at: Option<NaiveDateTime>,
) -> Result<i64, AppError> {
    let timestamp = format_timestamp(now_local());
    conn.execute(
        "INSERT INTO history (content, image_data, type, timestamp, expires_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![content, image_data, item_type, timestamp, expires_at.map(format_timestamp)],
    ).map_err(|e| AppError::Database(format!("插入记录失败: {}", e)))?;
    Ok(conn.last_insert_rowid())
}

/// 非图片类型：删除内容相同的未置顶非图片条目后再插入，使其成为最新一条
fn insert_with_dedup(
    conn: &Connection,
    content: Option<&str>,
    image_data: Option<&[u8]>,
    item_type: ItemType,
) -> Result<i64, AppError> {
    if item_type != ItemType::Image {
        if let Some(text) = content {
            let removed = conn
                .execute(
                    "DELETE FROM history WHERE content = ?1 AND pinned = 0 AND type != ?2",
                    params![text, ItemType::Image],
                )
                .map_err(|e| AppError::Database(format!("去重删除失败: {}", e)))?;
            if removed > 0 {
                log::trace!("去重：移除 {} 条相同内容的旧条目", removed);
            }
        }
    }
    insert_item(conn, content, image_data, item_type, None)
}

fn get_items(conn: &Connection, search_query: &str, filter: ItemFilter) -> Result<Vec<HistoryItem>, AppError> {
    let mut clause = String::from("1=1");
    let mut values = Vec::new();

    if !search_query.is_empty() {
        clause.push_str(" AND content LIKE ? ESCAPE '\\'");
        values.push(Value::Text(format!("%{}%", escape_like(search_query))));
    }

    match filter {
        ItemFilter::All => {}
        ItemFilter::Pinned => clause.push_str(" AND pinned = 1"),
        ItemFilter::Bookmarked => clause.push_str(" AND bookmark = 1"),
        ItemFilter::Type(item_type) => {
            clause.push_str(" AND type = ?");
            values.push(Value::Text(item_type.as_str().to_string()));
        }
    }

    query_items(conn, &clause, values)
}

fn toggle_pin(conn: &Connection, id: i64) -> Result<bool, AppError> {
    let current: Option<i64> = conn
        .query_row("SELECT pinned FROM history WHERE id = ?1", params![id], |row| row.get(0))
        .optional()
        .map_err(|e| AppError::Database(format!("查询置顶状态失败: {}", e)))?;

    let Some(current) = current else {
        return Ok(false);
    };

    if current != 0 {
        conn.execute("UPDATE history SET pinned = 0, pin_order = 0 WHERE id = ?1", params![id])
            .map_err(|e| AppError::Database(format!("取消置顶失败: {}", e)))?;
        return Ok(false);
    }

    let next_order: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(pin_order), -1) + 1 FROM history WHERE pinned = 1",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Database(format!("计算置顶顺序失败: {}", e)))?;

    conn.execute(
        "UPDATE history SET pinned = 1, pin_order = ?1 WHERE id = ?2",
        params![next_order, id],
    ).map_err(|e| AppError::Database(format!("置顶失败: {}", e)))?;
    Ok(true)
}

fn validate_pin_order_ids(ordered_ids: &[i64]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !seen.insert(*id) {
            return Err(AppError::InvalidInput(format!("置顶排序包含重复 id: {}", id)));
        }
    }
    Ok(())
}

/// 必须在事务内调用：任一 id 未置顶即返回错误，由调用方回滚
fn apply_pin_orders(conn: &Connection, ordered_ids: &[i64]) -> Result<(), AppError> {
    let mut stmt = conn
        .prepare("UPDATE history SET pin_order = ?1 WHERE id = ?2 AND pinned = 1")
        .map_err(|e| AppError::Database(format!("准备置顶排序失败: {}", e)))?;

    for (order, id) in ordered_ids.iter().enumerate() {
        let changed = stmt
            .execute(params![order as i64, id])
            .map_err(|e| AppError::Database(format!("更新置顶排序失败: {}", e)))?;
        if changed != 1 {
            return Err(AppError::InvalidInput(format!("条目 {} 不存在或未置顶", id)));
        }
    }
    Ok(())
}

fn get_statistics(conn: &Connection) -> Result<Statistics, AppError> {
    let total: i64 = conn
        .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("查询总数失败: {}", e)))?;

    let pinned: i64 = conn
        .query_row("SELECT COUNT(*) FROM history WHERE pinned = 1", [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("查询置顶数失败: {}", e)))?;

    let start_of_day = now_local().date().format("%Y-%m-%d 00:00:00").to_string();
    let today: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM history WHERE timestamp >= ?1",
            params![start_of_day],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Database(format!("查询今日数失败: {}", e)))?;

    let mut stmt = conn
        .prepare("SELECT type, COUNT(*) FROM history GROUP BY type")
        .map_err(|e| AppError::Database(format!("准备类型统计失败: {}", e)))?;
    let by_type = stmt
        .query_map([], |row| Ok((row.get::<_, ItemType>(0)?.as_str().to_string(), row.get::<_, i64>(1)?)))
        .map_err(|e| AppError::Database(format!("查询类型统计失败: {}", e)))?
        .try_fold(std::collections::BTreeMap::new(), |mut acc, row| {
            let (ty, count) = row?;
            *acc.entry(ty).or_insert(0) += count;
            Ok::<_, rusqlite::Error>(acc)
        })
        .map_err(|e| AppError::Database(format!("读取类型统计失败: {}", e)))?;

    Ok(Statistics { total, pinned, today, by_type })
}

fn update_column<T: rusqlite::ToSql>(conn: &Connection, column: &str, value: T, id: i64) -> Result<bool, AppError> {
    let changed = conn
        .execute(&format!("UPDATE history SET {column} = ?1 WHERE id = ?2"), params![value, id])
        .map_err(|e| AppError::Database(format!("更新 {} 失败: {}", column, e)))?;
    Ok(changed > 0)
}

impl ClipboardStore {
    /// 新增条目，返回新行 id
    ///
    /// 非图片类型会先删除内容相同的未置顶条目（去重并提到最前）。
    /// 每 `cleanup_interval` 次成功插入触发一次容量淘汰；淘汰失败只记录日志，
    /// 不影响本次插入结果。返回 `Err` 时调用方不能假设条目已持久化。
    pub fn add_item(
        &self,
        content: Option<&str>,
        image_data: Option<&[u8]>,
        item_type: ItemType,
    ) -> Result<i64, AppError> {
        // 持锁覆盖"插入 + 可能触发的淘汰"，淘汰内部会重入同一把锁
        self.with_conn(|_| {
            let id = self
                .with_transaction(|tx| insert_with_dedup(tx, content, image_data, item_type))
                .inspect_err(|e| log::error!("新增条目失败: {}", e))?;
            log::debug!("新增条目: {} (id={})", item_type.as_str(), id);
            self.after_insert();
            Ok(id)
        })
    }

    /// 新增临时条目，`minutes` 分钟后由过期清理删除（置顶也不例外）
    pub fn add_temp_item(
        &self,
        content: Option<&str>,
        image_data: Option<&[u8]>,
        item_type: ItemType,
        minutes: i64,
    ) -> Result<i64, AppError> {
        let expires_at = now_local() + Duration::minutes(minutes);
        self.with_conn(|conn| insert_item(conn, content, image_data, item_type, Some(expires_at)))
    }

    fn after_insert(&self) {
        let count = self.inserts_since_cleanup.fetch_add(1, Ordering::AcqRel) + 1;
        if count < self.config.cleanup_interval {
            return;
        }
        self.inserts_since_cleanup.store(0, Ordering::Release);
        if let Err(err) = self.cleanup() {
            log::warn!("定期容量淘汰失败，将在下个周期重试: {}", err);
        }
    }

    /// 按搜索词与过滤器查询条目
    pub fn get_items(&self, search_query: &str, filter: ItemFilter) -> Result<Vec<HistoryItem>, AppError> {
        self.with_conn(|conn| get_items(conn, search_query, filter))
    }

    pub fn get_item(&self, id: i64) -> Result<Option<HistoryItem>, AppError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM history WHERE id = ?1"),
                params![id],
                row_to_item,
            )
            .optional()
            .map_err(|e| AppError::Database(format!("查询条目失败: {}", e)))
        })
    }

    pub fn get_bookmarked_items(&self) -> Result<Vec<HistoryItem>, AppError> {
        self.get_items("", ItemFilter::Bookmarked)
    }

    /// 读取条目完整负载（含图片二进制）
    pub fn get_content(&self, id: i64) -> Result<Option<ItemContent>, AppError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT content, image_data, type FROM history WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ItemContent {
                        content: row.get(0)?,
                        image_data: row.get(1)?,
                        item_type: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| AppError::Database(format!("读取条目内容失败: {}", e)))
        })
    }

    /// 切换置顶，返回新状态；id 不存在时返回 `false` 且不做修改
    pub fn toggle_pin(&self, id: i64) -> Result<bool, AppError> {
        self.with_transaction(|tx| toggle_pin(tx, id))
    }

    /// 原子地把 `ordered_ids` 的 `pin_order` 设为其下标
    ///
    /// 含重复 id、或任一 id 不存在/未置顶时整批拒绝，所有条目的顺序保持不变。
    pub fn update_pin_orders(&self, ordered_ids: &[i64]) -> Result<(), AppError> {
        if ordered_ids.is_empty() {
            return Ok(());
        }
        validate_pin_order_ids(ordered_ids).inspect_err(|e| log::error!("置顶排序被拒绝: {}", e))?;
        self.with_transaction(|tx| apply_pin_orders(tx, ordered_ids))
            .inspect_err(|e| log::error!("置顶排序批量更新失败，已回滚: {}", e))
    }

    pub fn increment_use_count(&self, id: i64) -> Result<(), AppError> {
        self.with_conn(|conn| {
            conn.execute("UPDATE history SET use_count = use_count + 1 WHERE id = ?1", params![id])
                .map_err(|e| AppError::Database(format!("更新使用次数失败: {}", e)))?;
            Ok(())
        })
    }

    /// 切换书签，返回新状态
    pub fn toggle_bookmark(&self, id: i64) -> Result<bool, AppError> {
        self.with_transaction(|tx| {
            let current: Option<i64> = tx
                .query_row("SELECT bookmark FROM history WHERE id = ?1", params![id], |row| row.get(0))
                .optional()
                .map_err(|e| AppError::Database(format!("查询书签状态失败: {}", e)))?;
            let Some(current) = current else {
                return Ok(false);
            };
            let next = current == 0;
            update_column(tx, "bookmark", next as i64, id)?;
            Ok(next)
        })
    }

    pub fn set_note(&self, id: i64, note: &str) -> Result<bool, AppError> {
        self.with_conn(|conn| update_column(conn, "note", note, id))
    }

    pub fn get_note(&self, id: i64) -> Result<String, AppError> {
        self.with_conn(|conn| {
            let note: Option<Option<String>> = conn
                .query_row("SELECT note FROM history WHERE id = ?1", params![id], |row| row.get(0))
                .optional()
                .map_err(|e| AppError::Database(format!("读取备注失败: {}", e)))?;
            Ok(note.flatten().unwrap_or_default())
        })
    }

    /// 写入链接标题（异步抓取结果的落库点）
    pub fn update_url_title(&self, id: i64, title: &str) -> Result<bool, AppError> {
        self.with_conn(|conn| update_column(conn, "url_title", title, id))
    }

    /// 永久删除单个条目（不进入回收站）
    pub fn delete_item(&self, id: i64) -> Result<bool, AppError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute("DELETE FROM history WHERE id = ?1", params![id])
                .map_err(|e| AppError::Database(format!("删除记录失败: {}", e)))?;
            log::info!("删除条目: {}", id);
            Ok(changed > 0)
        })
    }

    /// 删除所有未置顶条目
    pub fn clear_all(&self) -> Result<usize, AppError> {
        self.with_conn(|conn| {
            let removed = conn
                .execute("DELETE FROM history WHERE pinned = 0", [])
                .map_err(|e| AppError::Database(format!("清空记录失败: {}", e)))?;
            log::info!("已删除 {} 条未置顶条目", removed);
            Ok(removed)
        })
    }

    pub fn get_statistics(&self) -> Result<Statistics, AppError> {
        self.with_conn(get_statistics)
    }

    /// 使用次数最多的文本条目
    pub fn get_top_items(&self, limit: i64) -> Result<Vec<(String, i64)>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT content, use_count FROM history
                     WHERE type != 'IMAGE' AND use_count > 0 AND content IS NOT NULL
                     ORDER BY use_count DESC LIMIT ?1",
                )
                .map_err(|e| AppError::Database(format!("准备常用条目查询失败: {}", e)))?;
            stmt.query_map(params![limit], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| AppError::Database(format!("查询常用条目失败: {}", e)))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Database(format!("读取常用条目失败: {}", e)))
        })
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::params;

    use super::escape_like;
    use crate::db::test_support::memory_store;
    use crate::db::{ItemFilter, ItemType};

    fn pin_orders(store: &crate::db::ClipboardStore, ids: &[i64]) -> Vec<(i64, i64)> {
        ids.iter()
            .map(|id| {
                let item = store.get_item(*id).expect("get item").expect("item exists");
                (item.id, item.pin_order)
            })
            .collect()
    }

    #[test]
    fn add_item_deduplicates_and_promotes_text() {
        let store = memory_store();

        let hello = store.add_item(Some("hello"), None, ItemType::Text).expect("add hello");
        let world = store.add_item(Some("world"), None, ItemType::Text).expect("add world");
        let hello_again = store.add_item(Some("hello"), None, ItemType::Text).expect("add hello again");

        assert!(hello_again > world && world > hello);

        let items = store.get_items("", ItemFilter::All).expect("get items");
        let contents: Vec<_> = items.iter().map(|i| i.content.clone().unwrap_or_default()).collect();
        assert_eq!(contents, vec!["hello", "world"]);
        assert_eq!(items[0].id, hello_again);
    }

    #[test]
    fn add_item_keeps_pinned_duplicate_untouched() {
        let store = memory_store();
        let pinned = store.add_item(Some("keep"), None, ItemType::Text).expect("add");
        assert!(store.toggle_pin(pinned).expect("pin"));

        store.add_item(Some("keep"), None, ItemType::Text).expect("add duplicate");

        assert!(store.get_item(pinned).expect("get").is_some(), "pinned row must survive dedup");
        assert_eq!(store.get_items("keep", ItemFilter::All).expect("search").len(), 2);
    }

    #[test]
    fn add_item_never_deduplicates_images() {
        let store = memory_store();
        store.add_item(Some("[이미지]"), Some(&[1, 2, 3]), ItemType::Image).expect("add image 1");
        store.add_item(Some("[이미지]"), Some(&[1, 2, 3]), ItemType::Image).expect("add image 2");

        let images = store.get_items("", ItemFilter::Type(ItemType::Image)).expect("get images");
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|i| i.has_image));
    }

    #[test]
    fn text_matching_image_placeholder_keeps_images() {
        let store = memory_store();
        let placeholder = crate::capture::IMAGE_PLACEHOLDER;
        store.add_item(Some(placeholder), Some(&[1]), ItemType::Image).expect("add image 1");
        store.add_item(Some(placeholder), Some(&[2]), ItemType::Image).expect("add image 2");

        store.add_item(Some(placeholder), None, ItemType::Text).expect("add text");
        store.add_item(Some(placeholder), None, ItemType::Text).expect("add text again");

        let images = store.get_items("", ItemFilter::Type(ItemType::Image)).expect("get images");
        assert_eq!(images.len(), 2);
        let texts = store.get_items("", ItemFilter::Type(ItemType::Text)).expect("get texts");
        assert_eq!(texts.len(), 1);
    }

    #[test]
    fn end_to_end_pin_reorder_example() {
        let store = memory_store();
        let _ = store.add_item(Some("hello"), None, ItemType::Text).expect("hello");
        let id_world = store.add_item(Some("world"), None, ItemType::Text).expect("world");
        let id_hello = store.add_item(Some("hello"), None, ItemType::Text).expect("hello again");

        store.toggle_pin(id_hello).expect("pin hello");
        store.toggle_pin(id_world).expect("pin world");
        store.update_pin_orders(&[id_world, id_hello]).expect("reorder");

        let pinned: Vec<i64> = store
            .get_items("", ItemFilter::Pinned)
            .expect("pinned items")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(pinned, vec![id_world, id_hello]);
    }

    #[test]
    fn toggle_pin_appends_to_end_and_resets_on_unpin() {
        let store = memory_store();
        let a = store.add_item(Some("a"), None, ItemType::Text).expect("a");
        let b = store.add_item(Some("b"), None, ItemType::Text).expect("b");

        assert!(store.toggle_pin(a).expect("pin a"));
        assert!(store.toggle_pin(b).expect("pin b"));
        assert_eq!(pin_orders(&store, &[a, b]), vec![(a, 0), (b, 1)]);

        assert!(!store.toggle_pin(a).expect("unpin a"));
        let item = store.get_item(a).expect("get a").expect("a exists");
        assert!(!item.pinned);
        assert_eq!(item.pin_order, 0);

        assert!(!store.toggle_pin(9_999).expect("unknown id"));
    }

    #[test]
    fn update_pin_orders_applies_full_order() {
        let store = memory_store();
        let ids: Vec<i64> = (0..3)
            .map(|i| {
                let id = store.add_item(Some(&format!("pin-order-{i}")), None, ItemType::Text).expect("add");
                store.toggle_pin(id).expect("pin");
                id
            })
            .collect();

        let expected = vec![ids[2], ids[0], ids[1]];
        store.update_pin_orders(&expected).expect("reorder");

        let pinned: Vec<i64> = store
            .get_items("", ItemFilter::Pinned)
            .expect("pinned")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(pinned, expected);
    }

    #[test]
    fn update_pin_orders_rolls_back_on_unpinned_id() {
        let store = memory_store();
        let p1 = store.add_item(Some("rollback-pin-0"), None, ItemType::Text).expect("add");
        let p2 = store.add_item(Some("rollback-pin-1"), None, ItemType::Text).expect("add");
        store.toggle_pin(p1).expect("pin");
        store.toggle_pin(p2).expect("pin");
        let normal = store.add_item(Some("rollback-normal"), None, ItemType::Text).expect("add");

        let before = pin_orders(&store, &[p1, p2, normal]);
        let result = store.update_pin_orders(&[p2, normal, p1]);
        assert!(result.is_err());

        assert_eq!(pin_orders(&store, &[p1, p2, normal]), before);
    }

    #[test]
    fn update_pin_orders_rejects_duplicates() {
        let store = memory_store();
        let p1 = store.add_item(Some("x"), None, ItemType::Text).expect("add");
        store.toggle_pin(p1).expect("pin");

        let result = store.update_pin_orders(&[p1, p1]);
        assert!(matches!(result, Err(crate::error::AppError::InvalidInput(_))));
        assert!(store.update_pin_orders(&[]).is_ok());
    }

    #[test]
    fn get_items_orders_pinned_first_with_custom_pin_order() {
        let store = memory_store();
        let normal_first = store.add_item(Some("normal-first"), None, ItemType::Text).expect("add");
        let pinned_a = store.add_item(Some("pinned-a"), None, ItemType::Text).expect("add");
        let pinned_b = store.add_item(Some("pinned-b"), None, ItemType::Text).expect("add");
        let pinned_c = store.add_item(Some("pinned-c"), None, ItemType::Text).expect("add");
        let normal_last = store.add_item(Some("normal-last"), None, ItemType::Text).expect("add");

        for id in [pinned_a, pinned_b, pinned_c] {
            store.toggle_pin(id).expect("pin");
        }
        store.update_pin_orders(&[pinned_c, pinned_a, pinned_b]).expect("reorder");

        let ids: Vec<i64> = store
            .get_items("", ItemFilter::parse("전체"))
            .expect("all items")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![pinned_c, pinned_a, pinned_b, normal_last, normal_first]);
    }

    #[test]
    fn get_items_search_escapes_like_wildcards() {
        let store = memory_store();
        store.add_item(Some("100% sure"), None, ItemType::Text).expect("add");
        store.add_item(Some("100 sure"), None, ItemType::Text).expect("add");

        let hits = store.get_items("100%", ItemFilter::All).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(escape_like("a_b"), "a\\_b");
    }

    #[test]
    fn bookmark_note_use_count_and_title_updates() {
        let store = memory_store();
        let id = store.add_item(Some("https://example.com"), None, ItemType::Link).expect("add");

        assert!(store.toggle_bookmark(id).expect("bookmark on"));
        store.set_note(id, "read later").expect("set note");
        store.increment_use_count(id).expect("use");
        store.increment_use_count(id).expect("use");
        store.update_url_title(id, "Example Domain").expect("title");

        let item = store.get_item(id).expect("get").expect("exists");
        assert!(item.bookmark);
        assert_eq!(item.use_count, 2);
        assert_eq!(item.url_title, "Example Domain");
        assert_eq!(store.get_note(id).expect("note"), "read later");
        assert_eq!(store.get_bookmarked_items().expect("bookmarked").len(), 1);
        assert_eq!(store.get_top_items(5).expect("top")[0], ("https://example.com".to_string(), 2));

        assert!(!store.toggle_bookmark(id).expect("bookmark off"));
    }

    #[test]
    fn statistics_count_types_pinned_and_today() {
        let store = memory_store();
        let t = store.add_item(Some("text"), None, ItemType::Text).expect("add");
        store.add_item(Some("https://a.b"), None, ItemType::Link).expect("add");
        store.add_item(None, Some(&[0u8; 4]), ItemType::Image).expect("add");
        store.toggle_pin(t).expect("pin");
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO history (content, type, timestamp) VALUES ('old', 'TEXT', '2000-01-01 00:00:00')",
                    params![],
                ).map_err(|e| crate::error::AppError::Database(e.to_string()))
            })
            .expect("insert old row");

        let stats = store.get_statistics().expect("stats");
        assert_eq!(stats.total, 4);
        assert_eq!(stats.pinned, 1);
        assert_eq!(stats.today, 3);
        assert_eq!(stats.by_type.get("TEXT"), Some(&2));
        assert_eq!(stats.by_type.get("IMAGE"), Some(&1));
    }

    #[test]
    fn clear_all_keeps_pinned() {
        let store = memory_store();
        let keep = store.add_item(Some("keep"), None, ItemType::Text).expect("add");
        store.add_item(Some("drop"), None, ItemType::Text).expect("add");
        store.toggle_pin(keep).expect("pin");

        assert_eq!(store.clear_all().expect("clear"), 1);
        let remaining = store.get_items("", ItemFilter::All).expect("items");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep);
    }

    #[test]
    fn get_content_returns_payload() {
        let store = memory_store();
        let id = store.add_item(None, Some(&[9, 8, 7]), ItemType::Image).expect("add");
        let content = store.get_content(id).expect("content").expect("exists");
        assert_eq!(content.image_data.as_deref(), Some(&[9u8, 8, 7][..]));
        assert_eq!(content.item_type, ItemType::Image);
        assert!(store.delete_item(id).expect("delete"));
        assert!(store.get_content(id).expect("content").is_none());
    }
}
