//! Schema 初始化子模块
//!
//! ## 职责
//! - 创建/迁移数据库表结构与索引
//! - 设置 SQLite 运行参数（WAL、synchronous）
//!
//! ## 迁移策略
//! - 迁移按 `PRAGMA user_version` 顺序执行，每一步只做增量（建表、加列、建索引）
//! - 加列前先查 `PRAGMA table_info`，已存在即跳过；从不吞掉通用错误
//! - 旧版本创建的数据库（user_version = 0 但列已齐全）会被安全地"补齐"版本号
//!
//! ## 错误语义
//! - DDL 失败统一映射为 `AppError::Database`

use rusqlite::Connection;

use crate::error::AppError;

pub(crate) const SCHEMA_VERSION: i64 = 4;

/// 单个迁移步骤：目标版本 + 执行函数
struct Migration {
    version: i64,
    name: &'static str,
    apply: fn(&Connection) -> Result<(), AppError>,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "base_tables", apply: create_base_tables },
    Migration { version: 2, name: "history_tags_pin_order", apply: add_tag_and_pin_columns },
    Migration { version: 3, name: "collections_trash_notes", apply: add_collections_and_trash },
    Migration { version: 4, name: "history_indexes", apply: create_history_indexes },
];

fn get_user_version(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), AppError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| AppError::Database(format!("写入数据库版本失败: {}", e)))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, AppError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| AppError::Database(format!("读取表结构失败 {}: {}", table, e)))?;
    stmt.query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| AppError::Database(format!("读取表结构失败 {}: {}", table, e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(format!("读取列信息失败 {}: {}", table, e)))
}

/// 列不存在时才执行 `ALTER TABLE ... ADD COLUMN`
fn ensure_column(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<(), AppError> {
    if table_columns(conn, table)?.iter().any(|c| c == column) {
        return Ok(());
    }
    conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"), [])
        .map_err(|e| AppError::Database(format!("添加列失败 {}.{}: {}", table, column, e)))?;
    log::info!("schema: 已添加列 {}.{}", table, column);
    Ok(())
}

fn create_base_tables(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT,
            image_data BLOB,
            type TEXT,
            timestamp TEXT,
            pinned INTEGER DEFAULT 0,
            use_count INTEGER DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS snippets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            content TEXT NOT NULL,
            shortcut TEXT,
            category TEXT DEFAULT '일반',
            created_at TEXT
        );
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        );
        CREATE TABLE IF NOT EXISTS copy_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            pattern TEXT NOT NULL,
            action TEXT NOT NULL,
            replacement TEXT DEFAULT '',
            enabled INTEGER DEFAULT 1,
            priority INTEGER DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS secure_vault (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            encrypted_content BLOB,
            label TEXT,
            created_at TEXT
        );
        CREATE TABLE IF NOT EXISTS clipboard_actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            pattern TEXT NOT NULL,
            action_type TEXT NOT NULL,
            action_params TEXT DEFAULT '{}',
            enabled INTEGER DEFAULT 1,
            priority INTEGER DEFAULT 0
        );"
    ).map_err(|e| AppError::Database(format!("创建基础表失败: {}", e)))
}

fn add_tag_and_pin_columns(conn: &Connection) -> Result<(), AppError> {
    ensure_column(conn, "history", "tags", "TEXT DEFAULT ''")?;
    ensure_column(conn, "history", "pin_order", "INTEGER DEFAULT 0")?;
    ensure_column(conn, "history", "url_title", "TEXT DEFAULT ''")
}

fn add_collections_and_trash(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            icon TEXT DEFAULT '📁',
            color TEXT DEFAULT '#6366f1',
            created_at TEXT
        );
        CREATE TABLE IF NOT EXISTS deleted_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_id INTEGER,
            content TEXT,
            image_data BLOB,
            type TEXT,
            deleted_at TEXT,
            expires_at TEXT
        );"
    ).map_err(|e| AppError::Database(format!("创建集合/回收站表失败: {}", e)))?;

    ensure_column(conn, "history", "collection_id", "INTEGER DEFAULT NULL")?;
    ensure_column(conn, "history", "note", "TEXT DEFAULT ''")?;
    ensure_column(conn, "history", "bookmark", "INTEGER DEFAULT 0")?;
    ensure_column(conn, "history", "expires_at", "TEXT DEFAULT NULL")
}

fn create_history_indexes(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_history_pinned ON history(pinned);
         CREATE INDEX IF NOT EXISTS idx_history_type ON history(type);
         CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp);
         CREATE INDEX IF NOT EXISTS idx_history_bookmark ON history(bookmark);
         CREATE INDEX IF NOT EXISTS idx_history_expires_at ON history(expires_at);
         CREATE INDEX IF NOT EXISTS idx_history_content ON history(content);
         CREATE INDEX IF NOT EXISTS idx_deleted_history_expires_at ON deleted_history(expires_at);"
    ).map_err(|e| AppError::Database(format!("创建历史索引失败: {}", e)))
}

/// 开启 WAL；内存库只会报告 `memory`，其余情况失败时记录警告并沿用默认日志模式
fn enable_wal(conn: &Connection) {
    match conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0)) {
        Ok(mode) if mode.eq_ignore_ascii_case("wal") || mode.eq_ignore_ascii_case("memory") => {}
        Ok(mode) => log::warn!("schema: 无法启用 WAL，当前日志模式 {}", mode),
        Err(e) => log::warn!("schema: 启用 WAL 失败: {}", e),
    }
    if let Err(e) = conn.execute_batch("PRAGMA synchronous=NORMAL;") {
        log::warn!("schema: 设置 synchronous 失败: {}", e);
    }
}

pub(crate) fn initialize_schema(conn: &Connection) -> Result<(), AppError> {
    enable_wal(conn);

    let mut version = get_user_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(AppError::Database(format!(
            "数据库版本过新: current={}, supported={}",
            version, SCHEMA_VERSION
        )));
    }

    let start = version;
    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        (migration.apply)(conn)?;
        set_user_version(conn, migration.version)?;
        version = migration.version;
        log::info!("schema: 迁移完成 v{} ({})", migration.version, migration.name);
    }

    if version != SCHEMA_VERSION {
        return Err(AppError::Database(format!(
            "数据库版本不匹配: current={}, expected={}",
            version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rusqlite::Connection;

    use super::{initialize_schema, table_columns};

    #[test]
    fn initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("create memory db");

        initialize_schema(&conn).expect("first init should succeed");
        initialize_schema(&conn).expect("second init should succeed");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='history'", [], |row| row.get(0))
            .expect("query table count");
        assert_eq!(count, 1, "history table should exist exactly once");
    }

    #[test]
    fn initialize_schema_creates_all_domain_tables() {
        let conn = Connection::open_in_memory().expect("create memory db");
        initialize_schema(&conn).expect("init should succeed");

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .expect("prepare table query");
        let tables: HashSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .expect("query tables")
            .collect::<Result<_, _>>()
            .expect("collect tables");

        for required in [
            "history",
            "collections",
            "deleted_history",
            "snippets",
            "settings",
            "copy_rules",
            "clipboard_actions",
            "secure_vault",
        ] {
            assert!(tables.contains(required), "missing table: {required}");
        }
    }

    #[test]
    fn initialize_schema_creates_expected_history_columns() {
        let conn = Connection::open_in_memory().expect("create memory db");
        initialize_schema(&conn).expect("init should succeed");

        let column_set: HashSet<String> = table_columns(&conn, "history")
            .expect("read columns")
            .into_iter()
            .collect();

        for required in [
            "id", "content", "image_data", "type", "timestamp", "pinned", "use_count",
            "tags", "pin_order", "collection_id", "note", "bookmark", "expires_at", "url_title",
        ] {
            assert!(column_set.contains(required), "missing required column: {required}");
        }

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .expect("query user_version");
        assert_eq!(version, super::SCHEMA_VERSION);
    }

    #[test]
    fn initialize_schema_adopts_unversioned_legacy_database() {
        let conn = Connection::open_in_memory().expect("create memory db");

        // 旧版本：列已部分存在，但从未写过 user_version
        conn.execute_batch(
            "CREATE TABLE history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT,
                image_data BLOB,
                type TEXT,
                timestamp TEXT,
                pinned INTEGER DEFAULT 0,
                use_count INTEGER DEFAULT 0,
                category TEXT DEFAULT '',
                tags TEXT DEFAULT '',
                pin_order INTEGER DEFAULT 0
            );
            INSERT INTO history (content, type, timestamp, tags) VALUES ('legacy', 'TEXT', '2024-01-01 00:00:00', 'x');"
        ).expect("prepare legacy schema");

        initialize_schema(&conn).expect("migrate legacy db");

        let (content, tags): (String, String) = conn
            .query_row("SELECT content, tags FROM history", [], |row| Ok((row.get(0)?, row.get(1)?)))
            .expect("legacy row survives");
        assert_eq!(content, "legacy");
        assert_eq!(tags, "x");

        let columns = table_columns(&conn, "history").expect("read columns");
        assert!(columns.iter().any(|c| c == "expires_at"));
    }

    #[test]
    fn initialize_schema_rejects_newer_version() {
        let conn = Connection::open_in_memory().expect("create memory db");
        conn.execute_batch("PRAGMA user_version = 99;").expect("bump version");

        assert!(initialize_schema(&conn).is_err());
    }

    #[test]
    fn file_store_runs_in_wal_mode() {
        let dir = crate::db::test_support::unique_temp_dir("smartclip-wal");
        let store = crate::db::ClipboardStore::open(crate::db::StoreConfig::from_app_dir(&dir))
            .expect("open file store");

        let mode: String = store
            .with_conn(|conn| {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
                    .map_err(|e| crate::error::AppError::Database(e.to_string()))
            })
            .expect("query journal mode");
        assert_eq!(mode.to_ascii_lowercase(), "wal");

        drop(store);
        let _ = std::fs::remove_dir_all(dir);
    }
}
