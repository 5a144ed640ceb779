//! 数据库模块
//!
//! # 设计思路
//!
//! 所有 SQLite 操作集中在 `ClipboardStore`，捕获流水线、UI 命令、维护定时器
//! 共享同一个实例。使用 `rusqlite` 直接操作 SQLite。
//!
//! # 并发模型
//!
//! - 每个存储实例持有一把 `parking_lot::ReentrantMutex<Connection>`：
//!   所有写操作和需要一致快照的多步读取都在锁内完成。
//! - 锁是可重入的，且这一点写在类型上：例如 `add_item` 在持锁期间触发
//!   `cleanup`，后者再次获取同一把锁不会死锁。
//! - 数据库运行在 WAL 模式，读者不会被进行中的写事务阻塞。
//! - 多语句写操作在事务内执行，任何一步失败都会回滚到之前已提交的状态。

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::NaiveDateTime;
use parking_lot::ReentrantMutex;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

mod cleanup;
mod collections;
pub mod config;
mod history;
mod rules;
mod schema;
mod settings;
mod snippets;
mod storage;
mod tags;
mod trash;
mod vault;

pub use cleanup::EvictionReport;
pub use collections::{DEFAULT_COLLECTION_COLOR, DEFAULT_COLLECTION_ICON};
pub use config::StoreConfig;
pub use rules::{ActionRuleRecord, CopyRuleRecord, RuleTable};
pub use settings::{Hotkeys, DEFAULT_MAX_HISTORY, DEFAULT_THEME};
pub use snippets::DEFAULT_SNIPPET_CATEGORY;
pub use storage::DbInfo;

/// 数据库时间戳格式（本地时间，按字典序可比较）
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

// ============================================================================
// 数据模型
// ============================================================================

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Text,
    Link,
    Image,
    Code,
    Color,
}

impl ItemType {
    pub const ALL: [ItemType; 5] = [Self::Text, Self::Link, Self::Image, Self::Code, Self::Color];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Link => "LINK",
            Self::Image => "IMAGE",
            Self::Code => "CODE",
            Self::Color => "COLOR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Some(Self::Text),
            "LINK" => Some(Self::Link),
            "IMAGE" => Some(Self::Image),
            "CODE" => Some(Self::Code),
            "COLOR" => Some(Self::Color),
            _ => None,
        }
    }
}

impl ToSql for ItemType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ItemType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        // 旧库中缺失或未知的类型按文本处理
        match value {
            ValueRef::Null => Ok(Self::Text),
            other => Ok(Self::parse(other.as_str()?).unwrap_or(Self::Text)),
        }
    }
}

/// 剪贴板历史条目（列表视图，不含图片二进制）
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub id: i64,
    pub content: Option<String>,
    pub item_type: ItemType,
    pub created_at: Option<NaiveDateTime>,
    pub pinned: bool,
    pub pin_order: i64,
    pub use_count: i64,
    pub tags: String,
    pub collection_id: Option<i64>,
    pub note: String,
    pub bookmark: bool,
    pub url_title: String,
    pub expires_at: Option<NaiveDateTime>,
    pub has_image: bool,
}

/// 条目的完整负载
#[derive(Debug, Clone, PartialEq)]
pub struct ItemContent {
    pub content: Option<String>,
    pub image_data: Option<Vec<u8>>,
    pub item_type: ItemType,
}

/// 列表过滤器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    All,
    Pinned,
    Bookmarked,
    Type(ItemType),
}

impl ItemFilter {
    /// 解析 UI 过滤标签；无法识别时回退为 `All`
    ///
    /// 同时接受带 emoji 的标签（"📌 고정"）、不带 emoji 的旧标签（"고정"）
    /// 和英文名（"pinned" / "link"）。
    pub fn parse(label: &str) -> Self {
        let normalized = label
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .trim()
            .to_lowercase();
        match normalized.as_str() {
            "" | "전체" | "all" => Self::All,
            "고정" | "pinned" => Self::Pinned,
            "북마크" | "bookmarked" | "bookmark" => Self::Bookmarked,
            "텍스트" => Self::Type(ItemType::Text),
            "이미지" => Self::Type(ItemType::Image),
            "링크" => Self::Type(ItemType::Link),
            "코드" => Self::Type(ItemType::Code),
            "색상" => Self::Type(ItemType::Color),
            other => ItemType::parse(other).map(Self::Type).unwrap_or(Self::All),
        }
    }
}

/// 集合
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub created_at: Option<NaiveDateTime>,
}

/// 回收站条目
#[derive(Debug, Clone, Serialize)]
pub struct TrashEntry {
    pub id: i64,
    pub original_id: Option<i64>,
    pub content: Option<String>,
    pub item_type: ItemType,
    pub deleted_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

/// 片段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub shortcut: String,
    pub category: String,
}

/// 保险库条目（加密方案不在本模块内，内容按不透明二进制存储）
#[derive(Debug, Clone, PartialEq)]
pub struct VaultEntry {
    pub id: i64,
    pub encrypted_content: Vec<u8>,
    pub label: String,
    pub created_at: Option<NaiveDateTime>,
}

/// 统计信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub total: i64,
    pub pinned: i64,
    pub today: i64,
    pub by_type: BTreeMap<String, i64>,
}

// ============================================================================
// 存储句柄
// ============================================================================

/// 剪贴板历史存储
pub struct ClipboardStore {
    conn: ReentrantMutex<Connection>,
    config: StoreConfig,
    /// 距上次容量淘汰以来的成功插入次数
    inserts_since_cleanup: AtomicU32,
    /// 距上次 VACUUM 以来的淘汰次数
    cleanups_since_compaction: AtomicU32,
    /// 复制规则表写入计数，`RuleCache` 据此判断快照是否过期
    copy_rules_generation: AtomicU64,
    /// 动作规则表写入计数
    action_rules_generation: AtomicU64,
}

impl ClipboardStore {
    /// 打开（或创建）配置中的数据库文件并执行迁移
    pub fn open(config: StoreConfig) -> Result<Self, AppError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("创建数据库目录失败: {}", e))
            })?;
        }
        log::info!("数据库路径: {}", config.db_path.display());

        let conn = Connection::open(&config.db_path).map_err(|e| {
            AppError::Database(format!("打开数据库失败: {}", e))
        })?;
        Self::from_connection(conn, config)
    }

    /// 内存数据库，主要用于测试；备份目录仍取自 `config`
    pub fn open_in_memory(config: StoreConfig) -> Result<Self, AppError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            AppError::Database(format!("打开内存数据库失败: {}", e))
        })?;
        Self::from_connection(conn, config)
    }

    fn from_connection(conn: Connection, config: StoreConfig) -> Result<Self, AppError> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: ReentrantMutex::new(conn),
            config,
            inserts_since_cleanup: AtomicU32::new(0),
            cleanups_since_compaction: AtomicU32::new(0),
            copy_rules_generation: AtomicU64::new(0),
            action_rules_generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    /// 在存储锁内执行 `op`；同一线程可重入
    pub(crate) fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let conn = self.conn.lock();
        op(&conn)
    }

    /// 在存储锁内开启事务执行 `op`：成功提交，失败时事务随 drop 回滚
    ///
    /// 不可嵌套调用；需要在事务后继续做其它写入的操作应先返回再调用。
    pub(crate) fn with_transaction<T>(
        &self,
        op: impl FnOnce(&Transaction<'_>) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| AppError::Database(format!("开始事务失败: {}", e)))?;
            let value = op(&tx)?;
            tx.commit()
                .map_err(|e| AppError::Database(format!("提交事务失败: {}", e)))?;
            Ok(value)
        })
    }

    fn generation_counter(&self, table: RuleTable) -> &AtomicU64 {
        match table {
            RuleTable::Copy => &self.copy_rules_generation,
            RuleTable::Action => &self.action_rules_generation,
        }
    }

    /// 指定规则表的当前版本号
    pub fn rules_generation(&self, table: RuleTable) -> u64 {
        self.generation_counter(table).load(Ordering::Acquire)
    }

    pub(crate) fn bump_rules_generation(&self, table: RuleTable) {
        self.generation_counter(table).fetch_add(1, Ordering::AcqRel);
    }
}

// 历史、标签、回收站等操作按职责拆分到 `db/*.rs`，均以 `impl ClipboardStore` 扩展。
