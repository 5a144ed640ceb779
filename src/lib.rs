//! # 智能剪贴板核心库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │          宿主 (UI / 托盘 / 平台剪贴板监听)                │
//! │       │ notify()                     ↑ CaptureResult      │
//! └───────┼──────────────────────────────┼───────────────────┘
//!         ↓                              │  ActionEvent
//! ┌───────┼──────────────────────────────┼───────────────────┐
//! │  capture ── Debouncer → CapturePipeline                  │
//! │                             │                            │
//! │  rules ──── 复制规则 → ActionEngine ─→ 抓取池 (tokio)     │
//! │               ↑ RuleCache      ↑ mpsc 结果通道           │
//! │  db ─────── ClipboardStore (rusqlite + ReentrantMutex)    │
//! │               ↑                                          │
//! │  maintenance  过期清理 · 回收站清理 · 每日备份            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`db`] | SQLite 存储：历史、置顶排序、标签、集合、回收站、淘汰、备份、设置、规则 |
//! | [`rules`] | 规则缓存、复制规则、动作自动化引擎、网页标题抓取池 |
//! | [`capture`] | 类型识别、尾沿去抖、捕获流水线 |
//! | [`maintenance`] | 定期维护线程 |

pub mod capture;
pub mod db;
pub mod error;
pub mod maintenance;
pub mod rules;
