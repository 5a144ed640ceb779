//! 规则与动作自动化
//!
//! # 设计思路
//!
//! 规则存放在数据库中（见 `db::rules`），这里负责把它们变成可执行的东西：
//! - **复制规则**：入库前按优先级对文本做规范化（`copy`）；
//! - **动作规则**：入库后对文本执行动作，同步动作立即返回，抓取标题交给后台线程池（`engine` + `fetch`）；
//! - **缓存**：正则只在规则表变化后重新编译（`cache`）。
//!
//! # 实现思路
//!
//! - 动作是闭合枚举 `ActionKind`，新增动作只需扩展枚举和一处 `match`。
//! - 抓取结果经 `tokio::sync::mpsc` 回到持有存储的一方，工作线程不持有存储句柄。

mod actions;
mod cache;
mod copy;
mod engine;
mod fetch;

pub use actions::{
    extract_first_url, format_email, format_phone, run_sync, ActionKind, ActionOutcome, ActionResult,
    TransformMode, DEFAULT_NOTIFY_MESSAGE, NO_URL_MESSAGE, TITLE_FAILED_MESSAGE,
};
pub use cache::{CompiledActionRule, CompiledCopyRule, RuleCache};
pub use copy::{apply_copy_rules, CopyRuleAction};
pub use engine::{apply_fetch_outcome, ActionEngine, ActionEvent};
pub use fetch::{extract_title, EngineConfig, FetchOutcome, TitleFetcher};
