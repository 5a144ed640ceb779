//! 动作自动化引擎
//!
//! # 设计思路
//!
//! `process` 按优先级遍历已启用的动作规则，每条命中的规则独立执行，规则之间
//! 没有提前退出：
//! - 同步动作立即得到结果并追加到返回列表；
//! - `FetchTitle` 先提取首个 URL，没有 URL 时同步返回一条提示，否则提交到抓取池
//!   后立即返回，结果稍后经通道送达。
//!
//! # 结果落库
//!
//! 抓取结果由持有引擎的一方通过 `drain_events` / `wait_event` 取回，在调用线程上
//! 写入 `url_title` 并转换为 `ActionEvent`。工作线程从不接触存储。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::db::{ClipboardStore, RuleTable};
use crate::error::AppError;

use super::actions::{
    extract_first_url, run_sync, ActionKind, ActionOutcome, ActionResult, NO_URL_MESSAGE,
    TITLE_FAILED_MESSAGE,
};
use super::cache::{CompiledActionRule, RuleCache};
use super::copy;
use super::fetch::{EngineConfig, FetchOutcome, TitleFetcher};

/// 异步动作完成后发给上层的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionEvent {
    pub rule_name: String,
    pub item_id: Option<i64>,
    pub outcome: ActionOutcome,
}

pub struct ActionEngine {
    store: Arc<ClipboardStore>,
    cache: RuleCache,
    fetcher: TitleFetcher,
    results: UnboundedReceiver<FetchOutcome>,
    pending: usize,
}

/// 持久化抓取结果并转换为事件；标题为空、条目未知或写库失败都报告为提示
pub fn apply_fetch_outcome(store: &ClipboardStore, outcome: FetchOutcome) -> ActionEvent {
    let FetchOutcome { rule_name, item_id, url, title } = outcome;
    let failed = ActionOutcome::Notify { message: TITLE_FAILED_MESSAGE.to_string() };

    let outcome = match (title, item_id) {
        (Some(title), Some(id)) => match store.update_url_title(id, &title) {
            Ok(_) => {
                log::debug!("已写入链接标题: {} -> {}", url, title);
                ActionOutcome::Title { title }
            }
            Err(err) => {
                log::warn!("写入链接标题失败 (id={}): {}", id, err);
                failed
            }
        },
        _ => failed,
    };

    ActionEvent { rule_name, item_id, outcome }
}

impl ActionEngine {
    pub fn new(store: Arc<ClipboardStore>, config: &EngineConfig) -> Result<Self, AppError> {
        let (fetcher, results) = TitleFetcher::new(config)?;
        Ok(Self {
            cache: RuleCache::new(store.clone()),
            store,
            fetcher,
            results,
            pending: 0,
        })
    }

    pub fn store(&self) -> &Arc<ClipboardStore> {
        &self.store
    }

    /// 对捕获文本执行所有命中的动作规则，返回同步结果
    ///
    /// 规则加载失败时记录错误并返回空列表，不影响捕获本身。
    pub fn process(&mut self, text: &str, item_id: Option<i64>) -> Vec<ActionResult> {
        let rules = match self.cache.action_rules() {
            Ok(rules) => rules,
            Err(err) => {
                log::error!("加载动作规则失败: {}", err);
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for rule in rules.iter().filter(|r| r.enabled) {
            if !rule.regex.is_match(text) {
                continue;
            }
            if let Some(outcome) = self.run_rule(rule, text, item_id) {
                results.push(ActionResult { rule_name: rule.name.clone(), outcome });
            }
        }
        results
    }

    fn run_rule(&mut self, rule: &CompiledActionRule, text: &str, item_id: Option<i64>) -> Option<ActionOutcome> {
        match &rule.kind {
            ActionKind::FetchTitle => match extract_first_url(text) {
                Some(url) => {
                    log::debug!("规则 '{}' 提交标题抓取: {}", rule.name, url);
                    self.fetcher.submit(rule.name.clone(), item_id, url.to_string());
                    self.pending += 1;
                    None
                }
                None => Some(ActionOutcome::Notify { message: NO_URL_MESSAGE.to_string() }),
            },
            kind => run_sync(kind, text),
        }
    }

    /// 对文本应用复制规则；规则加载失败时原样返回
    pub fn apply_copy_rules(&mut self, text: &str) -> String {
        match self.cache.copy_rules() {
            Ok(rules) => copy::apply_copy_rules(&rules, text),
            Err(err) => {
                log::error!("加载复制规则失败: {}", err);
                text.to_string()
            }
        }
    }

    /// 丢弃动作规则快照并立即重载，返回可用规则数
    pub fn reload_rules(&mut self) -> Result<usize, AppError> {
        self.cache.invalidate_table(RuleTable::Action);
        Ok(self.cache.action_rules()?.len())
    }

    /// 已提交但尚未取回结果的抓取数
    pub fn pending_fetches(&self) -> usize {
        self.pending
    }

    fn finish(&mut self, outcome: FetchOutcome) -> ActionEvent {
        self.pending = self.pending.saturating_sub(1);
        apply_fetch_outcome(&self.store, outcome)
    }

    /// 非阻塞地取回所有已完成的抓取结果
    pub fn drain_events(&mut self) -> Vec<ActionEvent> {
        let mut events = Vec::new();
        while let Ok(outcome) = self.results.try_recv() {
            events.push(self.finish(outcome));
        }
        events
    }

    /// 阻塞等待下一个抓取结果，最多 `timeout`
    pub fn wait_event(&mut self, timeout: Duration) -> Option<ActionEvent> {
        let results = &mut self.results;
        let outcome = self
            .fetcher
            .block_on(async { tokio::time::timeout(timeout, results.recv()).await })
            .ok()
            .flatten()?;
        Some(self.finish(outcome))
    }

    /// 关闭抓取池；进行中的请求最多再等 `timeout`，之后被放弃
    pub fn shutdown(self, timeout: Duration) {
        if self.pending > 0 {
            log::info!("关闭动作引擎，放弃 {} 个未完成的标题抓取", self.pending);
        }
        self.fetcher.shutdown(timeout);
    }
}
