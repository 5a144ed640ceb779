//! 规则缓存
//!
//! # 设计思路
//!
//! 复制规则与动作规则各有一份快照，快照在加载时一次性编译正则，之后每次
//! 捕获直接复用。每份快照记录加载时存储的规则表版本号；读取时版本号不一致
//! （规则表被写过）或被显式 `invalidate` 过，就惰性重载。
//!
//! # 实现思路
//!
//! - 快照以 `Arc<[T]>` 交出，调用方遍历期间缓存可以被替换而互不影响。
//! - 单条规则的正则或动作无法解析时记录警告并跳过，不影响其它规则。

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::db::{ActionRuleRecord, ClipboardStore, CopyRuleRecord, RuleTable};
use crate::error::AppError;

use super::actions::{parse_params, ActionKind};
use super::copy::CopyRuleAction;

#[derive(Debug, Clone)]
pub struct CompiledCopyRule {
    pub id: i64,
    pub name: String,
    pub regex: Regex,
    pub action: CopyRuleAction,
    pub replacement: String,
    pub enabled: bool,
    pub priority: i64,
}

#[derive(Debug, Clone)]
pub struct CompiledActionRule {
    pub id: i64,
    pub name: String,
    pub regex: Regex,
    pub kind: ActionKind,
    pub params: Value,
    pub enabled: bool,
    pub priority: i64,
}

struct Snapshot<T> {
    generation: u64,
    rules: Arc<[T]>,
}

fn compile_pattern(rule_name: &str, pattern: &str) -> Result<Regex, AppError> {
    if pattern.is_empty() {
        return Err(AppError::Rule(format!("规则 '{}' 的正则为空", rule_name)));
    }
    Regex::new(pattern).map_err(|e| AppError::Rule(format!("规则 '{}' 的正则无效: {}", rule_name, e)))
}

fn compile_copy_rule(record: CopyRuleRecord) -> Result<CompiledCopyRule, AppError> {
    let regex = compile_pattern(&record.name, &record.pattern)?;
    let action = CopyRuleAction::parse(&record.action)?;
    Ok(CompiledCopyRule {
        id: record.id,
        name: record.name,
        regex,
        action,
        replacement: record.replacement,
        enabled: record.enabled,
        priority: record.priority,
    })
}

fn compile_action_rule(record: ActionRuleRecord) -> Result<CompiledActionRule, AppError> {
    let regex = compile_pattern(&record.name, &record.pattern)?;
    let params = parse_params(&record.action_params);
    let kind = ActionKind::parse(&record.action_type, &params)?;
    Ok(CompiledActionRule {
        id: record.id,
        name: record.name,
        regex,
        kind,
        params,
        enabled: record.enabled,
        priority: record.priority,
    })
}

/// 编译一批记录；失败的规则记录警告后跳过
fn compile_all<R, T>(records: Vec<R>, compile: fn(R) -> Result<T, AppError>) -> Arc<[T]> {
    records
        .into_iter()
        .filter_map(|record| match compile(record) {
            Ok(rule) => Some(rule),
            Err(err) => {
                log::warn!("跳过无效规则: {}", err);
                None
            }
        })
        .collect()
}

pub struct RuleCache {
    store: Arc<ClipboardStore>,
    copy: Option<Snapshot<CompiledCopyRule>>,
    actions: Option<Snapshot<CompiledActionRule>>,
}

impl RuleCache {
    pub fn new(store: Arc<ClipboardStore>) -> Self {
        Self { store, copy: None, actions: None }
    }

    /// 已编译的复制规则，按优先级从高到低
    pub fn copy_rules(&mut self) -> Result<Arc<[CompiledCopyRule]>, AppError> {
        let current = self.store.rules_generation(RuleTable::Copy);
        if let Some(snapshot) = self.copy.as_ref().filter(|s| s.generation == current) {
            return Ok(snapshot.rules.clone());
        }

        let rules = compile_all(self.store.get_copy_rules()?, compile_copy_rule);
        log::debug!("复制规则缓存已重载: {} 条", rules.len());
        self.copy = Some(Snapshot { generation: current, rules: rules.clone() });
        Ok(rules)
    }

    /// 已编译的动作规则，按优先级从高到低
    pub fn action_rules(&mut self) -> Result<Arc<[CompiledActionRule]>, AppError> {
        let current = self.store.rules_generation(RuleTable::Action);
        if let Some(snapshot) = self.actions.as_ref().filter(|s| s.generation == current) {
            return Ok(snapshot.rules.clone());
        }

        let rules = compile_all(self.store.get_action_rules()?, compile_action_rule);
        log::debug!("动作规则缓存已重载: {} 条", rules.len());
        self.actions = Some(Snapshot { generation: current, rules: rules.clone() });
        Ok(rules)
    }

    /// 标记两份快照失效，下次读取时重载
    pub fn invalidate(&mut self) {
        self.copy = None;
        self.actions = None;
    }

    pub fn invalidate_table(&mut self, table: RuleTable) {
        match table {
            RuleTable::Copy => self.copy = None,
            RuleTable::Action => self.actions = None,
        }
    }
}
