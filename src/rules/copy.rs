//! 复制规则：入库前对捕获文本做规范化

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AppError;

use super::cache::CompiledCopyRule;

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*\r?\n[ \t]*").expect("换行正则"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyRuleAction {
    Trim,
    Lowercase,
    Uppercase,
    /// 把换行（含两侧空白）折叠为单个空格
    RemoveNewlines,
    /// 用规则的 `replacement` 替换所有匹配（支持 `$1` 捕获组引用）
    Replace,
}

impl CopyRuleAction {
    pub fn parse(action: &str) -> Result<Self, AppError> {
        match action.trim() {
            "trim" => Ok(Self::Trim),
            "lowercase" => Ok(Self::Lowercase),
            "uppercase" => Ok(Self::Uppercase),
            "remove_newlines" => Ok(Self::RemoveNewlines),
            "replace" => Ok(Self::Replace),
            other => Err(AppError::Rule(format!("未知的复制规则动作: {}", other))),
        }
    }
}

fn apply_one(rule: &CompiledCopyRule, text: &str) -> String {
    match rule.action {
        CopyRuleAction::Trim => text.trim().to_string(),
        CopyRuleAction::Lowercase => text.to_lowercase(),
        CopyRuleAction::Uppercase => text.to_uppercase(),
        CopyRuleAction::RemoveNewlines => LINE_BREAKS.replace_all(text, " ").into_owned(),
        CopyRuleAction::Replace => rule.regex.replace_all(text, rule.replacement.as_str()).into_owned(),
    }
}

/// 按优先级依次应用已启用且匹配的规则，每条规则作用于上一条的输出
pub fn apply_copy_rules(rules: &[CompiledCopyRule], text: &str) -> String {
    let mut current = text.to_string();
    for rule in rules.iter().filter(|r| r.enabled) {
        if rule.regex.is_match(&current) {
            let next = apply_one(rule, &current);
            if next != current {
                log::debug!("复制规则 '{}' 已应用", rule.name);
            }
            current = next;
        }
    }
    current
}
