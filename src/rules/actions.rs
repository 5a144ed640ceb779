//! 动作类型与同步动作执行
//!
//! `ActionKind` 是闭合枚举，所有字符串到动作的解析集中在 `ActionKind::parse`，
//! 执行集中在 `run_sync` 的单个 `match` 中。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

pub const DEFAULT_NOTIFY_MESSAGE: &str = "패턴 매칭됨";
pub const NO_URL_MESSAGE: &str = "URL을 찾지 못해 제목 가져오기를 건너뛰었습니다.";
pub const TITLE_FAILED_MESSAGE: &str = "URL 제목을 가져오지 못했습니다.";

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s<>'"\])]+"#).expect("URL 正则")
});

/// 文本变换模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Trim,
    Upper,
    Lower,
}

impl TransformMode {
    fn parse(mode: &str) -> Option<Self> {
        match mode {
            "trim" => Some(Self::Trim),
            "upper" => Some(Self::Upper),
            "lower" => Some(Self::Lower),
            _ => None,
        }
    }

    fn apply(self, text: &str) -> String {
        match self {
            Self::Trim => text.trim().to_string(),
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
        }
    }
}

/// 动作规则声明的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// 异步抓取首个 URL 的网页标题
    FetchTitle,
    FormatPhone,
    FormatEmail,
    Notify { message: String },
    Transform(TransformMode),
}

impl ActionKind {
    /// 由存储的 `action_type` 与已解析的参数构造动作
    pub fn parse(action_type: &str, params: &Value) -> Result<Self, AppError> {
        match action_type.trim() {
            "fetch_title" => Ok(Self::FetchTitle),
            "format_phone" => Ok(Self::FormatPhone),
            "format_email" => Ok(Self::FormatEmail),
            "notify" => Ok(Self::Notify {
                message: params
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_NOTIFY_MESSAGE)
                    .to_string(),
            }),
            "transform" => {
                let mode = params.get("mode").and_then(Value::as_str).unwrap_or("trim");
                TransformMode::parse(mode)
                    .map(Self::Transform)
                    .ok_or_else(|| AppError::Rule(format!("未知的变换模式: {}", mode)))
            }
            other => Err(AppError::Rule(format!("未知的动作类型: {}", other))),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Self::FetchTitle)
    }
}

/// 动作参数；缺失或不是合法 JSON 时视为空对象
pub fn parse_params(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        log::debug!("动作参数不是合法 JSON，按空参数处理: {}", e);
        Value::Object(Default::default())
    })
}

/// 动作产出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionOutcome {
    Notify { message: String },
    Format { original: String, formatted: String },
    Transform { result: String },
    Title { title: String },
}

/// 一条规则命中后的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub rule_name: String,
    pub outcome: ActionOutcome,
}

pub fn extract_first_url(text: &str) -> Option<&str> {
    URL_RE.find(text).map(|m| m.as_str())
}

/// 11 位且以 010 开头 → 3-4-4；10 位 → 3-3-4；其它长度不处理
pub fn format_phone(text: &str) -> Option<ActionOutcome> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    let formatted = match digits.len() {
        11 if digits.starts_with("010") => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
        10 => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        _ => return None,
    };
    Some(ActionOutcome::Format { original: text.to_string(), formatted })
}

pub fn format_email(text: &str) -> ActionOutcome {
    ActionOutcome::Format {
        original: text.to_string(),
        formatted: text.trim().to_lowercase(),
    }
}

/// 执行同步动作；`FetchTitle` 由引擎分派到抓取池，这里返回 `None`
pub fn run_sync(kind: &ActionKind, text: &str) -> Option<ActionOutcome> {
    match kind {
        ActionKind::FetchTitle => None,
        ActionKind::FormatPhone => format_phone(text),
        ActionKind::FormatEmail => Some(format_email(text)),
        ActionKind::Notify { message } => Some(ActionOutcome::Notify { message: message.clone() }),
        ActionKind::Transform(mode) => Some(ActionOutcome::Transform { result: mode.apply(text) }),
    }
}
