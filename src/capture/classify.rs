//! 文本类型识别
//!
//! # 设计思路
//!
//! 新捕获的文本按固定顺序判定类型，先命中者生效：
//! 1. 以 `http://` / `https://` 开头 → 链接
//! 2. 整段是十六进制色值、`rgb()` 或 `hsl()` → 颜色
//! 3. 含任一代码特征 → 代码
//! 4. 其余 → 文本
//!
//! # 实现思路
//!
//! - 代码特征使用 `RegexSet` 一次性匹配。
//! - 正则通过 `once_cell::sync::Lazy` 在首次调用时编译。

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

use crate::db::ItemType;

static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").expect("链接正则"));

/// 颜色格式：`#rgb` / `#rrggbb`、`rgb(r, g, b)`、`hsl(h, s%, l%)`
static COLOR_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"^#(?:[0-9a-fA-F]{3}){1,2}$",
        r"(?i)^rgb\s*\(\s*\d+\s*,\s*\d+\s*,\s*\d+\s*\)$",
        r"(?i)^hsl\s*\(\s*\d+\s*,\s*\d+%?\s*,\s*\d+%?\s*\)$",
    ])
    .expect("颜色正则")
});

/// 代码特征：常见声明关键字、花括号、箭头、导入语句
static CODE_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"def ",
        r"class ",
        r"function ",
        r"const ",
        r"let ",
        r"var ",
        r"[{}]",
        r"=>",
        r"import ",
        r"from ",
    ])
    .expect("代码特征正则")
});

pub fn is_color(text: &str) -> bool {
    COLOR_PATTERNS.is_match(text)
}

pub fn is_likely_code(text: &str) -> bool {
    CODE_PATTERNS.is_match(text)
}

/// 判定已去除首尾空白的文本类型
pub fn classify_text(text: &str) -> ItemType {
    if LINK_RE.is_match(text) {
        ItemType::Link
    } else if is_color(text) {
        ItemType::Color
    } else if is_likely_code(text) {
        ItemType::Code
    } else {
        ItemType::Text
    }
}
