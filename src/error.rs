//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 存储层、规则层、抓取层的公开函数统一返回 `Result<T, AppError>`，
//! 上层（UI / IPC）通过 `Serialize` 获得结构化的错误信息。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - `std::io::Error` 通过 `From` 自动转换，备份与目录操作可直接 `?`。
//! - 实现 `Serialize` 将错误序列化为字符串，便于跨进程边界传递。

use serde::Serialize;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 数据库操作失败（事务已回滚，存储仍可继续使用）
    #[error("数据库错误: {0}")]
    Database(String),

    /// 备份目录或数据文件不可用
    #[error("存储错误: {0}")]
    Storage(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 批量操作违反不变量（例如对未置顶条目重排），整批被拒绝
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 用户编写的规则无法解析
    #[error("规则错误: {0}")]
    Rule(String),

    /// 网络请求失败
    #[error("网络错误: {0}")]
    Network(String),

    /// 配置读取或解析失败
    #[error("配置错误: {0}")]
    Config(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::InvalidInput("重复的 id".to_string());
        let json = serde_json::to_string(&err).expect("serialize error");
        assert_eq!(json, "\"无效输入: 重复的 id\"");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
    }
}
