//! 剪贴板捕获模块
//!
//! # 设计思路
//!
//! 平台相关的剪贴板监听不在本库内，宿主只需要：
//! - 在系统通知剪贴板变化时调用 `Debouncer::notify`；
//! - 在去抖回调里读出剪贴板内容，交给 `CapturePipeline`。
//!
//! # 实现思路
//!
//! - 类型识别归 `classify`，去抖归 `debounce`，入库与动作归 `pipeline`。
//! - 流水线持有动作引擎，引擎持有存储句柄；异步动作结果由流水线的持有者取回。

pub mod classify;
pub mod debounce;
pub mod pipeline;

pub use classify::classify_text;
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_DELAY};
pub use pipeline::{CapturePipeline, CaptureResult, IMAGE_PLACEHOLDER};
