//! 捕获流水线：文本 → 复制规则 → 类型识别 → 入库 → 动作规则

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::db::{ClipboardStore, ItemType};
use crate::error::AppError;
use crate::rules::{ActionEngine, ActionEvent, ActionResult, EngineConfig};

use super::classify::classify_text;

/// 图片条目的占位文本
pub const IMAGE_PLACEHOLDER: &str = "[이미지 캡처됨]";

/// 一次捕获的结果
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResult {
    pub item_id: i64,
    pub item_type: ItemType,
    /// 同步动作的结果；异步动作稍后通过 `drain_events` 送达
    pub actions: Vec<ActionResult>,
}

pub struct CapturePipeline {
    engine: ActionEngine,
}

impl CapturePipeline {
    pub fn new(store: Arc<ClipboardStore>, config: &EngineConfig) -> Result<Self, AppError> {
        Ok(Self { engine: ActionEngine::new(store, config)? })
    }

    pub fn store(&self) -> &Arc<ClipboardStore> {
        self.engine.store()
    }

    pub fn engine_mut(&mut self) -> &mut ActionEngine {
        &mut self.engine
    }

    /// 处理一段剪贴板文本；去空白后为空（或被复制规则清空）时返回 `Ok(None)`
    pub fn capture_text(&mut self, raw: &str) -> Result<Option<CaptureResult>, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let text = self.engine.apply_copy_rules(trimmed);
        if text.trim().is_empty() {
            log::debug!("复制规则处理后内容为空，跳过保存");
            return Ok(None);
        }

        let item_type = classify_text(&text);
        let item_id = self.engine.store().add_item(Some(&text), None, item_type)?;
        let actions = self.engine.process(&text, Some(item_id));
        if !actions.is_empty() {
            log::info!("条目 {} 触发 {} 个动作", item_id, actions.len());
        }

        Ok(Some(CaptureResult { item_id, item_type, actions }))
    }

    /// 保存一张已编码的图片；图片不参与去重和动作规则
    pub fn capture_image(&mut self, image_data: &[u8]) -> Result<Option<CaptureResult>, AppError> {
        if image_data.is_empty() {
            return Ok(None);
        }
        let item_id = self
            .engine
            .store()
            .add_item(Some(IMAGE_PLACEHOLDER), Some(image_data), ItemType::Image)?;
        Ok(Some(CaptureResult { item_id, item_type: ItemType::Image, actions: Vec::new() }))
    }

    pub fn drain_events(&mut self) -> Vec<ActionEvent> {
        self.engine.drain_events()
    }

    pub fn wait_event(&mut self, timeout: Duration) -> Option<ActionEvent> {
        self.engine.wait_event(timeout)
    }

    pub fn shutdown(self, timeout: Duration) {
        self.engine.shutdown(timeout);
    }
}
