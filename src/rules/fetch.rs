//! 网页标题抓取池
//!
//! # 设计思路
//!
//! 抓取在独立的 tokio 多线程运行时上执行，线程数有上限，提交任务不阻塞调用线程。
//! 每个任务只持有 HTTP 客户端和结果发送端：这里不引用存储类型，工作线程在类型层面
//! 就不可能写库。结果通过 `mpsc` 通道交还给持有存储的一方统一落库。
//!
//! # 错误语义
//!
//! 连接超时、读取超时、HTTP 错误状态、传输错误一律降级为 `title: None`，
//! 不会在运行时内部抛出。

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::AppError;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("title 正则"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("空白正则"));

pub const DEFAULT_FETCH_WORKERS: usize = 4;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// 抓取池配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub worker_threads: usize,
    pub connect_timeout: Duration,
    /// 整个请求（含读取响应体）的超时
    pub request_timeout: Duration,
    pub user_agent: String,
    /// 是否遵循系统代理设置
    pub use_system_proxy: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_FETCH_WORKERS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            use_system_proxy: true,
        }
    }
}

/// 一次抓取的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub rule_name: String,
    pub item_id: Option<i64>,
    pub url: String,
    pub title: Option<String>,
}

/// 从 HTML 中提取 `<title>`，解码实体（命名与数字）并折叠空白；空标题视为没有
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let decoded = html_escape::decode_html_entities(raw);
    let title = WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string();
    if title.is_empty() { None } else { Some(title) }
}

async fn fetch_title(client: &reqwest::Client, url: &str) -> Result<Option<String>, reqwest::Error> {
    let body = client.get(url).send().await?.error_for_status()?.text().await?;
    Ok(extract_title(&body))
}

pub struct TitleFetcher {
    runtime: Runtime,
    client: reqwest::Client,
    sender: UnboundedSender<FetchOutcome>,
}

impl TitleFetcher {
    /// 创建抓取池，同时返回结果接收端
    pub fn new(config: &EngineConfig) -> Result<(Self, UnboundedReceiver<FetchOutcome>), AppError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("smartclip-fetch")
            .enable_all()
            .build()
            .map_err(|e| AppError::Config(format!("创建抓取线程池失败: {}", e)))?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Network(format!("创建 HTTP 客户端失败: {}", e)))?;

        let (sender, receiver) = unbounded_channel();
        Ok((Self { runtime, client, sender }, receiver))
    }

    /// 提交抓取任务后立即返回
    pub fn submit(&self, rule_name: String, item_id: Option<i64>, url: String) {
        let client = self.client.clone();
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let title = match fetch_title(&client, &url).await {
                Ok(title) => title,
                Err(err) => {
                    log::debug!("抓取标题失败 {}: {}", url, err);
                    None
                }
            };
            // 接收端已关闭说明引擎正在退出，结果直接丢弃
            let _ = sender.send(FetchOutcome { rule_name, item_id, url, title });
        });
    }

    /// 在抓取运行时上阻塞等待一个 future，供同步调用方带超时地等待结果
    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// 关闭运行时；进行中的请求最多再等 `timeout`
    pub fn shutdown(self, timeout: Duration) {
        self.runtime.shutdown_timeout(timeout);
    }
}
