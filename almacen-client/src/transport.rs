//! Transport 传输层抽象
//!
//! 连接管理器只依赖「打开一条字节流」这个能力：
//!
//! ```text
//!         ┌────────────────────┐
//!         │  EventTransport    │  ◄── 可插拔接口
//!         └────────┬───────────┘
//!                  │
//!         ┌────────┴────────┐
//!         ▼                 ▼
//!   HttpTransport      测试替身 (内存脚本流)
//!   (reqwest 长连接)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};

use crate::error::ClientError;

/// 入站字节流
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// 事件流传输层特征
///
/// `open` 每次调用建立一条全新的流；重连就是再 open 一次。
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    async fn open(&self) -> Result<ByteStream, ClientError>;
}

/// 共享所有权转发：`Arc<T>` 与被包裹的传输层行为一致，
/// 使同一个传输层实例可以被克隆共享（如测试中持有一个副本做断言）。
#[async_trait]
impl<T: EventTransport + ?Sized> EventTransport for Arc<T> {
    async fn open(&self) -> Result<ByteStream, ClientError> {
        (**self).open().await
    }
}

/// HTTP 长连接传输 (GET /api/events, text/event-stream)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl HttpTransport {
    /// # 参数
    /// - `base_url`: 服务端地址，如 `http://localhost:3000`
    /// - `token`: Bearer 访问令牌（订阅者身份）
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/api/events", base_url.trim_end_matches('/')),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn open(&self) -> Result<ByteStream, ClientError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::ConnectionLost(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| ClientError::Rejected(e.to_string()))?;

        Ok(response
            .bytes_stream()
            .map_err(|e| ClientError::ConnectionLost(e.to_string()))
            .boxed())
    }
}
