//! 客户端配置

use crate::reconnect::ReconnectConfig;

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 服务端地址，如 `http://localhost:3000`
    pub base_url: String,
    /// Bearer 访问令牌
    pub token: String,
    /// 重连策略配置
    pub reconnect: ReconnectConfig,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            reconnect: ReconnectConfig::from_env(),
        }
    }

    /// 覆盖重连配置
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}
