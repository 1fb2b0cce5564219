//! 重连策略
//!
//! 有界重试：固定间隔（默认 5s）最多尝试 max_attempts 次
//! （默认 5 次），耗尽后由连接管理器进入 Failed 终态。
//! 可选指数退避作为加强，封顶 max_interval。

use std::time::Duration;

/// 重连配置
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// 基础重试间隔
    pub interval: Duration,
    /// 最大重试次数（0 = 不重试）
    pub max_attempts: u32,
    /// 是否指数退避（interval, 2·interval, 4·interval, …）
    pub exponential: bool,
    /// 指数退避的间隔上限
    pub max_interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 5,
            exponential: false,
            max_interval: Duration::from_secs(60),
        }
    }
}

impl ReconnectConfig {
    /// 从环境变量加载（缺省用默认值）
    ///
    /// | 环境变量 | 默认值 |
    /// |----------|--------|
    /// | RECONNECT_INTERVAL_SECS | 5 |
    /// | RECONNECT_MAX_ATTEMPTS | 5 |
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = std::env::var("RECONNECT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(n) = std::env::var("RECONNECT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_attempts = n;
        }
        config
    }
}

/// 重连策略状态
///
/// 连接成功打开后调用 [`reset`](Self::reset) 把计数清零；
/// 手动 reconnect 也走同一个 reset。
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_interval: Duration,
    attempt_count: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        let current_interval = config.interval;
        Self {
            config,
            current_interval,
            attempt_count: 0,
        }
    }

    /// 下一次重试前的等待时长
    ///
    /// 超出 max_attempts 返回 `None`，调用方据此进入 Failed。
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt_count >= self.config.max_attempts {
            return None;
        }

        self.attempt_count += 1;
        let delay = self.current_interval;

        if self.config.exponential {
            self.current_interval = (self.current_interval * 2).min(self.config.max_interval);
        }

        Some(delay)
    }

    /// 连接成功（或手动 reconnect）后清零
    pub fn reset(&mut self) {
        self.attempt_count = 0;
        self.current_interval = self.config.interval;
    }

    /// 已尝试次数
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// 是否还有重试额度
    pub fn should_retry(&self) -> bool {
        self.attempt_count < self.config.max_attempts
    }
}
