//! 客户端错误类型

/// 连接管理器错误
///
/// 瞬时网络故障 (`ConnectionLost`) 完全在连接管理器内部消化，
/// 驱动有界重试；只有 `ReconnectExhausted` 作为终态上抛给
/// 调用方，要求人工处理。
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// 连接中断（瞬时，触发重试策略）
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// 服务端拒绝连接（HTTP 状态非 2xx，多为认证问题）
    #[error("connection rejected: {0}")]
    Rejected(String),

    /// 重试耗尽（终态，需要人工 reconnect）
    #[error("reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}
