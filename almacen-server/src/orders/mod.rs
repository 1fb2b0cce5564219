//! 订单生命周期子系统
//!
//! 状态转换表在 `shared::order`（纯函数），这里负责把它应用到
//! 可变订单上：按订单串行化、持久化、发出领域事件。

mod manager;

pub use manager::OrderManager;

use shared::OrderState;

use crate::repository::RepositoryError;

/// 订单操作错误
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// 转换表外的边：调用方逻辑/用法错误，必须上抛，不得自动重试
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderState, to: OrderState },

    #[error("order not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
