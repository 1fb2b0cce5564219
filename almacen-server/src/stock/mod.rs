//! 库存阈值子系统
//!
//! 评估器 (`evaluator`) 是纯函数：比较写入前后的库存水平，
//! 只在越界时产出事件。监视器 (`monitor`) 负责把数量写入
//! 存储并把越界事件转给分发器。

mod evaluator;
mod monitor;

pub use evaluator::evaluate;
pub use monitor::StockMonitor;

use crate::repository::RepositoryError;

/// 库存操作错误
#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("product not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
