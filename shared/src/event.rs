//! 领域事件
//!
//! 业务层（状态机、库存评估器）产生的内部事实，由通知分发器消费。
//! 领域事件不直接上线，分发器负责渲染成 Notification 再交给广播器。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::order::OrderState;

/// 库存水平（派生值，不落库）
///
/// 阈值是固定常量，分类是纯函数：相同数量永远得到相同水平。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockLevel {
    /// 已耗尽 (0)
    Depleted,
    /// 偏低 (1..=2)
    Low,
    /// 充足 (>2)
    Sufficient,
}

impl StockLevel {
    /// Low 水平的数量上限（含）
    pub const LOW_MAX: i64 = 2;

    /// 把在手数量分类为库存水平
    pub fn classify(quantity: i64) -> Self {
        if quantity <= 0 {
            StockLevel::Depleted
        } else if quantity <= Self::LOW_MAX {
            StockLevel::Low
        } else {
            StockLevel::Sufficient
        }
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockLevel::Depleted => write!(f, "DEPLETED"),
            StockLevel::Low => write!(f, "LOW"),
            StockLevel::Sufficient => write!(f, "SUFFICIENT"),
        }
    }
}

/// 领域事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    /// 订单完成了一次合法状态转换
    OrderTransitioned {
        order_id: String,
        client_id: String,
        from: OrderState,
        to: OrderState,
        /// 转换时间（毫秒）
        at: i64,
    },
    /// 库存数量跨越了水平阈值（边沿触发）
    StockLevelCrossed {
        product_id: String,
        product_name: String,
        level: StockLevel,
        quantity: i64,
        /// 评估时间（毫秒）
        at: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(StockLevel::classify(0), StockLevel::Depleted);
        assert_eq!(StockLevel::classify(-3), StockLevel::Depleted);
        assert_eq!(StockLevel::classify(1), StockLevel::Low);
        assert_eq!(StockLevel::classify(2), StockLevel::Low);
        assert_eq!(StockLevel::classify(3), StockLevel::Sufficient);
        assert_eq!(StockLevel::classify(100), StockLevel::Sufficient);
    }

    #[test]
    fn test_classify_is_idempotent() {
        for qty in [-1, 0, 1, 2, 3, 50] {
            assert_eq!(StockLevel::classify(qty), StockLevel::classify(qty));
        }
    }
}
