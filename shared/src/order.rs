//! 订单生命周期类型
//!
//! 订单 (Pedido) 的状态机定义。转换表是封闭的：表外的任何边都非法，
//! 校验本身是纯函数，真正的并发控制在 almacen-server 的 OrderManager。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::now_millis;

/// 订单状态（封闭枚举）
///
/// 终态 (`Cancelled`, `Delivered`) 的订单保留不删除。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// 已下单，等待确认
    Emitted,
    /// 已确认
    Confirmed,
    /// 生产中
    InProduction,
    /// 已取消（终态）
    Cancelled,
    /// 备货完成，等待配送
    ReadyForDelivery,
    /// 已送达（终态）
    Delivered,
}

impl OrderState {
    /// 当前状态允许转换到的目标状态集合
    ///
    /// 这张表是完备的，状态机不接受表外转换。
    pub fn allowed_targets(&self) -> &'static [OrderState] {
        match self {
            OrderState::Emitted => &[OrderState::Confirmed, OrderState::Cancelled],
            OrderState::Confirmed => &[OrderState::InProduction, OrderState::Cancelled],
            OrderState::InProduction => &[OrderState::ReadyForDelivery, OrderState::Cancelled],
            OrderState::ReadyForDelivery => &[OrderState::Delivered],
            OrderState::Cancelled | OrderState::Delivered => &[],
        }
    }

    /// 检查到目标状态的转换是否合法
    pub fn can_transition(&self, to: OrderState) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// 是否终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Cancelled | OrderState::Delivered)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Emitted => write!(f, "EMITTED"),
            OrderState::Confirmed => write!(f, "CONFIRMED"),
            OrderState::InProduction => write!(f, "IN_PRODUCTION"),
            OrderState::Cancelled => write!(f, "CANCELLED"),
            OrderState::ReadyForDelivery => write!(f, "READY_FOR_DELIVERY"),
            OrderState::Delivered => write!(f, "DELIVERED"),
        }
    }
}

/// 订单聚合
///
/// `state` 只能通过 OrderManager::transition 变更，不允许直接覆写。
/// `lines` 对核心子系统是不透明载荷（行项目由 CRUD 层维护）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 订单 ID
    pub id: String,
    /// 所属客户 ID
    pub client_id: String,
    /// 当前生命周期状态
    pub state: OrderState,
    /// 最近一次状态变更时间（毫秒）
    pub state_changed_at: i64,
    /// 行项目载荷（核心不解析）
    #[serde(default)]
    pub lines: serde_json::Value,
}

impl Order {
    /// 创建新订单（初始状态 Emitted）
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        lines: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            state: OrderState::Emitted,
            state_changed_at: now_millis(),
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [OrderState; 6] = [
        OrderState::Emitted,
        OrderState::Confirmed,
        OrderState::InProduction,
        OrderState::Cancelled,
        OrderState::ReadyForDelivery,
        OrderState::Delivered,
    ];

    #[test]
    fn test_transition_table() {
        assert!(OrderState::Emitted.can_transition(OrderState::Confirmed));
        assert!(OrderState::Emitted.can_transition(OrderState::Cancelled));
        assert!(OrderState::Confirmed.can_transition(OrderState::InProduction));
        assert!(OrderState::Confirmed.can_transition(OrderState::Cancelled));
        assert!(OrderState::InProduction.can_transition(OrderState::ReadyForDelivery));
        assert!(OrderState::InProduction.can_transition(OrderState::Cancelled));
        assert!(OrderState::ReadyForDelivery.can_transition(OrderState::Delivered));
    }

    #[test]
    fn test_terminal_states_have_no_targets() {
        for to in ALL_STATES {
            assert!(!OrderState::Cancelled.can_transition(to));
            assert!(!OrderState::Delivered.can_transition(to));
        }
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Delivered.is_terminal());
    }

    #[test]
    fn test_rejected_edges() {
        // 不允许跳级或回退
        assert!(!OrderState::Emitted.can_transition(OrderState::InProduction));
        assert!(!OrderState::Emitted.can_transition(OrderState::Delivered));
        assert!(!OrderState::Confirmed.can_transition(OrderState::Emitted));
        assert!(!OrderState::ReadyForDelivery.can_transition(OrderState::Cancelled));
        assert!(!OrderState::Delivered.can_transition(OrderState::Emitted));
    }

    #[test]
    fn test_state_serde_screaming_snake() {
        let json = serde_json::to_string(&OrderState::ReadyForDelivery)
            .expect("serialize state");
        assert_eq!(json, "\"READY_FOR_DELIVERY\"");
        let back: OrderState = serde_json::from_str(&json).expect("deserialize state");
        assert_eq!(back, OrderState::ReadyForDelivery);
    }
}
