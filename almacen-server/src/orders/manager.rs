//! OrderManager - 订单状态转换的唯一入口
//!
//! # 转换流程
//!
//! ```text
//! transition(order_id, target)
//!     ├─ 1. 取该订单的互斥锁（按订单串行化）
//!     ├─ 2. 读取当前状态
//!     ├─ 3. 校验转换表（表外 → InvalidTransition）
//!     ├─ 4. 应用新状态 + 时间戳，写回存储
//!     ├─ 5. 终态则回收锁条目
//!     └─ 6. 发出恰好一个 OrderTransitioned 事件
//! ```
//!
//! 同一订单上的两个并发转换请求：锁保证其中一个先完成，
//! 另一个重读到已前进的状态，撞表失败，绝不双重生效。

use std::sync::Arc;

use dashmap::DashMap;
use shared::util::now_millis;
use shared::{DomainEvent, Order, OrderState};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::OrderError;
use crate::notify::NotificationDispatcher;
use crate::repository::OrderRepository;

/// 订单管理器
pub struct OrderManager {
    repo: Arc<dyn OrderRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    /// 每订单一把锁；终态后回收
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for OrderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderManager")
            .field("locks", &self.locks.len())
            .finish()
    }
}

impl OrderManager {
    pub fn new(repo: Arc<dyn OrderRepository>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            repo,
            dispatcher,
            locks: DashMap::new(),
        }
    }

    /// 下单（外部触发；初始状态 Emitted，不产生通知）
    pub async fn place(
        &self,
        client_id: &str,
        lines: serde_json::Value,
    ) -> Result<Order, OrderError> {
        let order = Order::new(Uuid::new_v4().to_string(), client_id, lines);
        self.repo.store(&order).await?;
        tracing::info!(order_id = %order.id, client_id = %client_id, "Order placed");
        Ok(order)
    }

    /// 读取订单
    pub async fn get(&self, order_id: &str) -> Result<Order, OrderError> {
        self.repo
            .fetch(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    /// 应用一次状态转换
    ///
    /// 成功返回更新后的订单并发出恰好一个 `OrderTransitioned`；
    /// 表外转换返回 `InvalidTransition{from, to}`，订单保持原状。
    pub async fn transition(
        &self,
        order_id: &str,
        target: OrderState,
    ) -> Result<Order, OrderError> {
        let lock = self
            .locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut order = self
            .repo
            .fetch(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        let from = order.state;
        if !from.can_transition(target) {
            tracing::warn!(
                order_id = %order_id,
                %from,
                to = %target,
                "Rejected invalid order transition"
            );
            return Err(OrderError::InvalidTransition { from, to: target });
        }

        order.state = target;
        order.state_changed_at = now_millis();
        self.repo.store(&order).await?;

        if target.is_terminal() {
            // 终态订单不再转换，锁条目没有存在价值
            self.locks.remove(order_id);
        }

        tracing::info!(order_id = %order_id, %from, to = %target, "Order transitioned");

        self.dispatcher.dispatch(DomainEvent::OrderTransitioned {
            order_id: order.id.clone(),
            client_id: order.client_id.clone(),
            from,
            to: target,
            at: order.state_changed_at,
        });

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{EventBroadcaster, TemplateRegistry};
    use crate::repository::MemoryStore;
    use std::time::Duration;

    fn manager() -> OrderManager {
        let broadcaster = Arc::new(EventBroadcaster::new(8, Duration::from_secs(30)));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            TemplateRegistry::with_defaults(),
            broadcaster,
        ));
        OrderManager::new(Arc::new(MemoryStore::new()), dispatcher)
    }

    #[tokio::test]
    async fn test_happy_path_to_delivered() {
        let manager = manager();
        let order = manager.place("cli-1", serde_json::json!([])).await.unwrap();

        for target in [
            OrderState::Confirmed,
            OrderState::InProduction,
            OrderState::ReadyForDelivery,
            OrderState::Delivered,
        ] {
            let updated = manager.transition(&order.id, target).await.unwrap();
            assert_eq!(updated.state, target);
        }
    }

    #[tokio::test]
    async fn test_invalid_transition_leaves_order_unchanged() {
        let manager = manager();
        let order = manager.place("cli-1", serde_json::json!([])).await.unwrap();

        let err = manager
            .transition(&order.id, OrderState::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderState::Emitted,
                to: OrderState::Delivered,
            }
        ));

        let unchanged = manager.get(&order.id).await.unwrap();
        assert_eq!(unchanged.state, OrderState::Emitted);
        assert_eq!(unchanged.state_changed_at, order.state_changed_at);
    }

    #[tokio::test]
    async fn test_terminal_states_reject_everything() {
        let manager = manager();
        let order = manager.place("cli-1", serde_json::json!([])).await.unwrap();
        manager
            .transition(&order.id, OrderState::Cancelled)
            .await
            .unwrap();

        for target in [
            OrderState::Confirmed,
            OrderState::InProduction,
            OrderState::ReadyForDelivery,
            OrderState::Delivered,
            OrderState::Emitted,
        ] {
            let err = manager.transition(&order.id, target).await.unwrap_err();
            assert!(matches!(err, OrderError::InvalidTransition { .. }));
        }
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let manager = manager();
        let err = manager
            .transition("no-existe", OrderState::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_transitions_exactly_one_wins() {
        let manager = Arc::new(manager());
        let order = manager.place("cli-1", serde_json::json!([])).await.unwrap();

        // 同一源状态、同一目标，并发竞争：后到者重读时源状态已前进
        let m1 = Arc::clone(&manager);
        let m2 = Arc::clone(&manager);
        let id1 = order.id.clone();
        let id2 = order.id.clone();

        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { m1.transition(&id1, OrderState::Confirmed).await }),
            tokio::spawn(async move { m2.transition(&id2, OrderState::Confirmed).await }),
        );
        let r1 = r1.unwrap();
        let r2 = r2.unwrap();

        // 恰好一个成功，另一个观察到已前进的状态
        assert_eq!(r1.is_ok() as u8 + r2.is_ok() as u8, 1);
        let loser = if r1.is_ok() { r2 } else { r1 };
        assert!(matches!(
            loser.unwrap_err(),
            OrderError::InvalidTransition { .. }
        ));
    }
}
