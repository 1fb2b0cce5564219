//! StockMonitor - 库存写入与阈值联动
//!
//! 数量变更先经存储层原子落地（拿到前后快照），再交评估器
//! 判断是否越界。评估器产出的事件直接转给分发器：对写入方
//! 而言告警是 fire-and-forget，不影响写入结果。

use std::sync::Arc;

use super::{StockError, evaluate};
use crate::notify::NotificationDispatcher;
use crate::repository::{StockItem, StockRepository};

/// 库存监视器
pub struct StockMonitor {
    repo: Arc<dyn StockRepository>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl std::fmt::Debug for StockMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockMonitor").finish()
    }
}

impl StockMonitor {
    pub fn new(repo: Arc<dyn StockRepository>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { repo, dispatcher }
    }

    /// 读取库存条目
    pub async fn get(&self, product_id: &str) -> Result<StockItem, StockError> {
        self.repo
            .fetch(product_id)
            .await?
            .ok_or_else(|| StockError::NotFound(product_id.to_string()))
    }

    /// 建档（或覆盖）库存条目
    ///
    /// 建档不评估阈值：初始量不是一次“变更”。
    pub async fn register(&self, item: StockItem) -> Result<StockItem, StockError> {
        self.repo.store(&item).await?;
        tracing::info!(product_id = %item.id, quantity = item.quantity, "Stock item registered");
        Ok(item)
    }

    /// 写入新数量并评估阈值
    ///
    /// 返回更新后的条目。越界事件转给分发器，恢复与同水平写入静默。
    pub async fn set_quantity(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> Result<StockItem, StockError> {
        let swap = self
            .repo
            .swap_quantity(product_id, quantity)
            .await?
            .ok_or_else(|| StockError::NotFound(product_id.to_string()))?;

        if let Some(event) = evaluate(
            &swap.item.id,
            &swap.item.name,
            swap.previous,
            swap.item.quantity,
        ) {
            self.dispatcher.dispatch(event);
        }

        Ok(swap.item)
    }
}
