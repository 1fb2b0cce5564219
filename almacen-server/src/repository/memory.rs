//! 进程内存储实现
//!
//! 用 DashMap 支撑两个存取边界。swap_quantity 依赖 DashMap 的
//! 分片写锁保证读改写原子性。

use async_trait::async_trait;
use dashmap::DashMap;
use shared::Order;

use super::{OrderRepository, QuantitySwap, RepositoryError, StockItem, StockRepository};

/// 内存存储（订单 + 库存）
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: DashMap<String, Order>,
    stock: DashMap<String, StockItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn fetch(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.get(id).map(|entry| entry.clone()))
    }

    async fn store(&self, order: &Order) -> Result<(), RepositoryError> {
        self.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }
}

#[async_trait]
impl StockRepository for MemoryStore {
    async fn fetch(&self, id: &str) -> Result<Option<StockItem>, RepositoryError> {
        Ok(self.stock.get(id).map(|entry| entry.clone()))
    }

    async fn store(&self, item: &StockItem) -> Result<(), RepositoryError> {
        self.stock.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn swap_quantity(
        &self,
        id: &str,
        quantity: i64,
    ) -> Result<Option<QuantitySwap>, RepositoryError> {
        // get_mut 持有分片写锁，读旧值和写新值之间不会插入其他写
        match self.stock.get_mut(id) {
            Some(mut entry) => {
                let previous = entry.quantity;
                entry.quantity = quantity;
                Ok(Some(QuantitySwap {
                    previous,
                    item: entry.clone(),
                }))
            }
            None => Ok(None),
        }
    }
}
