//! 数据访问边界
//!
//! 核心子系统不拥有持久化存储：订单和库存通过这里的 trait 读写，
//! 真正的存储实现由外部提供。进程内自带 [`MemoryStore`]，
//! 用于开发运行和测试。

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::Order;

/// 库存条目（核心需要的最小视图）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    /// 商品 ID
    pub id: String,
    /// 商品名称（通知渲染用）
    pub name: String,
    /// 在手数量
    pub quantity: i64,
}

/// 数量写入的前后快照
#[derive(Debug, Clone, PartialEq)]
pub struct QuantitySwap {
    /// 写入前的数量
    pub previous: i64,
    /// 写入后的条目
    pub item: StockItem,
}

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("storage failure: {0}")]
    Storage(String),
}

/// 订单存取边界
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 按 ID 读取订单
    async fn fetch(&self, id: &str) -> Result<Option<Order>, RepositoryError>;

    /// 写入（插入或覆盖）订单
    async fn store(&self, order: &Order) -> Result<(), RepositoryError>;
}

/// 库存存取边界
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// 按商品 ID 读取库存条目
    async fn fetch(&self, id: &str) -> Result<Option<StockItem>, RepositoryError>;

    /// 写入（插入或覆盖）库存条目
    async fn store(&self, item: &StockItem) -> Result<(), RepositoryError>;

    /// 原子地写入新数量，返回前后快照
    ///
    /// 阈值评估依赖 (previous, new) 成对出现，读与写必须是同一个
    /// 原子操作，否则并发写之间会漏掉或重复越界事件。
    /// 商品不存在时返回 `Ok(None)`。
    async fn swap_quantity(
        &self,
        id: &str,
        quantity: i64,
    ) -> Result<Option<QuantitySwap>, RepositoryError>;
}
