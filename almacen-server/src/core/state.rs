use std::sync::Arc;
use std::time::Duration;

use crate::auth::JwtService;
use crate::core::Config;
use crate::notify::{EventBroadcaster, NotificationDispatcher, TemplateRegistry};
use crate::orders::OrderManager;
use crate::repository::{MemoryStore, OrderRepository, StockRepository};
use crate::stock::StockMonitor;

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是进程的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | broadcaster | Arc<EventBroadcaster> | 事件广播器（连接注册表 + 心跳） |
/// | dispatcher | Arc<NotificationDispatcher> | 通知分发器（模板渲染 + 扇出） |
/// | orders | Arc<OrderManager> | 订单状态机 |
/// | stock | Arc<StockMonitor> | 库存监视器 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
///
/// 服务实例都是显式构造的，进程级生命周期：`initialize` 创建，
/// `shutdown` 取消后台任务并排空存活连接。
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 事件广播器
    pub broadcaster: Arc<EventBroadcaster>,
    /// 通知分发器
    pub dispatcher: Arc<NotificationDispatcher>,
    /// 订单管理器
    pub orders: Arc<OrderManager>,
    /// 库存监视器
    pub stock: Arc<StockMonitor>,
    /// JWT 认证服务
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按依赖顺序构建：
    /// 1. 存储（进程内 MemoryStore，数据访问边界的默认实现）
    /// 2. 广播器（连接注册表）
    /// 3. 分发器（模板注册表在此一次性加载）
    /// 4. 业务生产者（订单管理器、库存监视器）
    pub fn initialize(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let order_repo: Arc<dyn OrderRepository> = store.clone();
        let stock_repo: Arc<dyn StockRepository> = store;

        let broadcaster = Arc::new(EventBroadcaster::new(
            config.connection_buffer,
            Duration::from_secs(config.heartbeat_interval_secs),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            TemplateRegistry::with_defaults(),
            Arc::clone(&broadcaster),
        ));

        let orders = Arc::new(OrderManager::new(
            order_repo,
            Arc::clone(&dispatcher),
        ));
        let stock = Arc::new(StockMonitor::new(stock_repo, Arc::clone(&dispatcher)));

        Self {
            config: config.clone(),
            broadcaster,
            dispatcher,
            orders,
            stock,
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 事件流心跳循环
    pub fn start_background_tasks(&self) {
        self.broadcaster.spawn_heartbeat();
        tracing::debug!("Heartbeat loop started in background");
    }

    /// 获取 JWT 服务
    pub fn jwt_service(&self) -> Arc<JwtService> {
        Arc::clone(&self.jwt_service)
    }

    /// 优雅关闭：取消心跳、排空并关闭所有存活连接
    pub fn shutdown(&self) {
        self.broadcaster.shutdown();
    }
}
