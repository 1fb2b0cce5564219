//! Almacén Server - 库存/订单管理系统的实时事件服务端
//!
//! # 架构概述
//!
//! 本模块是服务端主入口，提供以下核心功能：
//!
//! - **通知子系统** (`notify`): 模板引擎、分发器、事件广播器
//! - **订单状态机** (`orders`): 订单生命周期的唯一转换入口
//! - **库存阈值** (`stock`): 数量越界评估与告警
//! - **认证** (`auth`): JWT 订阅身份边界
//! - **HTTP API** (`api`): 订阅端点与生产者接口
//!
//! # 模块结构
//!
//! ```text
//! almacen-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证
//! ├── notify/        # 模板、分发器、广播器
//! ├── orders/        # 订单状态机
//! ├── stock/         # 库存阈值评估
//! ├── repository/    # 数据访问边界
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod notify;
pub mod orders;
pub mod repository;
pub mod stock;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use notify::{EventBroadcaster, NotificationDispatcher, TemplateRegistry};
pub use orders::{OrderError, OrderManager};
pub use stock::{StockError, StockMonitor};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(Some(&log_level), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ___    __
   /   |  / /___ ___  ____ _________  ____
  / /| | / / __ `__ \/ __ `/ ___/ _ \/ __ \
 / ___ |/ / / / / / / /_/ / /__/  __/ / / /
/_/  |_/_/_/ /_/ /_/\__,_/\___/\___/_/ /_/
    "#
    );
}
