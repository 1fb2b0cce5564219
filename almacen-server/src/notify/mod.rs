//! 通知子系统
//!
//! # 架构
//!
//! ```text
//! OrderManager ──┐
//!                │ DomainEvent
//! StockMonitor ──┤
//!                ▼
//!     NotificationDispatcher ──► TemplateRegistry (渲染)
//!                │ Notification
//!                ▼
//!         EventBroadcaster ──► 每连接一个有界队列 ──► SSE 流
//! ```
//!
//! 分发器把领域事件渲染成通知并定优先级，广播器负责扇出、
//! 心跳和死连接清理。投递是 at-most-once：目标不在线就静默丢弃。

mod broadcaster;
mod dispatcher;
mod template;

pub use broadcaster::{ConnectionInfo, EventBroadcaster};
pub use dispatcher::{CreateNotification, NotificationDispatcher};
pub use template::{NotificationTemplate, Rendered, TemplateError, TemplateRegistry};
