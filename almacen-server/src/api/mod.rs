//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 令牌签发（开发环境的认证边界替身）
//! - [`events`] - 实时事件流订阅端点
//! - [`notifications`] - 通知生产者接口
//! - [`orders`] - 订单状态转换接口
//! - [`stock`] - 库存数量接口

pub mod auth;
pub mod events;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod stock;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};
