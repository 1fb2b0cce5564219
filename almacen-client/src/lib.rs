//! Almacén Client - 实时事件流的连接管理器
//!
//! # 架构概述
//!
//! 维护到服务端事件流的长连接：解码入站帧、在断线后按
//! 有界重试策略自动重连、把连接生命周期暴露为显式状态机。
//!
//! ```text
//! Idle ──connect──► Connecting ──open──► Open
//!                       ▲                 │
//!                       │ (退避后重试)     │ 断线
//!                       └──── Closed ◄────┘
//!                               │ 重试耗尽
//!                               ▼
//!                            Failed ──reconnect()──► Connecting
//! ```
//!
//! 传输层是可插拔的 [`EventTransport`]：生产代码用
//! [`HttpTransport`] (reqwest 长连接 GET)，测试用内存实现。
//! 状态机的转换函数独立于任何 socket，可单独测试。

mod config;
mod connection;
mod error;
mod reconnect;
mod transport;

pub use config::ClientConfig;
pub use connection::{ClientEvent, ConnectionHandle, ConnectionManager, ConnectionState, Trigger};
pub use error::ClientError;
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use transport::{ByteStream, EventTransport, HttpTransport};

// 帧解码与线协议类型由 shared 提供，客户端直接复用
pub use shared::wire::{ConnectionPayload, FrameDecoder, HeartbeatPayload, WireEvent};
pub use shared::{Notification, Priority};
