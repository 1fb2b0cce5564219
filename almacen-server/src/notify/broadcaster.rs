//! 事件广播器
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  EventBroadcaster                     │
//! │   DashMap<connection_id, Connection>                  │
//! │        │                │                │            │
//! │   mpsc(bounded)    mpsc(bounded)    mpsc(bounded)     │
//! └────────┼────────────────┼────────────────┼────────────┘
//!          ▼                ▼                ▼
//!      SSE 流 (user-1)  SSE 流 (user-1)  SSE 流 (user-2)
//! ```
//!
//! 每个连接一个有界 mpsc 队列，publish 永远用 try_send：
//! 队列满 → 丢弃该连接的这一帧（不阻塞业务线程，不无界增长）；
//! 队列关闭（客户端断开）→ 立即从注册表剔除。
//! 单个订阅者的写失败不影响其他订阅者的投递。
//!
//! 投递 at-most-once：目标没有存活连接时 publish 是静默空操作，
//! 不排队等它回来。重连由客户端全权负责。

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use shared::Notification;
use shared::util::now_millis;
use shared::wire::{ConnectionPayload, ErrorPayload, HeartbeatPayload, WireEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 单个订阅者连接
///
/// 广播器独占所有权：订阅时创建，断开/写失败/进程关闭时销毁。
#[derive(Debug)]
struct Connection {
    /// 订阅者身份
    user_id: String,
    /// 连接的出站队列
    tx: mpsc::Sender<WireEvent>,
    /// 建立时间（毫秒）
    connected_at: i64,
    /// 最近一次心跳送达时间（毫秒）
    last_heartbeat: AtomicI64,
}

/// 连接信息快照（健康检查/诊断用）
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub connection_id: Uuid,
    pub user_id: String,
    pub connected_at: i64,
    pub last_heartbeat: i64,
}

/// 事件广播器
///
/// 注册表是广播器里唯一的共享可变状态，DashMap 保证
/// 注册/注销/发布在多生产者多连接下并发安全。
#[derive(Debug)]
pub struct EventBroadcaster {
    connections: DashMap<Uuid, Connection>,
    /// 每连接出站队列容量
    buffer: usize,
    /// 心跳间隔
    heartbeat_interval: Duration,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
}

impl EventBroadcaster {
    /// 创建广播器
    ///
    /// # 参数
    /// - `buffer`: 每连接出站队列容量（满则丢新帧）
    /// - `heartbeat_interval`: 心跳间隔（推荐 30s）
    pub fn new(buffer: usize, heartbeat_interval: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            buffer: buffer.max(1),
            heartbeat_interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 注册一个新连接
    ///
    /// 返回连接 ID 和该连接的事件接收端。问候帧 (`connection`)
    /// 已经在队列里，消费端打开流就会先收到它。
    pub fn subscribe(&self, user_id: &str) -> (Uuid, mpsc::Receiver<WireEvent>) {
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.buffer);
        let now = now_millis();

        let greeting = WireEvent::Connection(ConnectionPayload {
            message: format!("Conectado como {}", user_id),
            user_id: user_id.to_string(),
            timestamp: now,
        });
        // 新建队列必然有空位
        let _ = tx.try_send(greeting);

        self.connections.insert(
            connection_id,
            Connection {
                user_id: user_id.to_string(),
                tx,
                connected_at: now,
                last_heartbeat: AtomicI64::new(now),
            },
        );

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            total = self.connections.len(),
            "Subscriber connected"
        );

        (connection_id, rx)
    }

    /// 注销连接
    pub fn unsubscribe(&self, connection_id: Uuid) {
        if let Some((_, conn)) = self.connections.remove(&connection_id) {
            tracing::info!(
                connection_id = %connection_id,
                user_id = %conn.user_id,
                "Subscriber disconnected"
            );
        }
    }

    /// 发布通知
    ///
    /// 按通知目标扇出：`Target::User` 投给该用户的所有连接，
    /// `Target::Broadcast` 投给所有连接。返回实际入队的连接数。
    ///
    /// 对无人订阅的目标发布是静默空操作：这是 at-most-once
    /// 通道，不做离线排队。
    pub fn publish(&self, notification: &Notification) -> usize {
        let mut delivered = 0;
        let mut stale: Vec<Uuid> = Vec::new();

        for entry in self.connections.iter() {
            if !notification.target.matches(&entry.user_id) {
                continue;
            }

            match entry
                .tx
                .try_send(WireEvent::Notification(notification.clone()))
            {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // 慢客户端：丢这一帧，不阻塞发布方
                    tracing::warn!(
                        connection_id = %entry.key(),
                        user_id = %entry.user_id,
                        notification_id = %notification.id,
                        "Connection buffer full, notification dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    stale.push(*entry.key());
                }
            }
        }

        self.prune(&stale);
        delivered
    }

    /// 启动心跳循环
    ///
    /// 固定间隔向每个存活连接发 `heartbeat` 帧，让客户端能
    /// 检测半开连接；发送失败的连接立即剔除。
    /// 由关闭令牌取消。
    pub fn spawn_heartbeat(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let broadcaster = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(broadcaster.heartbeat_interval);
            // interval 的第一个 tick 立即返回，跳过
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = broadcaster.shutdown_token.cancelled() => {
                        tracing::debug!("Heartbeat loop stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        broadcaster.send_heartbeats();
                    }
                }
            }
        })
    }

    /// 向所有连接发一轮心跳
    fn send_heartbeats(&self) {
        let now = now_millis();
        let frame = WireEvent::Heartbeat(HeartbeatPayload { timestamp: now });
        let mut stale: Vec<Uuid> = Vec::new();

        for entry in self.connections.iter() {
            match entry.tx.try_send(frame.clone()) {
                Ok(()) => {
                    entry.last_heartbeat.store(now, Ordering::Relaxed);
                }
                // 队列满说明客户端在忙着追帧，心跳可以少一拍
                Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    stale.push(*entry.key());
                }
            }
        }

        self.prune(&stale);
    }

    /// 剔除已死连接
    fn prune(&self, stale: &[Uuid]) {
        for id in stale {
            if let Some((_, conn)) = self.connections.remove(id) {
                tracing::debug!(
                    connection_id = %id,
                    user_id = %conn.user_id,
                    "Pruned dead connection"
                );
            }
        }
    }

    /// 当前连接数
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// 指定用户的连接数
    pub fn connections_for(&self, user_id: &str) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .count()
    }

    /// 连接信息快照
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|entry| ConnectionInfo {
                connection_id: *entry.key(),
                user_id: entry.user_id.clone(),
                connected_at: entry.connected_at,
                last_heartbeat: entry.last_heartbeat.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// 关闭令牌（后台任务监听用）
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭
    ///
    /// 给每个连接发一个 `error` 告别帧，取消心跳循环，
    /// 清空注册表（发送端落地即关闭所有流）。
    pub fn shutdown(&self) {
        tracing::info!(
            connections = self.connections.len(),
            "Shutting down event broadcaster"
        );

        let farewell = WireEvent::Error(ErrorPayload {
            message: "server shutting down".to_string(),
        });
        for entry in self.connections.iter() {
            let _ = entry.tx.try_send(farewell.clone());
        }

        self.shutdown_token.cancel();
        self.connections.clear();
    }
}
