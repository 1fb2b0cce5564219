//! 连接管理器
//!
//! # 生命周期
//!
//! ```text
//! Idle → Connecting → Open → Closed → Connecting (重试) → …
//!                               │
//!                               │ 重试耗尽
//!                               ▼
//!                             Failed ──reconnect()──► Connecting
//! ```
//!
//! 转换函数 [`ConnectionState::apply`] 是纯函数，独立于 socket，
//! 驱动任务只负责把传输层的事实翻译成触发器。
//!
//! 关键保证：
//! - 瞬时断线在内部消化，按 [`ReconnectPolicy`](crate::ReconnectPolicy)
//!   有界重试；成功打开后计数清零
//! - 重试耗尽进入 Failed 终态并上报 `ClientEvent::Failed`，
//!   不再静默重试；[`ConnectionHandle::reconnect`] 清零计数恢复
//! - 坏帧记录后丢弃，绝不当作连接故障
//! - [`ConnectionHandle::disconnect`] 通过取消令牌确定性地
//!   终止挂起的重试定时器，落在 Idle，不会与自动重连竞争

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use shared::Notification;
use shared::wire::{ConnectionPayload, FrameDecoder, HeartbeatPayload, WireEvent};
use tokio::sync::{Notify, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::transport::{ByteStream, EventTransport, HttpTransport};

/// 事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 连接状态（命名状态，见模块文档的状态图）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 未连接（初始，或显式断开后）
    Idle,
    /// 正在建立连接
    Connecting,
    /// 流已打开，正在接收
    Open,
    /// 非预期断开，等待重试
    Closed,
    /// 重试耗尽（终态，等待人工 reconnect）
    Failed,
}

/// 状态机触发器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// 发起连接（首次、定时重试、人工 reconnect）
    ConnectRequested,
    /// 传输层流打开成功
    StreamOpened,
    /// 流中断（读错误、服务端关闭、打开失败）
    StreamLost,
    /// 重试额度耗尽
    AttemptsExhausted,
    /// 调用方显式断开
    DisconnectRequested,
}

impl ConnectionState {
    /// 纯转换函数：表外触发保持原状态
    pub fn apply(self, trigger: Trigger) -> ConnectionState {
        use ConnectionState::*;
        use Trigger::*;

        match (self, trigger) {
            (Idle | Closed | Failed, ConnectRequested) => Connecting,
            (Connecting, StreamOpened) => Open,
            (Connecting | Open, StreamLost) => Closed,
            (Closed, AttemptsExhausted) => Failed,
            (_, DisconnectRequested) => Idle,
            (state, _) => state,
        }
    }
}

/// 上抛给调用方（UI 层）的事件
#[derive(Debug)]
pub enum ClientEvent {
    /// 流已打开（服务端问候帧）
    Connected(ConnectionPayload),
    /// 业务通知
    Notification(Notification),
    /// 心跳（存活证明）
    Heartbeat(HeartbeatPayload),
    /// 服务端 error 帧
    ServerError(String),
    /// 断线，已排定第 `attempt` 次重试
    ConnectionLost { error: ClientError, attempt: u32 },
    /// 重试耗尽：持久故障，需要人工 reconnect
    /// （携带 [`ClientError::ReconnectExhausted`]）
    Failed(ClientError),
}

/// 连接管理器（入口）
pub struct ConnectionManager;

impl ConnectionManager {
    /// 用指定传输层启动连接
    ///
    /// 返回控制句柄和事件接收端。驱动任务立刻开始首次连接。
    pub fn connect<T: EventTransport>(
        transport: T,
        reconnect: ReconnectConfig,
    ) -> (ConnectionHandle, mpsc::Receiver<ClientEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let cancel = CancellationToken::new();
        let reconnect_notify = Arc::new(Notify::new());
        let policy = Arc::new(Mutex::new(ReconnectPolicy::new(reconnect)));

        let driver = Driver {
            transport,
            policy: Arc::clone(&policy),
            state_tx,
            events_tx,
            cancel: cancel.clone(),
            reconnect_notify: Arc::clone(&reconnect_notify),
        };
        let join = tokio::spawn(driver.run());

        let handle = ConnectionHandle {
            state_rx,
            cancel,
            reconnect_notify,
            policy,
            join,
        };
        (handle, events_rx)
    }

    /// 用 HTTP 传输连接到服务端
    pub fn connect_http(config: &ClientConfig) -> (ConnectionHandle, mpsc::Receiver<ClientEvent>) {
        Self::connect(
            HttpTransport::new(&config.base_url, &config.token),
            config.reconnect.clone(),
        )
    }
}

/// 连接控制句柄
pub struct ConnectionHandle {
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    reconnect_notify: Arc<Notify>,
    policy: Arc<Mutex<ReconnectPolicy>>,
    join: tokio::task::JoinHandle<()>,
}

impl ConnectionHandle {
    /// 当前连接状态
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// 等待进入指定状态（测试/启动同步用）
    pub async fn wait_for(&mut self, target: ConnectionState) {
        loop {
            if *self.state_rx.borrow_and_update() == target {
                return;
            }
            if self.state_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// 人工重连：清零重试计数并从 Failed 恢复
    ///
    /// 非 Failed 状态下调用只清零计数（自动重连还在进行，
    /// 不需要额外唤醒）。
    pub fn reconnect(&self) {
        self.policy.lock().unwrap().reset();
        if self.state() == ConnectionState::Failed {
            self.reconnect_notify.notify_one();
        }
    }

    /// 显式断开
    ///
    /// 取消挂起的重试定时器（确定性，不会留下孤儿定时器
    /// 在关闭后重新拉起连接），等驱动任务退出后返回。
    /// 最终状态是 Idle。
    pub async fn disconnect(self) {
        self.cancel.cancel();
        let _ = self.join.await;
    }
}

/// 会话结束方式
enum SessionEnd {
    Cancelled,
    ConsumerGone,
    Lost(ClientError),
}

/// 驱动任务：持有传输层，翻译事实为状态触发器
struct Driver<T> {
    transport: T,
    policy: Arc<Mutex<ReconnectPolicy>>,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::Sender<ClientEvent>,
    cancel: CancellationToken,
    reconnect_notify: Arc<Notify>,
}

impl<T: EventTransport> Driver<T> {
    async fn run(self) {
        'session: loop {
            self.apply(Trigger::ConnectRequested);

            let error = match self.transport.open().await {
                Ok(stream) => {
                    // 成功打开：重试计数清零
                    self.policy.lock().unwrap().reset();
                    self.apply(Trigger::StreamOpened);
                    tracing::info!("Event stream opened");

                    match self.pump(stream).await {
                        SessionEnd::Cancelled | SessionEnd::ConsumerGone => break 'session,
                        SessionEnd::Lost(e) => e,
                    }
                }
                Err(e) => e,
            };

            self.apply(Trigger::StreamLost);

            let delay = self.policy.lock().unwrap().next_delay();
            match delay {
                Some(delay) => {
                    let attempt = self.policy.lock().unwrap().attempt_count();
                    tracing::warn!(
                        error = %error,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Connection lost, retry scheduled"
                    );
                    if !self.emit(ClientEvent::ConnectionLost { error, attempt }).await {
                        break 'session;
                    }

                    tokio::select! {
                        _ = self.cancel.cancelled() => break 'session,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    let attempts = self.policy.lock().unwrap().attempt_count();
                    self.apply(Trigger::AttemptsExhausted);
                    tracing::error!(attempts, "Reconnect attempts exhausted, giving up");
                    let exhausted = ClientError::ReconnectExhausted { attempts };
                    if !self.emit(ClientEvent::Failed(exhausted)).await {
                        break 'session;
                    }

                    // 终态：只有人工 reconnect 或显式断开能离开
                    tokio::select! {
                        _ = self.cancel.cancelled() => break 'session,
                        _ = self.reconnect_notify.notified() => {
                            tracing::info!("Manual reconnect requested");
                        }
                    }
                }
            }
        }

        self.apply(Trigger::DisconnectRequested);
        tracing::debug!("Connection driver stopped");
    }

    /// 读流直到会话结束
    async fn pump(&self, mut stream: ByteStream) -> SessionEnd {
        let mut decoder = FrameDecoder::new();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return SessionEnd::Cancelled,

                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for frame in decoder.feed(&bytes) {
                            match frame {
                                Ok(event) => {
                                    if !self.forward(event).await {
                                        return SessionEnd::ConsumerGone;
                                    }
                                }
                                Err(e) => {
                                    // 单帧损坏：记录并丢弃，连接继续
                                    tracing::warn!(error = %e, "Malformed frame discarded");
                                }
                            }
                        }
                    }
                    Some(Err(e)) => return SessionEnd::Lost(e),
                    None => {
                        return SessionEnd::Lost(ClientError::ConnectionLost(
                            "stream closed by server".to_string(),
                        ));
                    }
                }
            }
        }
    }

    /// 线协议帧 → 调用方事件
    async fn forward(&self, event: WireEvent) -> bool {
        let event = match event {
            WireEvent::Connection(p) => ClientEvent::Connected(p),
            WireEvent::Heartbeat(p) => ClientEvent::Heartbeat(p),
            WireEvent::Notification(n) => ClientEvent::Notification(n),
            WireEvent::Error(p) => ClientEvent::ServerError(p.message),
        };
        self.emit(event).await
    }

    /// 上抛事件；接收端已丢弃时返回 false（会话随之结束）
    async fn emit(&self, event: ClientEvent) -> bool {
        self.events_tx.send(event).await.is_ok()
    }

    /// 应用触发器并发布新状态
    fn apply(&self, trigger: Trigger) {
        self.state_tx.send_modify(|state| {
            let next = state.apply(trigger);
            if next != *state {
                tracing::debug!(from = ?state, to = ?next, ?trigger, "Connection state changed");
                *state = next;
            }
        });
    }
}
