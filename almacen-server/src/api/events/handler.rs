//! 事件流订阅端点
//!
//! GET /api/events - 长连接流，按认证身份注册到广播器。
//! 响应体是 text/event-stream：广播器写入连接队列的每一帧
//! 编码后推给客户端，直到任一端关闭。

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use bytes::Bytes;
use shared::wire::WireEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::notify::EventBroadcaster;

/// 订阅者的接收端，连同注册信息一起存活
///
/// 客户端断开时响应体被丢弃，Drop 立刻注销连接，
/// 不等下一轮心跳才发现死连接。
struct SubscriberStream {
    connection_id: Uuid,
    rx: mpsc::Receiver<WireEvent>,
    broadcaster: Arc<EventBroadcaster>,
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.connection_id);
    }
}

/// GET /api/events - 订阅实时事件流
pub async fn stream(State(state): State<ServerState>, user: CurrentUser) -> impl IntoResponse {
    let broadcaster = Arc::clone(&state.broadcaster);
    let (connection_id, rx) = broadcaster.subscribe(&user.id);

    let subscriber = SubscriberStream {
        connection_id,
        rx,
        broadcaster,
    };

    let body = Body::from_stream(futures::stream::unfold(subscriber, |mut sub| async move {
        sub.rx
            .recv()
            .await
            .map(|event| (Ok::<_, Infallible>(Bytes::from(event.encode())), sub))
    }));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
}
