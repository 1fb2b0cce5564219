//! 线协议：服务端 → 客户端事件帧
//!
//! # 帧格式
//!
//! 采用 text/event-stream 的标准分帧：每帧一个逻辑事件，
//! `event:` 行标识类型，`data:` 行携带 JSON 载荷，空行结束一帧。
//!
//! ```text
//! event: notification
//! data: {"id":"...","templateName":"STOCK_BAJO",...}
//!
//! ```
//!
//! # 事件类型
//!
//! | event | 载荷 | 时机 |
//! |-------|------|------|
//! | connection | `{message, userId, timestamp}` | 流打开时发一次 |
//! | heartbeat | `{timestamp}` | 固定间隔 |
//! | notification | 完整 Notification | 每次分发 |
//! | error | `{message}` | 服务端异常告知 |
//!
//! 单帧解析失败属于 `MalformedFrame`：记录并丢弃该帧，
//! 绝不因此拆除连接：解码器在坏帧之后继续产出后续帧。

use serde::{Deserialize, Serialize};

use crate::notification::Notification;

/// `connection` 帧载荷（流打开时发一次）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    /// 问候语
    pub message: String,
    /// 订阅者身份
    pub user_id: String,
    /// 打开时间（毫秒）
    pub timestamp: i64,
}

/// `heartbeat` 帧载荷
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    /// 发送时间（毫秒）
    pub timestamp: i64,
}

/// `error` 帧载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// 线协议事件帧
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    Connection(ConnectionPayload),
    Heartbeat(HeartbeatPayload),
    Notification(Notification),
    Error(ErrorPayload),
}

/// 线协议错误
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// 未知的事件类型
    #[error("unknown event type: {0}")]
    UnknownEvent(String),

    /// 单帧格式/载荷损坏（记录并丢弃，不拆连接）
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

impl WireEvent {
    /// 帧的事件类型名（`event:` 行的值）
    pub fn event_name(&self) -> &'static str {
        match self {
            WireEvent::Connection(_) => "connection",
            WireEvent::Heartbeat(_) => "heartbeat",
            WireEvent::Notification(_) => "notification",
            WireEvent::Error(_) => "error",
        }
    }

    /// 编码为一个完整帧（含结尾空行）
    pub fn encode(&self) -> String {
        let data = match self {
            WireEvent::Connection(p) => serde_json::to_string(p),
            WireEvent::Heartbeat(p) => serde_json::to_string(p),
            WireEvent::Notification(n) => serde_json::to_string(n),
            WireEvent::Error(p) => serde_json::to_string(p),
        }
        .expect("Failed to serialize wire payload");

        format!("event: {}\ndata: {}\n\n", self.event_name(), data)
    }

    /// 从事件名 + data 体解析出一帧
    pub fn parse(event_name: &str, data: &str) -> Result<Self, WireError> {
        let malformed =
            |e: serde_json::Error| WireError::MalformedFrame(format!("{}: {}", event_name, e));

        match event_name {
            "connection" => Ok(WireEvent::Connection(
                serde_json::from_str(data).map_err(malformed)?,
            )),
            "heartbeat" => Ok(WireEvent::Heartbeat(
                serde_json::from_str(data).map_err(malformed)?,
            )),
            "notification" => Ok(WireEvent::Notification(
                serde_json::from_str(data).map_err(malformed)?,
            )),
            "error" => Ok(WireEvent::Error(
                serde_json::from_str(data).map_err(malformed)?,
            )),
            other => Err(WireError::UnknownEvent(other.to_string())),
        }
    }
}

/// 增量帧解码器
///
/// 喂入任意切分的字节块，按空行切帧后逐帧解析。
/// 坏帧以 `Err` 的形式产出，解码器自身保持可用：
/// 调用方记录错误后继续消费即可。
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一块字节，返回其中完整帧的解析结果
    ///
    /// 不足一帧的尾部留在缓冲区，等待下一块。
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<WireEvent, WireError>> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        let mut out = Vec::new();
        // 空行（两个连续换行）是帧边界
        while let Some(pos) = self.buf.find("\n\n") {
            let frame: String = self.buf.drain(..pos + 2).collect();
            let frame = frame.trim_end_matches('\n');
            if frame.trim().is_empty() {
                continue;
            }
            out.push(Self::parse_frame(frame));
        }
        out
    }

    /// 解析一个完整帧体（不含结尾空行）
    fn parse_frame(frame: &str) -> Result<WireEvent, WireError> {
        let mut event_name: Option<&str> = None;
        let mut data_lines: Vec<&str> = Vec::new();

        for line in frame.lines() {
            // ':' 开头是注释行（keep-alive 常用），跳过
            if line.starts_with(':') {
                continue;
            }
            if let Some(value) = line.strip_prefix("event:") {
                event_name = Some(value.trim());
            } else if let Some(value) = line.strip_prefix("data:") {
                data_lines.push(value.trim_start_matches(' '));
            } else if !line.trim().is_empty() {
                return Err(WireError::MalformedFrame(format!(
                    "unexpected line: {:?}",
                    line
                )));
            }
        }

        let event_name = event_name
            .ok_or_else(|| WireError::MalformedFrame("missing event field".to_string()))?;
        if data_lines.is_empty() {
            return Err(WireError::MalformedFrame("missing data field".to_string()));
        }

        WireEvent::parse(event_name, &data_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{Priority, Target};
    use crate::util::now_millis;
    use uuid::Uuid;

    fn sample_notification() -> Notification {
        Notification {
            id: Uuid::new_v4(),
            template_name: "STOCK_BAJO".into(),
            title: "Stock bajo".into(),
            body: "Producto Tornillo M4: quedan 2 unidades".into(),
            priority: Priority::High,
            action_url: Some("/productos/p-42".into()),
            action_text: Some("Ver producto".into()),
            created_at: now_millis(),
            target: Target::User("user-3".into()),
        }
    }

    #[test]
    fn test_notification_round_trip_is_exact() {
        let original = sample_notification();
        let encoded = WireEvent::Notification(original.clone()).encode();

        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(encoded.as_bytes());
        assert_eq!(frames.len(), 1);

        match frames.remove(0).expect("frame should decode") {
            WireEvent::Notification(decoded) => assert_eq!(decoded, original),
            other => panic!("expected notification frame, got {:?}", other),
        }
    }

    #[test]
    fn test_decoder_handles_arbitrary_chunking() {
        let encoded = WireEvent::Heartbeat(HeartbeatPayload { timestamp: 42 }).encode();
        let bytes = encoded.as_bytes();

        let mut decoder = FrameDecoder::new();
        let mut decoded = Vec::new();
        // 一次一个字节地喂
        for b in bytes {
            decoded.extend(decoder.feed(&[*b]));
        }

        assert_eq!(decoded.len(), 1);
        match decoded.remove(0).unwrap() {
            WireEvent::Heartbeat(p) => assert_eq!(p.timestamp, 42),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frame_does_not_poison_decoder() {
        let good = WireEvent::Heartbeat(HeartbeatPayload { timestamp: 7 }).encode();
        let bad = "event: notification\ndata: {not json}\n\n";

        let mut decoder = FrameDecoder::new();
        let results = decoder.feed(format!("{}{}", bad, good).as_bytes());

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(WireError::MalformedFrame(_))));
        assert!(matches!(
            results[1],
            Ok(WireEvent::Heartbeat(HeartbeatPayload { timestamp: 7 }))
        ));
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let mut decoder = FrameDecoder::new();
        let results = decoder.feed(b"event: upgrade\ndata: {}\n\n");
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], Err(WireError::UnknownEvent(name)) if name == "upgrade"));
    }

    #[test]
    fn test_comment_lines_are_ignored() {
        let mut decoder = FrameDecoder::new();
        let results = decoder.feed(b": keep-alive\nevent: heartbeat\ndata: {\"timestamp\": 1}\n\n");
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn test_connection_and_error_payloads() {
        let conn = WireEvent::Connection(ConnectionPayload {
            message: "Conectado".into(),
            user_id: "user-1".into(),
            timestamp: 1000,
        });
        let err = WireEvent::Error(ErrorPayload {
            message: "shutting down".into(),
        });

        let mut decoder = FrameDecoder::new();
        let results = decoder.feed(format!("{}{}", conn.encode(), err.encode()).as_bytes());
        assert_eq!(results.len(), 2);
        assert_eq!(*results[0].as_ref().unwrap(), conn);
        assert_eq!(*results[1].as_ref().unwrap(), err);
    }
}
