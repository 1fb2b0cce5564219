//! 通知模型
//!
//! Notification 由分发器创建后不可变，所有权转移给广播器投递。
//! 优先级是纯数据字段，展示层如何上色与核心无关。

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 通知优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Normal => write!(f, "NORMAL"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

/// 投递目标
///
/// 线上表示为字符串：`"broadcast"` 表示发给所有连接，
/// 其它任何值都是订阅者身份。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Target {
    /// 广播给所有连接
    Broadcast,
    /// 单个订阅者
    User(String),
}

/// Broadcast 在线协议里的保留字
pub const BROADCAST_TARGET: &str = "broadcast";

impl From<Target> for String {
    fn from(target: Target) -> Self {
        match target {
            Target::Broadcast => BROADCAST_TARGET.to_string(),
            Target::User(id) => id,
        }
    }
}

impl From<String> for Target {
    fn from(raw: String) -> Self {
        if raw == BROADCAST_TARGET {
            Target::Broadcast
        } else {
            Target::User(raw)
        }
    }
}

impl Target {
    /// 该目标是否覆盖指定订阅者
    pub fn matches(&self, user_id: &str) -> bool {
        match self {
            Target::Broadcast => true,
            Target::User(id) => id == user_id,
        }
    }
}

/// 通知（分发器产出，不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// 通知 ID（分发时生成）
    pub id: Uuid,
    /// 渲染所用的模板名
    pub template_name: String,
    /// 渲染后的标题
    pub title: String,
    /// 渲染后的正文
    pub body: String,
    /// 优先级
    pub priority: Priority,
    /// 可选的动作链接
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// 可选的动作文案
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
    /// 创建时间（毫秒）
    pub created_at: i64,
    /// 投递目标
    #[serde(rename = "targetId")]
    pub target: Target,
}
