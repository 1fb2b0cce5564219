//! 通知分发器
//!
//! 进程级中枢：接收领域事件，映射到模板 + 变量包，经模板引擎
//! 渲染后构造 Notification，交给广播器投递。
//!
//! 分发路径的隔离原则：模板解析失败只记录并丢弃该事件，
//! 绝不让一个坏事件拖垮分发路径或阻塞其他通知。
//! 对调用方而言 dispatch 是 fire-and-forget，但分发器到广播器
//! 的调用是同步的，同一目标的投递顺序与分发顺序一致。

use std::collections::HashMap;
use std::sync::Arc;

use shared::util::{fecha_hora, now_millis};
use shared::{DomainEvent, Notification, OrderState, Priority, StockLevel, Target};
use uuid::Uuid;

use super::broadcaster::EventBroadcaster;
use super::template::{TemplateError, TemplateRegistry};

/// 生产者侧的通知创建请求
///
/// `target_id` 缺省表示广播给所有连接。
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateNotification {
    pub template_name: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// 覆盖模板默认优先级
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub action_text: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
}

/// 通知分发器
///
/// 显式构造的服务实例，进程级生命周期：启动时创建，
/// 句柄传给各个生产者，不靠隐式全局查找。
#[derive(Debug)]
pub struct NotificationDispatcher {
    templates: TemplateRegistry,
    broadcaster: Arc<EventBroadcaster>,
}

impl NotificationDispatcher {
    pub fn new(templates: TemplateRegistry, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            templates,
            broadcaster,
        }
    }

    /// 广播器句柄（订阅端点用）
    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    /// 分发领域事件
    ///
    /// 渲染失败 → 记录并丢弃，返回 `None`。
    /// 成功 → 返回通知 ID。
    pub fn dispatch(&self, event: DomainEvent) -> Option<Uuid> {
        let Some(mapping) = Self::map_event(&event) else {
            tracing::debug!(?event, "Domain event suppressed, no notification mapping");
            return None;
        };

        match self.render(
            &mapping.template,
            &mapping.variables,
            None,
            mapping.action_url,
            None,
            mapping.target,
        ) {
            Ok(notification) => {
                let id = notification.id;
                let delivered = self.broadcaster.publish(&notification);
                tracing::info!(
                    notification_id = %id,
                    template = %notification.template_name,
                    delivered,
                    "Notification dispatched"
                );
                Some(id)
            }
            Err(e) => {
                // 坏事件不得污染分发路径：记录后丢弃
                tracing::error!(?event, error = %e, "Dropping undispatchable domain event");
                None
            }
        }
    }

    /// 生产者 API：按模板创建并投递通知
    ///
    /// 模板错误 (`UnknownTemplate` / `MissingVariable`) 返回给调用方，
    /// 属于调用方错误，不可重试。
    pub fn create_notification(&self, req: CreateNotification) -> Result<Uuid, TemplateError> {
        let target = match req.target_id {
            Some(id) => Target::from(id),
            None => Target::Broadcast,
        };

        let notification = self.render(
            &req.template_name,
            &req.variables,
            req.priority,
            req.action_url,
            req.action_text,
            target,
        )?;

        let id = notification.id;
        let delivered = self.broadcaster.publish(&notification);
        tracing::info!(
            notification_id = %id,
            template = %req.template_name,
            delivered,
            "Notification created"
        );
        Ok(id)
    }

    /// 渲染模板并组装 Notification
    fn render(
        &self,
        template_name: &str,
        variables: &HashMap<String, String>,
        priority_override: Option<Priority>,
        action_url: Option<String>,
        action_text: Option<String>,
        target: Target,
    ) -> Result<Notification, TemplateError> {
        let rendered = self.templates.resolve(template_name, variables)?;

        Ok(Notification {
            id: Uuid::new_v4(),
            template_name: template_name.to_string(),
            title: rendered.title,
            body: rendered.body,
            priority: priority_override.unwrap_or(rendered.priority),
            action_url,
            action_text,
            created_at: now_millis(),
            target,
        })
    }

    /// 领域事件 → 模板映射
    ///
    /// 返回 `None` 表示该事件不产生通知（如库存恢复到充足，
    /// 评估器已压制，这里兜底再挡一次）。
    fn map_event(event: &DomainEvent) -> Option<EventMapping> {
        match event {
            DomainEvent::OrderTransitioned {
                order_id,
                client_id,
                to,
                at,
                ..
            } => {
                let template = match to {
                    OrderState::Confirmed => "PEDIDO_CONFIRMADO",
                    OrderState::InProduction => "PEDIDO_EN_PRODUCCION",
                    OrderState::ReadyForDelivery => "PEDIDO_LISTO",
                    OrderState::Delivered => "PEDIDO_ENTREGADO",
                    OrderState::Cancelled => "PEDIDO_CANCELADO",
                    // Emitted 是初始状态，不是合法转换目标
                    OrderState::Emitted => return None,
                };

                let (fecha, hora) = fecha_hora(*at);
                let variables = HashMap::from([
                    ("pedido".to_string(), order_id.clone()),
                    ("fecha".to_string(), fecha),
                    ("hora".to_string(), hora),
                ]);

                Some(EventMapping {
                    template,
                    variables,
                    action_url: Some(format!("/pedidos/{}", order_id)),
                    target: Target::User(client_id.clone()),
                })
            }
            DomainEvent::StockLevelCrossed {
                product_id,
                product_name,
                level,
                quantity,
                at,
            } => {
                let template = match level {
                    StockLevel::Depleted => "STOCK_AGOTADO",
                    StockLevel::Low => "STOCK_BAJO",
                    // 恢复到充足：压制，不打扰
                    StockLevel::Sufficient => return None,
                };

                let (fecha, hora) = fecha_hora(*at);
                let variables = HashMap::from([
                    ("producto".to_string(), product_name.clone()),
                    ("cantidad".to_string(), quantity.to_string()),
                    ("fecha".to_string(), fecha),
                    ("hora".to_string(), hora),
                ]);

                Some(EventMapping {
                    template,
                    variables,
                    action_url: Some(format!("/productos/{}", product_id)),
                    // 库存告警面向全体在线员工
                    target: Target::Broadcast,
                })
            }
        }
    }
}

/// 一次事件映射的产物
struct EventMapping {
    template: &'static str,
    variables: HashMap<String, String>,
    action_url: Option<String>,
    target: Target,
}
