//! Almacén 共享类型库
//!
//! 这些类型在 almacen-server 和 almacen-client 之间共享：
//!
//! - **订单生命周期** (`order`): 订单状态机的状态与合法转换表
//! - **领域事件** (`event`): 业务层产生的内部事实 (订单状态变更、库存越界)
//! - **通知模型** (`notification`): 分发器产出的不可变通知
//! - **线协议** (`wire`): 服务端 → 客户端的事件帧编解码
//!
//! 服务端负责产生帧，客户端负责解码帧；两侧必须使用同一份定义。

pub mod event;
pub mod notification;
pub mod order;
pub mod util;
pub mod wire;

pub use event::{DomainEvent, StockLevel};
pub use notification::{Notification, Priority, Target};
pub use order::{Order, OrderState};
pub use wire::{FrameDecoder, WireError, WireEvent};
