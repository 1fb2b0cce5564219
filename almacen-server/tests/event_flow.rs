//! 事件分发链路集成测试
//!
//! 覆盖 生产者 → 分发器 → 广播器 → 线协议编码 → 解码 的完整链路，
//! 不经过 HTTP 层（HTTP 往返见 client_server_flow.rs）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use almacen_server::notify::{CreateNotification, EventBroadcaster, NotificationDispatcher, TemplateRegistry};
use almacen_server::orders::OrderManager;
use almacen_server::repository::{MemoryStore, OrderRepository, StockItem, StockRepository};
use almacen_server::stock::StockMonitor;
use shared::wire::{FrameDecoder, WireEvent};
use shared::{OrderState, Priority, Target};

struct Fixture {
    broadcaster: Arc<EventBroadcaster>,
    dispatcher: Arc<NotificationDispatcher>,
    orders: Arc<OrderManager>,
    stock: Arc<StockMonitor>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let order_repo: Arc<dyn OrderRepository> = store.clone();
    let stock_repo: Arc<dyn StockRepository> = store;
    let broadcaster = Arc::new(EventBroadcaster::new(32, Duration::from_secs(30)));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        TemplateRegistry::with_defaults(),
        Arc::clone(&broadcaster),
    ));
    let orders = Arc::new(OrderManager::new(
        order_repo,
        Arc::clone(&dispatcher),
    ));
    let stock = Arc::new(StockMonitor::new(stock_repo, Arc::clone(&dispatcher)));
    Fixture {
        broadcaster,
        dispatcher,
        orders,
        stock,
    }
}

#[tokio::test]
async fn test_order_lifecycle_notifies_owner_in_fifo_order() {
    let f = fixture();
    let (_, mut rx) = f.broadcaster.subscribe("cli-1");
    rx.recv().await.unwrap(); // 问候帧

    let order = f.orders.place("cli-1", serde_json::json!([])).await.unwrap();
    for target in [
        OrderState::Confirmed,
        OrderState::InProduction,
        OrderState::ReadyForDelivery,
        OrderState::Delivered,
    ] {
        f.orders.transition(&order.id, target).await.unwrap();
    }

    let expected_templates = [
        "PEDIDO_CONFIRMADO",
        "PEDIDO_EN_PRODUCCION",
        "PEDIDO_LISTO",
        "PEDIDO_ENTREGADO",
    ];
    for expected in expected_templates {
        match rx.recv().await.unwrap() {
            WireEvent::Notification(n) => {
                assert_eq!(n.template_name, expected);
                assert_eq!(n.target, Target::User("cli-1".into()));
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_stock_crossing_broadcasts_and_encodes_round_trip() {
    let f = fixture();
    let (_, mut rx) = f.broadcaster.subscribe("empleado-1");
    rx.recv().await.unwrap();

    f.stock
        .register(StockItem {
            id: "p-7".into(),
            name: "Tuerca M8".into(),
            quantity: 10,
        })
        .await
        .unwrap();
    f.stock.set_quantity("p-7", 0).await.unwrap();

    // 组件边界上拿到的帧，经真实编码再由客户端解码器还原
    let frame = match rx.recv().await.unwrap() {
        frame @ WireEvent::Notification(_) => frame,
        other => panic!("unexpected frame {:?}", other),
    };

    let mut decoder = FrameDecoder::new();
    let mut decoded = decoder.feed(frame.encode().as_bytes());
    assert_eq!(decoded.len(), 1);
    match decoded.remove(0).unwrap() {
        WireEvent::Notification(n) => {
            assert_eq!(n.template_name, "STOCK_AGOTADO");
            assert_eq!(n.priority, Priority::High);
            assert_eq!(n.target, Target::Broadcast);
            assert!(n.body.contains("Tuerca M8"));
        }
        other => panic!("decoded to unexpected frame {:?}", other),
    }
}

#[tokio::test]
async fn test_dead_subscriber_does_not_disturb_the_rest() {
    let f = fixture();
    let (_, rx_dead) = f.broadcaster.subscribe("cli-1");
    let (_, mut rx_live) = f.broadcaster.subscribe("cli-2");
    rx_live.recv().await.unwrap();
    drop(rx_dead);

    // 两个目标：一个死连接，一个没人订阅，一个存活
    f.dispatcher
        .create_notification(CreateNotification {
            template_name: "BIENVENIDA".into(),
            variables: HashMap::from([("usuario".to_string(), "todos".to_string())]),
            priority: None,
            action_url: None,
            action_text: None,
            target_id: None, // broadcast
        })
        .expect("broadcast must not error on dead subscribers");

    f.dispatcher
        .create_notification(CreateNotification {
            template_name: "BIENVENIDA".into(),
            variables: HashMap::from([("usuario".to_string(), "nadie".to_string())]),
            priority: None,
            action_url: None,
            action_text: None,
            target_id: Some("desconectado".into()), // 无人订阅：静默空操作
        })
        .expect("publish to absent target must not error");

    // 存活连接只看到广播那条，且不被前面的失败延迟
    match rx_live.recv().await.unwrap() {
        WireEvent::Notification(n) => assert!(n.body.contains("todos")),
        other => panic!("unexpected frame {:?}", other),
    }
    assert!(rx_live.try_recv().is_err());

    // 死连接已被剔除
    assert_eq!(f.broadcaster.connections_for("cli-1"), 0);
    assert_eq!(f.broadcaster.connections_for("cli-2"), 1);
}

#[tokio::test]
async fn test_concurrent_transitions_race_through_full_stack() {
    let f = fixture();
    let (_, mut rx) = f.broadcaster.subscribe("cli-1");
    rx.recv().await.unwrap();

    let order = f.orders.place("cli-1", serde_json::json!([])).await.unwrap();

    let o1 = Arc::clone(&f.orders);
    let o2 = Arc::clone(&f.orders);
    let id1 = order.id.clone();
    let id2 = order.id.clone();
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { o1.transition(&id1, OrderState::Confirmed).await }),
        tokio::spawn(async move { o2.transition(&id2, OrderState::Confirmed).await }),
    );
    let ok_count = r1.unwrap().is_ok() as u8 + r2.unwrap().is_ok() as u8;
    assert_eq!(ok_count, 1);

    // 只有赢家产生了通知
    assert!(matches!(
        rx.recv().await.unwrap(),
        WireEvent::Notification(_)
    ));
    assert!(rx.try_recv().is_err());
}
