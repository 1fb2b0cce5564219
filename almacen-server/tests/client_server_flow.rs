//! 客户端 ↔ 服务端 HTTP 往返测试
//!
//! 真实地址上起一个服务器，用 almacen-client 的连接管理器
//! 订阅事件流，验证认证、问候帧、业务通知、心跳和断开清理。

use std::time::Duration;

use almacen_client::{ClientConfig, ClientEvent, ConnectionManager, ReconnectConfig};
use almacen_server::{Config, Server, ServerState};
use shared::OrderState;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn start_server(heartbeat_secs: u64) -> (ServerState, String) {
    let mut config = Config::from_env();
    config.heartbeat_interval_secs = heartbeat_secs;
    config.connection_buffer = 32;

    let state = ServerState::initialize(&config);
    state.start_background_tasks();

    let app = Server::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (state, format!("http://{}", addr))
}

fn fast_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        interval: Duration::from_millis(50),
        max_attempts: 3,
        exponential: false,
        max_interval: Duration::from_secs(1),
    }
}

async fn next_event(rx: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event within deadline")
        .expect("event channel open")
}

#[tokio::test]
async fn test_subscribe_receive_notification_and_heartbeat() {
    let (state, base_url) = start_server(1).await;
    let token = state
        .jwt_service()
        .generate_token("cli-1", "Maria")
        .unwrap();

    let client_config = ClientConfig::new(&base_url, &token).with_reconnect(fast_reconnect());
    let (handle, mut rx) = ConnectionManager::connect_http(&client_config);

    // 1. 问候帧携带订阅者身份
    match next_event(&mut rx).await {
        ClientEvent::Connected(p) => assert_eq!(p.user_id, "cli-1"),
        other => panic!("expected Connected, got {:?}", other),
    }

    // 2. 订单状态转换产生的通知到达所属客户
    let order = state
        .orders
        .place("cli-1", serde_json::json!([{"producto": "p-1", "cantidad": 2}]))
        .await
        .unwrap();
    state
        .orders
        .transition(&order.id, OrderState::Confirmed)
        .await
        .unwrap();

    loop {
        match next_event(&mut rx).await {
            ClientEvent::Notification(n) => {
                assert_eq!(n.template_name, "PEDIDO_CONFIRMADO");
                assert!(n.body.contains(&order.id));
                break;
            }
            // 心跳可能先到
            ClientEvent::Heartbeat(_) => continue,
            other => panic!("unexpected event {:?}", other),
        }
    }

    // 3. 心跳按间隔到达（1s 间隔，5s 窗口内必有）
    loop {
        if let ClientEvent::Heartbeat(p) = next_event(&mut rx).await {
            assert!(p.timestamp > 0);
            break;
        }
    }

    // 4. 断开后服务端及时清理注册
    handle.disconnect().await;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        if state.broadcaster.connection_count() == 0 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "registration not released after disconnect"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_unauthenticated_subscribe_is_rejected() {
    let (_state, base_url) = start_server(30).await;

    let response = reqwest::get(format!("{}/api/events", base_url))
        .await
        .expect("request completes");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_invalid_transition_maps_to_422_and_leaves_order() {
    let (state, base_url) = start_server(30).await;
    let token = state
        .jwt_service()
        .generate_token("cli-1", "Maria")
        .unwrap();
    let http = reqwest::Client::new();

    // 下单
    let order: shared::Order = http
        .post(format!("{}/api/pedidos", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({"client_id": "cli-1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order.state, OrderState::Emitted);

    // Emitted → Delivered 不在转换表里
    let response = http
        .post(format!("{}/api/pedidos/{}/transition", base_url, order.id))
        .bearer_auth(&token)
        .json(&serde_json::json!({"target": "DELIVERED"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    // 订单保持原状
    let unchanged: shared::Order = http
        .get(format!("{}/api/pedidos/{}", base_url, order.id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unchanged.state, OrderState::Emitted);
}

#[tokio::test]
async fn test_producer_api_validates_template_and_variables() {
    let (state, base_url) = start_server(30).await;
    let token = state
        .jwt_service()
        .generate_token("cli-1", "Maria")
        .unwrap();
    let http = reqwest::Client::new();

    // 未注册模板 → 404
    let response = http
        .post(format!("{}/api/notifications", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({"template_name": "NO_EXISTE"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // 缺变量 → 400
    let response = http
        .post(format!("{}/api/notifications", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "template_name": "STOCK_BAJO",
            "variables": {"producto": "Tornillo M4"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // 齐全则创建成功
    let response = http
        .post(format!("{}/api/notifications", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "template_name": "STOCK_BAJO",
            "variables": {
                "producto": "Tornillo M4",
                "cantidad": "2",
                "fecha": "15/03/2024",
                "hora": "14:30",
                "extra": "ignorado"
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_stock_update_over_http_reaches_subscriber() {
    let (state, base_url) = start_server(30).await;
    let token = state
        .jwt_service()
        .generate_token("empleado-1", "Pepe")
        .unwrap();
    let http = reqwest::Client::new();

    let client_config = ClientConfig::new(&base_url, &token).with_reconnect(fast_reconnect());
    let (handle, mut rx) = ConnectionManager::connect_http(&client_config);
    assert!(matches!(next_event(&mut rx).await, ClientEvent::Connected(_)));

    // 建档然后把数量写穿阈值
    http.post(format!("{}/api/stock", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({"id": "p-1", "name": "Tornillo M4", "quantity": 9}))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();
    http.put(format!("{}/api/stock/p-1/quantity", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({"quantity": 2}))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();

    loop {
        match next_event(&mut rx).await {
            ClientEvent::Notification(n) => {
                assert_eq!(n.template_name, "STOCK_BAJO");
                assert!(n.body.contains("Tornillo M4"));
                break;
            }
            ClientEvent::Heartbeat(_) => continue,
            other => panic!("unexpected event {:?}", other),
        }
    }

    handle.disconnect().await;
}
