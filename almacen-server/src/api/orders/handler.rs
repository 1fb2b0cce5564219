//! 订单 API Handlers
//!
//! 订单的 CRUD 表单在页面层，这里只暴露核心需要的操作：
//! 下单、读取、状态转换。转换是唯一的状态变更入口。

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::{Order, OrderState};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub client_id: String,
    #[serde(default)]
    pub lines: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub target: OrderState,
}

/// POST /api/pedidos - 下单
pub async fn place(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Json(req): Json<PlaceOrderRequest>,
) -> AppResult<Json<Order>> {
    let order = state.orders.place(&req.client_id, req.lines).await?;
    Ok(Json(order))
}

/// GET /api/pedidos/:id - 读取订单
pub async fn get_by_id(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders.get(&id).await?;
    Ok(Json(order))
}

/// POST /api/pedidos/:id/transition - 应用状态转换
///
/// 表外转换返回 422（业务规则违反），调用方必须展示给用户，
/// 不能自动重试。
pub async fn transition(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> AppResult<Json<Order>> {
    let order = state.orders.transition(&id, req.target).await?;
    Ok(Json(order))
}
