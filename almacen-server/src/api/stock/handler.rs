//! 库存 API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::repository::StockItem;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

/// POST /api/stock - 建档库存条目
pub async fn register(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Json(item): Json<StockItem>,
) -> AppResult<Json<StockItem>> {
    let item = state.stock.register(item).await?;
    Ok(Json(item))
}

/// GET /api/stock/:id - 读取库存条目
pub async fn get_by_id(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<StockItem>> {
    let item = state.stock.get(&id).await?;
    Ok(Json(item))
}

/// PUT /api/stock/:id/quantity - 写入新数量
///
/// 数量落地后由阈值评估器决定是否产生告警，写入方不感知。
pub async fn set_quantity(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<SetQuantityRequest>,
) -> AppResult<Json<StockItem>> {
    let item = state.stock.set_quantity(&id, req.quantity).await?;
    Ok(Json(item))
}
