//! 令牌签发路由
//!
//! 认证属于外部边界：生产部署由会话层签发令牌，事件流只负责
//! 验证并取出订阅者身份。这个端点是开发环境的边界替身，
//! 生产环境下禁用。

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/auth/token", post(issue_token))
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// 秒
    pub expires_in: i64,
}

/// POST /api/auth/token - 签发开发用访问令牌
pub async fn issue_token(
    State(state): State<ServerState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    if state.config.is_production() {
        return Err(AppError::not_found("Not available in production"));
    }

    let token = state
        .jwt_service()
        .generate_token(&req.user_id, &req.username)
        .map_err(|e| AppError::internal(e.to_string()))?;

    Ok(Json(TokenResponse {
        token,
        expires_in: state.config.jwt.expiration_minutes * 60,
    }))
}
