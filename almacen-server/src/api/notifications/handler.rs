//! 通知生产者接口
//!
//! 业务层（CRUD 页面、导入管线等外部协作者）通过这里创建通知。

use axum::{Json, extract::State};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::notify::CreateNotification;
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// POST /api/notifications - 按模板创建并投递通知
///
/// `target_id` 缺省表示广播。模板错误按调用方错误返回
/// (`UnknownTemplate` → 404, `MissingVariable` → 400)。
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<CreateNotification>,
) -> AppResult<Json<CreatedResponse>> {
    tracing::debug!(
        template = %req.template_name,
        producer = %user.id,
        "Notification create requested"
    );

    let id = state.dispatcher.create_notification(req)?;
    Ok(Json(CreatedResponse { id }))
}
