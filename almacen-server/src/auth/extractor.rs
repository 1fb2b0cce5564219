//! JWT Extractor
//!
//! Custom extractor for automatically validating JWT tokens.
//!
//! 浏览器的 EventSource 不能自定义请求头，所以事件流端点
//! 额外接受 `?access_token=` 查询参数；两条路径走同一套验证。

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::utils::AppError;

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted (from middleware)
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .map(str::to_owned)
                .ok_or_else(|| AppError::InvalidToken)?,
            None => match token_from_query(parts.uri.query()) {
                Some(token) => token,
                None => {
                    tracing::warn!(target: "security", uri = %parts.uri, "Missing credentials");
                    return Err(AppError::Unauthorized);
                }
            },
        };

        // Validate token
        let jwt_service = state.jwt_service();
        match jwt_service.validate_token(&token) {
            Ok(claims) => {
                let user = CurrentUser::from(claims);

                // Store in extensions for potential reuse
                parts.extensions.insert(user.clone());

                Ok(user)
            }
            Err(e) => {
                tracing::warn!(target: "security", error = %e, uri = %parts.uri, "Auth failed");

                match e {
                    crate::auth::JwtError::ExpiredToken => Err(AppError::TokenExpired),
                    _ => Err(AppError::InvalidToken),
                }
            }
        }
    }
}

/// 从查询串里取 `access_token`
fn token_from_query(query: Option<&str>) -> Option<String> {
    let query = query?;
    query.split('&').find_map(|pair| {
        pair.strip_prefix("access_token=")
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    })
}
