//! 认证边界
//!
//! 核心只需要一件事：在广播器接受订阅之前解析并附着订阅者身份。
//! 这里用 JWT Bearer 令牌承担这个边界，会话/用户管理属于外部系统。

mod extractor;
mod jwt;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
