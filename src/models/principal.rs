use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 已认证的调用者 (public.user_roles)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub user_name: Option<String>,
    pub role: String,
    pub can_read: bool,
    pub can_write: bool,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}
