use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 不具合状况的可选值
pub const DEFECT_STATUSES: [&str; 2] = ["判定中", "廃棄"];

/// 不具合电极登记 (列表显示用)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DefectReport {
    pub id: i64,
    pub item_code: String,
    pub serial_number: String,
    pub defect_date: NaiveDate,
    pub defect_status: String,
    pub description: String,
    pub linde_remarks: Option<String>,
    /// 最后修改者的用户名, 未修改过时为登记者
    pub registered_by: Option<String>,
    /// updated_at 与 created_at 中较新的一个 (UTC)
    pub last_updated_at: DateTime<Utc>,
}

/// 登记 / 修改时提交的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectDraft {
    pub item_code: String,
    pub serial_number: String,
    pub defect_date: NaiveDate,
    pub defect_status: String,
    pub description: String,
    #[serde(default)]
    pub linde_remarks: String,
}
