use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 最新出荷数据: 每个 (出荷实绩日, ギガ注番) 一行, 序列号按升序合并
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShipmentSummary {
    pub ship_date: NaiveDate,
    pub linde_order_number: Option<String>,
    pub order_number: String,
    pub item_code: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub serials: Option<String>,
    pub remarks: Option<String>,
}
