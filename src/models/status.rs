use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 溶射电极状况一览的一行 (按品目查询)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ElectrodeStatus {
    pub id: i64,
    pub linde_order_number: Option<String>, // リンデ注番
    pub order_number: String,               // ギガ注番
    pub item_code: String,
    pub due_date: Option<NaiveDate>, // ギガ納期
    pub serial_number: Option<i64>,
    pub status: Option<String>,
    pub remarks: Option<String>,
    pub planned_ship_date: Option<NaiveDate>, // 出荷予定日
    pub ship_date: Option<NaiveDate>,         // 出荷実績日
    pub ledger_date: Option<NaiveDate>,       // 台帳反映日
    pub linde_remarks: Option<String>,
}
