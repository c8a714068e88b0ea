use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::LineKey;

/// 电极状况表 (public.electrode_status) 的一行
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: i64,
    pub order_number: String,               // giga_order_num
    pub line_sequence: i32,                 // edaban
    pub item_code: String,
    pub due_date: Option<NaiveDate>,        // giga_due_date
    pub status: Option<String>,
    pub serial_number: Option<i64>,         // sirial_num, 出荷前为空
    pub ship_date: Option<NaiveDate>,       // shiped_date
    pub remarks: Option<String>,
    pub linde_order_number: Option<String>, // linde_order_num
    pub updated_at: Option<DateTime<Utc>>,  // update_dt
}

impl OrderLineItem {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.order_number.clone(), self.line_sequence)
    }

    pub fn summary(&self) -> LineItemSummary {
        LineItemSummary {
            id: self.id,
            item_code: self.item_code.clone(),
        }
    }
}

/// 匹配结果中展示用的明细信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemSummary {
    pub id: i64,
    pub item_code: String,
}

/// 单行更新: 写入出荷日、序列号与确认状态, update_dt 由数据库 now() 设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemUpdate {
    pub key: LineKey,
    pub ship_date: NaiveDate,
    pub serial_number: i64,
    pub status: String,
}
