use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 电极状况表的复合键 (ギガ注番, 枝番)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineKey {
    pub order_number: String,
    pub line_sequence: i32,
}

impl LineKey {
    pub fn new(order_number: impl Into<String>, line_sequence: i32) -> Self {
        Self {
            order_number: order_number.into(),
            line_sequence,
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.order_number, self.line_sequence)
    }
}

/// 上传文件中的一行 (尚未编号)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRow {
    pub row_number: usize,     // 数据行号, 从1开始 (不含表头)
    pub order_number: String,  // giga_order_num
    pub serial_number: i64,    // sirial_num
    pub ship_date: NaiveDate,  // shiped_date
}

/// 出荷记录: 上传行 + 按序列号推导的枝番
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub row_number: usize,
    pub order_number: String,
    pub serial_number: i64,
    pub ship_date: NaiveDate,
    pub line_sequence: i32,
}

impl ShipmentRecord {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.order_number.clone(), self.line_sequence)
    }
}
