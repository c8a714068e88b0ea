use serde::{Deserialize, Serialize};

use super::{LineItemSummary, OrderLineItem, ShipmentRecord};

/// 单条出荷记录的匹配结果 (仅在一次更新流程内有效)
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub record: ShipmentRecord,
    pub line_item: Option<OrderLineItem>,
}

impl MatchResult {
    pub fn exists(&self) -> bool {
        self.line_item.is_some()
    }
}

/// 可更新的记录: 已确认存在对应明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedShipment {
    #[serde(flatten)]
    pub record: ShipmentRecord,
    pub line_item: LineItemSummary,
}

/// 分组结果, 两组均保持输入顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub updatable: Vec<MatchedShipment>,
    pub rejected: Vec<ShipmentRecord>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.updatable.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 批量更新结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub statements: usize,
    pub rows_affected: u64,
}
