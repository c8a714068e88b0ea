use crate::error::StatusQueryError;
use crate::models::{ElectrodeStatus, Principal};
use crate::service::permission::authorize_read;
use crate::store::LineItemStore;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

/// 电极状况一览的过滤条件, 各条件独立生效, 边界包含在内
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusFilter {
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub shipped_on: Option<NaiveDate>,
    pub serial_from: Option<i64>,
    pub serial_to: Option<i64>,
}

impl StatusFilter {
    pub fn matches(&self, row: &ElectrodeStatus) -> bool {
        within(row.due_date, self.due_from, self.due_to)
            && self.shipped_on.map_or(true, |d| row.ship_date == Some(d))
            && within(row.serial_number, self.serial_from, self.serial_to)
    }
}

/// 未设置的边界不限制; 设置了任一边界时空值不匹配
fn within<T: PartialOrd + Copy>(value: Option<T>, from: Option<T>, to: Option<T>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    from.map_or(true, |f| value >= f) && to.map_or(true, |t| value <= t)
}

/// 按品目查看溶射电极状况 (只读)
pub struct StatusService {
    store: Arc<dyn LineItemStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn LineItemStore>) -> Self {
        Self { store }
    }

    pub async fn item_codes(&self, principal: &Principal) -> Result<Vec<String>, StatusQueryError> {
        authorize_read(principal)?;
        Ok(self.store.item_codes().await?)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        item_code: &str,
        filter: &StatusFilter,
    ) -> Result<Vec<ElectrodeStatus>, StatusQueryError> {
        authorize_read(principal)?;

        let item_code = item_code.trim();
        if !self.store.item_codes().await?.iter().any(|c| c == item_code) {
            return Err(StatusQueryError::UnknownItem(item_code.to_string()));
        }

        let rows = self.store.status_list(item_code).await?;
        let total = rows.len();
        let rows: Vec<ElectrodeStatus> = rows.into_iter().filter(|r| filter.matches(r)).collect();
        tracing::debug!("品目 {} 电极状况 {} 条, 过滤后 {} 条", item_code, total, rows.len());

        Ok(rows)
    }
}
