use crate::config::ShipmentsConfig;
use crate::error::ShipmentQueryError;
use crate::models::{Principal, ShipmentSummary};
use crate::service::permission::authorize_read;
use crate::store::LineItemStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 最新出荷数据查询条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentQuery {
    /// 最新出荷实绩日的件数
    pub limit: Option<i64>,
    /// 只看某一天, 为空时显示全部最新日期
    pub date: Option<NaiveDate>,
    pub linde_order: Option<String>,
    pub order: Option<String>,
    pub item_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentListing {
    pub dates: Vec<NaiveDate>,
    pub shipments: Vec<ShipmentSummary>,
}

/// 最新出荷数据检索 (只读)
pub struct ShipmentService {
    store: Arc<dyn LineItemStore>,
    config: ShipmentsConfig,
}

impl ShipmentService {
    pub fn new(store: Arc<dyn LineItemStore>, config: ShipmentsConfig) -> Self {
        Self { store, config }
    }

    pub async fn recent_dates(
        &self,
        principal: &Principal,
        limit: Option<i64>,
    ) -> Result<Vec<NaiveDate>, ShipmentQueryError> {
        authorize_read(principal)?;
        let limit = self.checked_limit(limit)?;
        Ok(self.store.recent_shipment_dates(limit).await?)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        query: &ShipmentQuery,
    ) -> Result<ShipmentListing, ShipmentQueryError> {
        let dates = self.recent_dates(principal, query.limit).await?;
        if dates.is_empty() {
            return Ok(ShipmentListing {
                dates,
                shipments: Vec::new(),
            });
        }

        let targets = match query.date {
            Some(date) if dates.contains(&date) => vec![date],
            Some(date) => return Err(ShipmentQueryError::UnknownDate(date)),
            None => dates.clone(),
        };

        let shipments = self.store.shipments_on(&targets).await?;
        let total = shipments.len();
        let shipments = apply_filters(shipments, query);
        tracing::debug!("出荷数据 {} 条, 过滤后 {} 条", total, shipments.len());

        Ok(ShipmentListing { dates, shipments })
    }

    fn checked_limit(&self, limit: Option<i64>) -> Result<i64, ShipmentQueryError> {
        let limit = limit.unwrap_or(self.config.default_limit);
        if !self.config.limit_options.contains(&limit) {
            return Err(ShipmentQueryError::InvalidLimit {
                limit,
                allowed: self.config.limit_options.clone(),
            });
        }
        Ok(limit)
    }
}

/// 部分匹配过滤, 空条件忽略
pub fn apply_filters(shipments: Vec<ShipmentSummary>, query: &ShipmentQuery) -> Vec<ShipmentSummary> {
    shipments
        .into_iter()
        .filter(|s| contains(s.linde_order_number.as_deref(), query.linde_order.as_deref()))
        .filter(|s| contains(Some(s.order_number.as_str()), query.order.as_deref()))
        .filter(|s| contains(s.item_code.as_deref(), query.item_code.as_deref()))
        .collect()
}

fn contains(value: Option<&str>, needle: Option<&str>) -> bool {
    match needle.filter(|n| !n.is_empty()) {
        None => true,
        Some(needle) => value.is_some_and(|v| v.contains(needle)),
    }
}
