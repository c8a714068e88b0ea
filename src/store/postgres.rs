use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::time::Duration;

use super::{DefectStore, LineItemStore, PrincipalDirectory};
use crate::db::queries;
use crate::error::StoreError;
use crate::models::{
    DefectDraft, DefectReport, ElectrodeStatus, LineItemUpdate, LineKey, OrderLineItem, Principal,
    ShipmentSummary,
};

/// 每次集合查询的最大键数
const LOOKUP_CHUNK: usize = 1000;

/// 基于 PostgreSQL 连接池的存储实现
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    apply_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, apply_timeout: Duration) -> Self {
        Self {
            pool,
            apply_timeout,
        }
    }
}

#[async_trait]
impl LineItemStore for PgStore {
    async fn lookup(&self, key: &LineKey) -> Result<Option<OrderLineItem>, StoreError> {
        Ok(queries::find_line_item(&self.pool, key).await?)
    }

    async fn lookup_many(&self, keys: &[LineKey]) -> Result<Vec<OrderLineItem>, StoreError> {
        let mut found = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(LOOKUP_CHUNK) {
            found.extend(queries::find_line_items(&self.pool, chunk).await?);
        }
        Ok(found)
    }

    async fn apply_all(&self, updates: &[LineItemUpdate]) -> Result<u64, StoreError> {
        queries::apply_updates(&self.pool, updates, self.apply_timeout).await
    }

    async fn recent_shipment_dates(&self, limit: i64) -> Result<Vec<NaiveDate>, StoreError> {
        Ok(queries::recent_shipment_dates(&self.pool, limit).await?)
    }

    async fn shipments_on(&self, dates: &[NaiveDate]) -> Result<Vec<ShipmentSummary>, StoreError> {
        Ok(queries::shipments_on_dates(&self.pool, dates).await?)
    }

    async fn item_codes(&self) -> Result<Vec<String>, StoreError> {
        Ok(queries::item_codes(&self.pool).await?)
    }

    async fn status_list(&self, item_code: &str) -> Result<Vec<ElectrodeStatus>, StoreError> {
        Ok(queries::electrode_status_list(&self.pool, item_code).await?)
    }
}

#[async_trait]
impl DefectStore for PgStore {
    async fn list_defects(&self, limit: Option<i64>) -> Result<Vec<DefectReport>, StoreError> {
        Ok(queries::list_defects(&self.pool, limit).await?)
    }

    async fn insert_defect(&self, draft: &DefectDraft, created_by: &str) -> Result<i64, StoreError> {
        Ok(queries::insert_defect(&self.pool, draft, created_by).await?)
    }

    async fn update_defect(
        &self,
        id: i64,
        draft: &DefectDraft,
        updated_by: &str,
    ) -> Result<bool, StoreError> {
        Ok(queries::update_defect(&self.pool, id, draft, updated_by).await? > 0)
    }

    async fn delete_defect(&self, id: i64) -> Result<bool, StoreError> {
        Ok(queries::delete_defect(&self.pool, id).await? > 0)
    }
}

#[async_trait]
impl PrincipalDirectory for PgStore {
    async fn find_principal(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        Ok(queries::find_principal(&self.pool, email).await?)
    }
}
