//! 存储协作方: 电极状况表、不具合电极表与用户角色表

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::{
    DefectDraft, DefectReport, ElectrodeStatus, LineItemUpdate, LineKey, OrderLineItem, Principal,
    ShipmentSummary,
};

pub use postgres::PgStore;

#[async_trait]
pub trait LineItemStore: Send + Sync {
    /// 按复合键查询, 不存在时返回 None
    async fn lookup(&self, key: &LineKey) -> Result<Option<OrderLineItem>, StoreError>;

    /// 按键集合查询, 只返回存在的明细 (顺序不保证)
    async fn lookup_many(&self, keys: &[LineKey]) -> Result<Vec<OrderLineItem>, StoreError> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(item) = self.lookup(key).await? {
                found.push(item);
            }
        }
        Ok(found)
    }

    /// 原子地执行全部更新: 要么全部提交, 要么全部不生效
    async fn apply_all(&self, updates: &[LineItemUpdate]) -> Result<u64, StoreError>;

    async fn recent_shipment_dates(&self, limit: i64) -> Result<Vec<NaiveDate>, StoreError>;

    async fn shipments_on(&self, dates: &[NaiveDate]) -> Result<Vec<ShipmentSummary>, StoreError>;

    /// 品目一览
    async fn item_codes(&self) -> Result<Vec<String>, StoreError>;

    /// 指定品目的全部明细, 未分配序列号的在前, 其余按序列号降序
    async fn status_list(&self, item_code: &str) -> Result<Vec<ElectrodeStatus>, StoreError>;
}

/// 不具合电极登记
#[async_trait]
pub trait DefectStore: Send + Sync {
    /// 按不具合发生日、最后更新时间降序
    async fn list_defects(&self, limit: Option<i64>) -> Result<Vec<DefectReport>, StoreError>;

    async fn insert_defect(&self, draft: &DefectDraft, created_by: &str) -> Result<i64, StoreError>;

    /// id 不存在时返回 false
    async fn update_defect(
        &self,
        id: i64,
        draft: &DefectDraft,
        updated_by: &str,
    ) -> Result<bool, StoreError>;

    async fn delete_defect(&self, id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_principal(&self, email: &str) -> Result<Option<Principal>, StoreError>;
}
