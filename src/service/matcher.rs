use crate::config::LookupStrategy;
use crate::error::StoreError;
use crate::models::{LineKey, MatchResult, OrderLineItem, ShipmentRecord};
use crate::store::LineItemStore;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;

/// 出荷记录 -> 电极状况明细 的匹配 (只读)
pub struct RecordMatcher {
    store: Arc<dyn LineItemStore>,
    strategy: LookupStrategy,
}

impl RecordMatcher {
    pub fn new(store: Arc<dyn LineItemStore>, strategy: LookupStrategy) -> Self {
        Self { store, strategy }
    }

    /// 为每条记录查找 (ギガ注番, 枝番) 对应的明细, 输出与输入等长同序
    ///
    /// 查不到是正常结果; 存储层故障会中止整个匹配。
    pub async fn match_records(
        &self,
        records: Vec<ShipmentRecord>,
    ) -> Result<Vec<MatchResult>, StoreError> {
        let total = records.len();
        let results = match self.strategy {
            LookupStrategy::PerRow => self.match_per_row(records).await?,
            LookupStrategy::Batched => self.match_batched(records).await?,
        };

        let matched = results.iter().filter(|r| r.exists()).count();
        tracing::info!("匹配完成: 总行数: {}, 已匹配: {}, 未匹配: {}", total, matched, total - matched);
        Ok(results)
    }

    async fn match_per_row(
        &self,
        records: Vec<ShipmentRecord>,
    ) -> Result<Vec<MatchResult>, StoreError> {
        let total = records.len();
        let mut results = Vec::with_capacity(total);

        for (idx, record) in records.into_iter().enumerate() {
            let key = record.key();
            let line_item = self.store.lookup(&key).await.map_err(|e| {
                tracing::error!("查询 {} 失败 (第 {} 行): {}", key, record.row_number, e);
                e
            })?;
            if line_item.is_none() {
                tracing::debug!("No line item for {} (row {})", key, record.row_number);
            }
            results.push(MatchResult { record, line_item });

            // 进度日志 (每100行或第一行)
            let current = idx + 1;
            if current % 100 == 0 || current == 1 {
                tracing::info!("查询进度: {}/{}", current, total);
            }
        }

        Ok(results)
    }

    async fn match_batched(
        &self,
        records: Vec<ShipmentRecord>,
    ) -> Result<Vec<MatchResult>, StoreError> {
        // 去重、保序
        let keys: IndexSet<LineKey> = records.iter().map(ShipmentRecord::key).collect();
        let keys: Vec<LineKey> = keys.into_iter().collect();

        let found = self.store.lookup_many(&keys).await.map_err(|e| {
            tracing::error!("批量查询 {} 个键失败: {}", keys.len(), e);
            e
        })?;
        tracing::debug!("批量查询 {} 个键, 命中 {}", keys.len(), found.len());

        let by_key: HashMap<LineKey, OrderLineItem> =
            found.into_iter().map(|item| (item.key(), item)).collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let line_item = by_key.get(&record.key()).cloned();
                MatchResult { record, line_item }
            })
            .collect())
    }
}
