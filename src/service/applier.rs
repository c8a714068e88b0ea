use crate::error::StoreError;
use crate::models::{ApplyReport, LineItemUpdate, MatchedShipment};
use crate::store::LineItemStore;
use std::sync::Arc;

/// 批量更新出荷状况, 全部成功或全部不生效
pub struct BatchApplier {
    store: Arc<dyn LineItemStore>,
    confirmed_status: String,
}

impl BatchApplier {
    pub fn new(store: Arc<dyn LineItemStore>, confirmed_status: impl Into<String>) -> Self {
        Self {
            store,
            confirmed_status: confirmed_status.into(),
        }
    }

    pub fn build_updates(&self, updatable: &[MatchedShipment]) -> Vec<LineItemUpdate> {
        updatable
            .iter()
            .map(|m| LineItemUpdate {
                key: m.record.key(),
                ship_date: m.record.ship_date,
                serial_number: m.record.serial_number,
                status: self.confirmed_status.clone(),
            })
            .collect()
    }

    pub async fn apply(&self, updatable: &[MatchedShipment]) -> Result<ApplyReport, StoreError> {
        if updatable.is_empty() {
            tracing::info!("没有可更新的数据, 跳过");
            return Ok(ApplyReport::default());
        }

        let updates = self.build_updates(updatable);
        match self.store.apply_all(&updates).await {
            Ok(rows_affected) => {
                tracing::info!("出荷状况更新完成: {} 条, 影响 {} 行", updates.len(), rows_affected);
                Ok(ApplyReport {
                    statements: updates.len(),
                    rows_affected,
                })
            }
            Err(e) => {
                match (&e, e.failed_key()) {
                    (StoreError::CommitUnknown(_), _) => {
                        tracing::error!("出荷状况更新提交结果未知, 请核对数据后再重试: {}", e)
                    }
                    (_, Some(key)) => tracing::warn!("出荷状况更新失败, 全部回滚 (失败键 {}): {}", key, e),
                    (_, None) => tracing::warn!("出荷状况更新失败, 全部回滚: {}", e),
                }
                Err(e)
            }
        }
    }
}
