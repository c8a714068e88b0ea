use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, StoreError};
use crate::models::{ApplyReport, Partition, Principal};
use crate::service::applier::BatchApplier;
use crate::service::matcher::RecordMatcher;
use crate::service::partition::partition;
use crate::service::permission::authorize_reconcile;
use crate::store::LineItemStore;
use crate::upload;
use std::sync::Arc;

/// 确认更新后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub partition: Partition,
    pub report: ApplyReport,
}

/// 出荷状况更新流程: 上传 -> 匹配 -> 分组 -> (确认) -> 批量更新
///
/// 中间结果只存在于单次调用内; 确认时重新读取上传内容并重新匹配。
pub struct ReconcileService {
    matcher: RecordMatcher,
    applier: BatchApplier,
    privileged_roles: Vec<String>,
}

impl ReconcileService {
    pub fn new(store: Arc<dyn LineItemStore>, config: &ReconcileConfig) -> Self {
        Self {
            matcher: RecordMatcher::new(store.clone(), config.lookup_strategy),
            applier: BatchApplier::new(store, config.confirmed_status.clone()),
            privileged_roles: config.privileged_roles.clone(),
        }
    }

    /// 预览: 返回可更新与不可更新的数据, 不写入
    pub async fn preview(
        &self,
        principal: &Principal,
        upload: &[u8],
    ) -> Result<Partition, ReconcileError> {
        authorize_reconcile(principal, &self.privileged_roles)?;
        self.match_upload(upload).await
    }

    /// 确认: 重新匹配后对可更新数据执行一次原子更新
    pub async fn confirm(
        &self,
        principal: &Principal,
        upload: &[u8],
    ) -> Result<ReconcileOutcome, ReconcileError> {
        authorize_reconcile(principal, &self.privileged_roles)?;
        let partition = self.match_upload(upload).await?;

        tracing::info!(
            "{} 确认更新: 可更新 {} 条, 不可更新 {} 条",
            principal.email,
            partition.updatable.len(),
            partition.rejected.len()
        );

        let report = self
            .applier
            .apply(&partition.updatable)
            .await
            .map_err(|e| match e {
                StoreError::CommitUnknown(_) => ReconcileError::Unconfirmed(e),
                _ => ReconcileError::Apply(e),
            })?;

        Ok(ReconcileOutcome { partition, report })
    }

    async fn match_upload(&self, upload: &[u8]) -> Result<Partition, ReconcileError> {
        let records = upload::parse_shipments(upload).map_err(|e| {
            tracing::warn!("上传文件格式错误: {}", e);
            e
        })?;

        let matches = self
            .matcher
            .match_records(records)
            .await
            .map_err(ReconcileError::Lookup)?;

        let split = partition(matches);
        if !split.rejected.is_empty() {
            tracing::warn!("不可更新的数据 {} 条 (无对应明细)", split.rejected.len());
        }
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, LookupStrategy};
    use crate::error::{PermissionError, StoreError, UploadError};
    use crate::models::LineKey;
    use crate::store::memory::{principal, MemoryStore};
    use chrono::NaiveDate;

    const EXAMPLE: &str = "giga_order_num\tsirial_num\tshiped_date\n\
                           G1\t30\t2024-07-01\n\
                           G1\t10\t2024-07-01\n";

    fn service(store: Arc<MemoryStore>, strategy: LookupStrategy) -> ReconcileService {
        let mut config = AppConfig::default().reconcile;
        config.lookup_strategy = strategy;
        ReconcileService::new(store, &config)
    }

    fn operator() -> crate::models::Principal {
        principal("ops@example.com", "nagatsu", true, true)
    }

    #[tokio::test]
    async fn example_batch_is_applied_in_one_unit() {
        let store = Arc::new(
            MemoryStore::new()
                .with_line("G1", 1, "E-100")
                .with_line("G1", 2, "E-100"),
        );
        let service = service(store.clone(), LookupStrategy::PerRow);

        let preview = service.preview(&operator(), EXAMPLE.as_bytes()).await.unwrap();
        assert_eq!(preview.updatable.len(), 2);
        assert!(preview.rejected.is_empty());
        // 预览不写入
        assert_eq!(store.get(&LineKey::new("G1", 1)).unwrap().status, None);

        let outcome = service.confirm(&operator(), EXAMPLE.as_bytes()).await.unwrap();
        assert_eq!(outcome.report.statements, 2);

        let first = store.get(&LineKey::new("G1", 1)).unwrap();
        assert_eq!(first.serial_number, Some(10));
        assert_eq!(first.status.as_deref(), Some("OK"));
        let second = store.get(&LineKey::new("G1", 2)).unwrap();
        assert_eq!(second.serial_number, Some(30));
        assert_eq!(second.ship_date, NaiveDate::from_ymd_opt(2024, 7, 1));
    }

    #[tokio::test]
    async fn unmatched_row_does_not_block_the_rest() {
        let store = Arc::new(
            MemoryStore::new()
                .with_line("G1", 1, "E-100")
                .with_line("G1", 2, "E-100"),
        );
        let upload = "giga_order_num\tsirial_num\tshiped_date\n\
                      G1\t30\t2024-07-01\n\
                      G404\t1\t2024-07-01\n\
                      G1\t10\t2024-07-01\n";

        let outcome = service(store.clone(), LookupStrategy::Batched)
            .confirm(&operator(), upload.as_bytes())
            .await
            .unwrap();

        assert_eq!(outcome.partition.updatable.len(), 2);
        assert_eq!(outcome.partition.rejected.len(), 1);
        assert_eq!(outcome.partition.rejected[0].order_number, "G404");
        assert_eq!(outcome.report.statements, 2);
        assert_eq!(store.get(&LineKey::new("G1", 2)).unwrap().serial_number, Some(30));
    }

    #[tokio::test]
    async fn injected_failure_rolls_back_the_whole_batch() {
        let store = Arc::new(
            MemoryStore::new()
                .with_line("G1", 1, "E-100")
                .with_line("G1", 2, "E-100"),
        );
        store.fail_apply_on(LineKey::new("G1", 2));

        let err = service(store.clone(), LookupStrategy::Batched)
            .confirm(&operator(), EXAMPLE.as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Apply(StoreError::Statement { .. })));
        assert_eq!(store.get(&LineKey::new("G1", 1)).unwrap().status, None);
        assert_eq!(store.get(&LineKey::new("G1", 2)).unwrap().status, None);
    }

    #[tokio::test]
    async fn lost_commit_is_not_reported_as_nothing_changed() {
        let store = Arc::new(
            MemoryStore::new()
                .with_line("G1", 1, "E-100")
                .with_line("G1", 2, "E-100"),
        );
        store.lose_commit_reply();

        let err = service(store.clone(), LookupStrategy::Batched)
            .confirm(&operator(), EXAMPLE.as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Unconfirmed(StoreError::CommitUnknown(_))));
        assert!(!err.to_string().contains("nothing changed"));
    }

    #[tokio::test]
    async fn format_error_aborts_before_any_lookup() {
        let store = Arc::new(MemoryStore::new().with_line("G1", 1, "E-100"));
        let upload = "giga_order_num\tshiped_date\nG1\t2024-07-01\n";

        let err = service(store.clone(), LookupStrategy::PerRow)
            .preview(&operator(), upload.as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Upload(UploadError::MissingColumn(_))));
        assert_eq!(store.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn lookup_fault_is_reported_as_such() {
        let store = Arc::new(MemoryStore::new().with_line("G1", 1, "E-100"));
        store.fail_lookups();

        let err = service(store, LookupStrategy::PerRow)
            .confirm(&operator(), EXAMPLE.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Lookup(_)));
    }

    #[tokio::test]
    async fn gate_runs_before_anything_else() {
        let store = Arc::new(MemoryStore::new().with_line("G1", 1, "E-100"));
        let reader = principal("viewer@example.com", "linde", true, false);

        let err = service(store.clone(), LookupStrategy::PerRow)
            .confirm(&reader, EXAMPLE.as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Permission(PermissionError::RoleNotAllowed(_))
        ));
        assert_eq!(store.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn confirming_twice_leaves_the_same_state() {
        let store = Arc::new(
            MemoryStore::new()
                .with_line("G1", 1, "E-100")
                .with_line("G1", 2, "E-100"),
        );
        let service = service(store.clone(), LookupStrategy::Batched);

        service.confirm(&operator(), EXAMPLE.as_bytes()).await.unwrap();
        let before = store.get(&LineKey::new("G1", 2)).unwrap();
        service.confirm(&operator(), EXAMPLE.as_bytes()).await.unwrap();
        let after = store.get(&LineKey::new("G1", 2)).unwrap();

        assert_eq!(before.status, after.status);
        assert_eq!(before.serial_number, after.serial_number);
        assert_eq!(before.ship_date, after.ship_date);
    }
}
