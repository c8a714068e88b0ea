use crate::error::StoreError;
use crate::models::{
    DefectDraft, DefectReport, ElectrodeStatus, LineItemUpdate, LineKey, OrderLineItem, Principal,
    ShipmentSummary,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::{Duration, Instant};

const LINE_ITEM_COLUMNS: &str = r#"
    es.id,
    es.giga_order_num AS order_number,
    es.edaban AS line_sequence,
    es.item_code,
    es.giga_due_date AS due_date,
    es.status,
    es.sirial_num AS serial_number,
    es.shiped_date AS ship_date,
    es.remarks,
    es.linde_order_num AS linde_order_number,
    es.update_dt AS updated_at
"#;

/// 按 (ギガ注番, 枝番) 查询电极状况明细
pub async fn find_line_item(
    pool: &PgPool,
    key: &LineKey,
) -> Result<Option<OrderLineItem>, sqlx::Error> {
    let sql = format!(
        "SELECT {LINE_ITEM_COLUMNS} FROM public.electrode_status es \
         WHERE es.giga_order_num = $1 AND es.edaban = $2"
    );
    sqlx::query_as::<_, OrderLineItem>(&sql)
        .bind(&key.order_number)
        .bind(key.line_sequence)
        .fetch_optional(pool)
        .await
}

/// 按键集合一次性查询明细 (调用方负责分块)
pub async fn find_line_items(
    pool: &PgPool,
    keys: &[LineKey],
) -> Result<Vec<OrderLineItem>, sqlx::Error> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let order_numbers: Vec<String> = keys.iter().map(|k| k.order_number.clone()).collect();
    let line_sequences: Vec<i32> = keys.iter().map(|k| k.line_sequence).collect();

    let sql = format!(
        "SELECT {LINE_ITEM_COLUMNS} FROM public.electrode_status es \
         WHERE (es.giga_order_num, es.edaban) IN ( \
             SELECT * FROM UNNEST($1::varchar[], $2::int4[]) \
         )"
    );
    sqlx::query_as::<_, OrderLineItem>(&sql)
        .bind(order_numbers)
        .bind(line_sequences)
        .fetch_all(pool)
        .await
}

/// 在一个事务中执行全部更新, 任一失败则整体回滚
///
/// 超时只限制 UPDATE 阶段; COMMIT 一旦发出就等待其结果,
/// 否则无法区分 "未更新" 与 "已提交但未收到应答"。
pub async fn apply_updates(
    pool: &PgPool,
    updates: &[LineItemUpdate],
    timeout: Duration,
) -> Result<u64, StoreError> {
    if updates.is_empty() {
        return Ok(0);
    }

    let tx = pool.begin().await?;
    run_staged(tx, updates, timeout).await
}

/// 可分阶段执行的更新事务: 先逐条 UPDATE, 再 COMMIT 或 ROLLBACK
#[async_trait]
pub(crate) trait UpdateTransaction: Send {
    /// 执行一条 UPDATE, 返回影响行数
    async fn execute_update(&mut self, update: &LineItemUpdate) -> Result<u64, sqlx::Error>;
    async fn commit(self) -> Result<(), sqlx::Error>;
    async fn rollback(self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl UpdateTransaction for Transaction<'static, Postgres> {
    async fn execute_update(&mut self, update: &LineItemUpdate) -> Result<u64, sqlx::Error> {
        let done = sqlx::query(
            r#"
            UPDATE public.electrode_status
            SET shiped_date = $1,
                sirial_num = $2,
                status = $3,
                update_dt = now()
            WHERE giga_order_num = $4
              AND edaban = $5
            "#,
        )
        .bind(update.ship_date)
        .bind(update.serial_number)
        .bind(&update.status)
        .bind(&update.key.order_number)
        .bind(update.key.line_sequence)
        .execute(&mut **self)
        .await?;
        Ok(done.rows_affected())
    }

    async fn commit(self) -> Result<(), sqlx::Error> {
        Transaction::commit(self).await
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        Transaction::rollback(self).await
    }
}

/// UPDATE 阶段在超时内执行, COMMIT 在超时之外执行
pub(crate) async fn run_staged<T: UpdateTransaction>(
    mut tx: T,
    updates: &[LineItemUpdate],
    timeout: Duration,
) -> Result<u64, StoreError> {
    tracing::debug!("开始批量更新, {} 条记录", updates.len());
    let start_time = Instant::now();

    let staged = tokio::time::timeout(timeout, stage_updates(&mut tx, updates)).await;

    let rows = match staged {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => {
            rollback(tx).await;
            tracing::error!(
                "✗ UPDATE执行失败, 已回滚, 耗时: {:?}, 错误: {}",
                start_time.elapsed(),
                e
            );
            return Err(e);
        }
        Err(_) => {
            rollback(tx).await;
            tracing::error!("✗ UPDATE操作超时 (>{:?}), 已回滚", timeout);
            return Err(StoreError::Timeout(timeout));
        }
    };

    if let Err(e) = tx.commit().await {
        tracing::error!(
            "✗ COMMIT失败, 结果未知, 耗时: {:?}, 错误: {}",
            start_time.elapsed(),
            e
        );
        return Err(StoreError::CommitUnknown(e));
    }

    tracing::info!(
        "✓ UPDATE执行成功, 影响 {} 行, 耗时: {:?}",
        rows,
        start_time.elapsed()
    );
    Ok(rows)
}

async fn stage_updates<T: UpdateTransaction>(
    tx: &mut T,
    updates: &[LineItemUpdate],
) -> Result<u64, StoreError> {
    let mut total = 0u64;

    for update in updates {
        match tx.execute_update(update).await {
            Ok(0) => {
                return Err(StoreError::RowMissing {
                    key: update.key.clone(),
                });
            }
            Ok(rows) => {
                tracing::debug!("更新 {} -> 序列号 {}", update.key, update.serial_number);
                total += rows;
            }
            Err(e) => {
                return Err(StoreError::Statement {
                    key: update.key.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(total)
}

async fn rollback<T: UpdateTransaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!("回滚失败 (连接关闭时会自动回滚): {}", e);
    }
}

/// 最新的出荷实绩日 (降序)
pub async fn recent_shipment_dates(pool: &PgPool, limit: i64) -> Result<Vec<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT DISTINCT shiped_date
        FROM public.electrode_status
        WHERE shiped_date IS NOT NULL
        ORDER BY shiped_date DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// 指定出荷实绩日的出荷数据, 按 ギガ注番 合并序列号
pub async fn shipments_on_dates(
    pool: &PgPool,
    dates: &[NaiveDate],
) -> Result<Vec<ShipmentSummary>, sqlx::Error> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, ShipmentSummary>(
        r#"
        SELECT
            es.shiped_date AS ship_date,
            MAX(es.linde_order_num) AS linde_order_number,
            es.giga_order_num AS order_number,
            MAX(es.item_code) AS item_code,
            MAX(es.giga_due_date) AS due_date,
            string_agg(es.sirial_num::text, ',' ORDER BY es.sirial_num) AS serials,
            string_agg(es.remarks, ',' ORDER BY es.sirial_num) AS remarks
        FROM public.electrode_status es
        WHERE es.shiped_date = ANY($1::date[])
        GROUP BY es.shiped_date, es.giga_order_num
        ORDER BY ship_date DESC, due_date DESC, order_number DESC
        "#,
    )
    .bind(dates)
    .fetch_all(pool)
    .await
}

/// 品目一览 (v_item_list)
pub async fn item_codes(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT item_code FROM public.v_item_list")
        .fetch_all(pool)
        .await
}

/// 指定品目的电极状况: 未分配序列号的在前, 其余按序列号降序
pub async fn electrode_status_list(
    pool: &PgPool,
    item_code: &str,
) -> Result<Vec<ElectrodeStatus>, sqlx::Error> {
    sqlx::query_as::<_, ElectrodeStatus>(
        r#"
        SELECT
            es.id,
            es.linde_order_num AS linde_order_number,
            es.giga_order_num AS order_number,
            es.item_code,
            es.giga_due_date AS due_date,
            es.sirial_num AS serial_number,
            es.status,
            es.remarks,
            es.ship_plan AS planned_ship_date,
            es.shiped_date AS ship_date,
            es.daicho_haneibi AS ledger_date,
            es.linde_remarks
        FROM public.electrode_status es
        WHERE es.item_code = $1
        ORDER BY
            (CASE WHEN es.sirial_num IS NULL THEN 0 ELSE 1 END),
            es.sirial_num DESC,
            es.giga_due_date DESC,
            es.giga_order_num DESC
        "#,
    )
    .bind(item_code)
    .fetch_all(pool)
    .await
}

/// 不具合电极登记, 按不具合发生日、最后更新时间降序; limit 为 None 时返回全部
pub async fn list_defects(
    pool: &PgPool,
    limit: Option<i64>,
) -> Result<Vec<DefectReport>, sqlx::Error> {
    sqlx::query_as::<_, DefectReport>(
        r#"
        SELECT
            de.id,
            de.item_code,
            de.serial_num AS serial_number,
            de.defect_date,
            de.defect_status,
            de.defect_description AS description,
            de.linde_remarks,
            CASE
                WHEN de.updated_by != '' THEN ur_update.user_name
                ELSE ur_create.user_name
            END AS registered_by,
            CASE
                WHEN de.updated_at > de.created_at THEN de.updated_at
                ELSE de.created_at
            END AS last_updated_at
        FROM public.defective_electrodes de
        LEFT JOIN public.user_roles ur_create ON de.created_by = ur_create.email
        LEFT JOIN public.user_roles ur_update ON de.updated_by = ur_update.email
        ORDER BY
            de.defect_date DESC,
            COALESCE(de.updated_at, de.created_at) DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn insert_defect(
    pool: &PgPool,
    draft: &DefectDraft,
    created_by: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO public.defective_electrodes
            (item_code, serial_num, defect_date, defect_status, defect_description, linde_remarks, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&draft.item_code)
    .bind(&draft.serial_number)
    .bind(draft.defect_date)
    .bind(&draft.defect_status)
    .bind(&draft.description)
    .bind(&draft.linde_remarks)
    .bind(created_by)
    .fetch_one(pool)
    .await
}

/// 返回影响行数, 0 表示该 id 不存在
pub async fn update_defect(
    pool: &PgPool,
    id: i64,
    draft: &DefectDraft,
    updated_by: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE public.defective_electrodes
        SET item_code = $1,
            serial_num = $2,
            defect_date = $3,
            defect_status = $4,
            defect_description = $5,
            linde_remarks = $6,
            updated_at = now(),
            updated_by = $7
        WHERE id = $8
        "#,
    )
    .bind(&draft.item_code)
    .bind(&draft.serial_number)
    .bind(draft.defect_date)
    .bind(&draft.defect_status)
    .bind(&draft.description)
    .bind(&draft.linde_remarks)
    .bind(updated_by)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_defect(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM public.defective_electrodes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// 查询用户角色与权限
pub async fn find_principal(pool: &PgPool, email: &str) -> Result<Option<Principal>, sqlx::Error> {
    sqlx::query_as::<_, Principal>(
        r#"
        SELECT email, user_name, role, can_read, can_write, email_confirmed_at
        FROM public.user_roles
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}
