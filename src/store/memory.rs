//! 测试用内存存储, 支持注入故障

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{DefectStore, LineItemStore, PrincipalDirectory};
use crate::error::StoreError;
use crate::models::{
    DefectDraft, DefectReport, ElectrodeStatus, LineItemUpdate, LineKey, OrderLineItem, Principal,
    ShipmentSummary,
};

/// defective_electrodes 的一行
struct StoredDefect {
    id: i64,
    draft: DefectDraft,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    items: Mutex<BTreeMap<LineKey, OrderLineItem>>,
    principals: Mutex<HashMap<String, Principal>>,
    defects: Mutex<Vec<StoredDefect>>,
    last_defect_id: AtomicI64,
    fail_on: Mutex<Option<LineKey>>,
    lookups_fail: AtomicBool,
    commit_reply_lost: AtomicBool,
    lookup_calls: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 添加一条尚未出荷的明细
    pub(crate) fn with_line(self, order_number: &str, line_sequence: i32, item_code: &str) -> Self {
        self.insert(line_item(order_number, line_sequence, item_code));
        self
    }

    pub(crate) fn with_principal(self, principal: Principal) -> Self {
        self.principals
            .lock()
            .unwrap()
            .insert(principal.email.clone(), principal);
        self
    }

    pub(crate) fn insert(&self, item: OrderLineItem) {
        self.items.lock().unwrap().insert(item.key(), item);
    }

    pub(crate) fn get(&self, key: &LineKey) -> Option<OrderLineItem> {
        self.items.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn fail_apply_on(&self, key: LineKey) {
        *self.fail_on.lock().unwrap() = Some(key);
    }

    /// 提交生效但调用方收不到应答
    pub(crate) fn lose_commit_reply(&self) {
        self.commit_reply_lost.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_lookups(&self) {
        self.lookups_fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    fn check_lookup(&self) -> Result<(), StoreError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.lookups_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

pub(crate) fn line_item(order_number: &str, line_sequence: i32, item_code: &str) -> OrderLineItem {
    OrderLineItem {
        id: i64::from(line_sequence) + 1000 * order_number.len() as i64,
        order_number: order_number.to_string(),
        line_sequence,
        item_code: item_code.to_string(),
        due_date: None,
        status: None,
        serial_number: None,
        ship_date: None,
        remarks: None,
        linde_order_number: None,
        updated_at: None,
    }
}

pub(crate) fn principal(email: &str, role: &str, can_read: bool, can_write: bool) -> Principal {
    Principal {
        email: email.to_string(),
        user_name: Some(email.split('@').next().unwrap_or(email).to_string()),
        role: role.to_string(),
        can_read,
        can_write,
        email_confirmed_at: Some(Utc::now()),
    }
}

#[async_trait]
impl LineItemStore for MemoryStore {
    async fn lookup(&self, key: &LineKey) -> Result<Option<OrderLineItem>, StoreError> {
        self.check_lookup()?;
        Ok(self.get(key))
    }

    async fn lookup_many(&self, keys: &[LineKey]) -> Result<Vec<OrderLineItem>, StoreError> {
        self.check_lookup()?;
        let items = self.items.lock().unwrap();
        Ok(keys.iter().filter_map(|k| items.get(k).cloned()).collect())
    }

    async fn apply_all(&self, updates: &[LineItemUpdate]) -> Result<u64, StoreError> {
        let fail_on = self.fail_on.lock().unwrap().clone();
        let mut items = self.items.lock().unwrap();

        // 在副本上执行, 全部成功后才替换
        let mut staged = items.clone();
        for update in updates {
            if fail_on.as_ref() == Some(&update.key) {
                return Err(StoreError::Statement {
                    key: update.key.clone(),
                    message: "injected constraint violation".to_string(),
                });
            }
            let Some(item) = staged.get_mut(&update.key) else {
                return Err(StoreError::RowMissing {
                    key: update.key.clone(),
                });
            };
            item.ship_date = Some(update.ship_date);
            item.serial_number = Some(update.serial_number);
            item.status = Some(update.status.clone());
            item.updated_at = Some(Utc::now());
        }

        *items = staged;
        if self.commit_reply_lost.load(Ordering::SeqCst) {
            return Err(StoreError::CommitUnknown(sqlx::Error::PoolClosed));
        }
        Ok(updates.len() as u64)
    }

    async fn recent_shipment_dates(&self, limit: i64) -> Result<Vec<NaiveDate>, StoreError> {
        let items = self.items.lock().unwrap();
        let mut dates: Vec<NaiveDate> = items.values().filter_map(|i| i.ship_date).collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        dates.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(dates)
    }

    async fn shipments_on(&self, dates: &[NaiveDate]) -> Result<Vec<ShipmentSummary>, StoreError> {
        let items = self.items.lock().unwrap();

        let mut groups: IndexMap<(NaiveDate, String), Vec<&OrderLineItem>> = IndexMap::new();
        for item in items.values() {
            if let Some(date) = item.ship_date.filter(|d| dates.contains(d)) {
                groups
                    .entry((date, item.order_number.clone()))
                    .or_default()
                    .push(item);
            }
        }

        let mut summaries: Vec<ShipmentSummary> = groups
            .into_iter()
            .map(|((ship_date, order_number), mut members)| {
                members.sort_by_key(|i| i.serial_number);
                let serials: Vec<String> = members
                    .iter()
                    .filter_map(|i| i.serial_number.map(|s| s.to_string()))
                    .collect();
                let remarks: Vec<&str> = members.iter().filter_map(|i| i.remarks.as_deref()).collect();
                ShipmentSummary {
                    ship_date,
                    linde_order_number: members.iter().filter_map(|i| i.linde_order_number.clone()).max(),
                    order_number,
                    item_code: members.iter().map(|i| i.item_code.clone()).max(),
                    due_date: members.iter().filter_map(|i| i.due_date).max(),
                    serials: (!serials.is_empty()).then(|| serials.join(",")),
                    remarks: (!remarks.is_empty()).then(|| remarks.join(",")),
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.ship_date
                .cmp(&a.ship_date)
                // Postgres 的 DESC 把 NULL 排在最前
                .then_with(|| desc_nulls_first(a.due_date, b.due_date))
                .then_with(|| b.order_number.cmp(&a.order_number))
        });
        Ok(summaries)
    }

    async fn item_codes(&self) -> Result<Vec<String>, StoreError> {
        let items = self.items.lock().unwrap();
        let mut codes: Vec<String> = items.values().map(|i| i.item_code.clone()).collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    async fn status_list(&self, item_code: &str) -> Result<Vec<ElectrodeStatus>, StoreError> {
        self.check_lookup()?;
        let items = self.items.lock().unwrap();
        let mut rows: Vec<ElectrodeStatus> = items
            .values()
            .filter(|i| i.item_code == item_code)
            .map(|i| ElectrodeStatus {
                id: i.id,
                linde_order_number: i.linde_order_number.clone(),
                order_number: i.order_number.clone(),
                item_code: i.item_code.clone(),
                due_date: i.due_date,
                serial_number: i.serial_number,
                status: i.status.clone(),
                remarks: i.remarks.clone(),
                planned_ship_date: None,
                ship_date: i.ship_date,
                ledger_date: None,
                linde_remarks: None,
            })
            .collect();

        // 与 SQL 一致: 序列号为空的在前; DESC 时 NULL 在前
        rows.sort_by(|a, b| {
            a.serial_number
                .is_some()
                .cmp(&b.serial_number.is_some())
                .then_with(|| b.serial_number.cmp(&a.serial_number))
                .then_with(|| desc_nulls_first(a.due_date, b.due_date))
                .then_with(|| b.order_number.cmp(&a.order_number))
        });
        Ok(rows)
    }
}

fn desc_nulls_first<T: Ord>(a: Option<T>, b: Option<T>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

#[async_trait]
impl DefectStore for MemoryStore {
    async fn list_defects(&self, limit: Option<i64>) -> Result<Vec<DefectReport>, StoreError> {
        let defects = self.defects.lock().unwrap();
        let principals = self.principals.lock().unwrap();
        let name_of = |email: &str| principals.get(email).and_then(|p| p.user_name.clone());

        let mut ordered: Vec<&StoredDefect> = defects.iter().collect();
        ordered.sort_by(|a, b| {
            b.draft
                .defect_date
                .cmp(&a.draft.defect_date)
                .then_with(|| {
                    b.updated_at
                        .unwrap_or(b.created_at)
                        .cmp(&a.updated_at.unwrap_or(a.created_at))
                })
        });
        if let Some(limit) = limit {
            ordered.truncate(usize::try_from(limit).unwrap_or(0));
        }

        Ok(ordered
            .into_iter()
            .map(|d| DefectReport {
                id: d.id,
                item_code: d.draft.item_code.clone(),
                serial_number: d.draft.serial_number.clone(),
                defect_date: d.draft.defect_date,
                defect_status: d.draft.defect_status.clone(),
                description: d.draft.description.clone(),
                linde_remarks: Some(d.draft.linde_remarks.clone()),
                registered_by: match d.updated_by.as_deref() {
                    Some(email) if !email.is_empty() => name_of(email),
                    _ => name_of(&d.created_by),
                },
                last_updated_at: d
                    .updated_at
                    .filter(|u| *u > d.created_at)
                    .unwrap_or(d.created_at),
            })
            .collect())
    }

    async fn insert_defect(&self, draft: &DefectDraft, created_by: &str) -> Result<i64, StoreError> {
        let id = self.last_defect_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.defects.lock().unwrap().push(StoredDefect {
            id,
            draft: draft.clone(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        });
        Ok(id)
    }

    async fn update_defect(
        &self,
        id: i64,
        draft: &DefectDraft,
        updated_by: &str,
    ) -> Result<bool, StoreError> {
        let mut defects = self.defects.lock().unwrap();
        let Some(stored) = defects.iter_mut().find(|d| d.id == id) else {
            return Ok(false);
        };
        stored.draft = draft.clone();
        stored.updated_by = Some(updated_by.to_string());
        stored.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn delete_defect(&self, id: i64) -> Result<bool, StoreError> {
        let mut defects = self.defects.lock().unwrap();
        let before = defects.len();
        defects.retain(|d| d.id != id);
        Ok(defects.len() < before)
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryStore {
    async fn find_principal(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self.principals.lock().unwrap().get(email).cloned())
    }
}
