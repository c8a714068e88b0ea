use crate::error::DefectError;
use crate::models::{DefectDraft, DefectReport, Principal, DEFECT_STATUSES};
use crate::service::permission::{authorize_read, authorize_write};
use crate::store::DefectStore;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

/// 不具合电极列表的查询条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefectQuery {
    /// 为 false 时只取最新的 recent_limit 件
    #[serde(default)]
    pub all: bool,
    pub item_code: Option<String>,
    pub serial: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DefectQuery {
    fn matches(&self, report: &DefectReport) -> bool {
        self.item_code
            .as_deref()
            .filter(|c| !c.is_empty())
            .map_or(true, |c| report.item_code == c)
            && self
                .serial
                .map_or(true, |s| report.serial_number.trim().parse::<i64>() == Ok(s))
            && self.from.map_or(true, |d| report.defect_date >= d)
            && self.to.map_or(true, |d| report.defect_date <= d)
    }
}

/// 不具合电极登记: 读需要读权限, 登记 / 修改 / 删除需要写权限
pub struct DefectService {
    store: Arc<dyn DefectStore>,
    recent_limit: i64,
}

impl DefectService {
    pub fn new(store: Arc<dyn DefectStore>, recent_limit: i64) -> Self {
        Self {
            store,
            recent_limit,
        }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        query: &DefectQuery,
    ) -> Result<Vec<DefectReport>, DefectError> {
        authorize_read(principal)?;
        let limit = (!query.all).then_some(self.recent_limit);
        let reports = self.store.list_defects(limit).await?;
        Ok(reports.into_iter().filter(|r| query.matches(r)).collect())
    }

    pub async fn register(
        &self,
        principal: &Principal,
        draft: &DefectDraft,
    ) -> Result<i64, DefectError> {
        authorize_write(principal)?;
        let draft = normalize(draft)?;
        let id = self.store.insert_defect(&draft, &principal.email).await?;
        tracing::info!(
            "{} 登记不具合电极 {} / {} (id {})",
            principal.email,
            draft.item_code,
            draft.serial_number,
            id
        );
        Ok(id)
    }

    pub async fn revise(
        &self,
        principal: &Principal,
        id: i64,
        draft: &DefectDraft,
    ) -> Result<(), DefectError> {
        authorize_write(principal)?;
        let draft = normalize(draft)?;
        if !self.store.update_defect(id, &draft, &principal.email).await? {
            return Err(DefectError::NotFound(id));
        }
        tracing::info!("{} 修改不具合电极 id {}", principal.email, id);
        Ok(())
    }

    pub async fn remove(&self, principal: &Principal, id: i64) -> Result<(), DefectError> {
        authorize_write(principal)?;
        if !self.store.delete_defect(id).await? {
            return Err(DefectError::NotFound(id));
        }
        tracing::info!("{} 删除不具合电极 id {}", principal.email, id);
        Ok(())
    }
}

/// 去除首尾空白并检查必填项
fn normalize(draft: &DefectDraft) -> Result<DefectDraft, DefectError> {
    let required = |value: &str, field: &'static str| {
        let value = value.trim();
        if value.is_empty() {
            Err(DefectError::MissingField(field))
        } else {
            Ok(value.to_string())
        }
    };

    let item_code = required(&draft.item_code, "item_code")?;
    let serial_number = required(&draft.serial_number, "serial_number")?;
    let description = required(&draft.description, "description")?;

    if !serial_number.parse::<i64>().is_ok_and(|s| s >= 1) {
        return Err(DefectError::InvalidSerial(serial_number));
    }
    if !DEFECT_STATUSES.contains(&draft.defect_status.as_str()) {
        return Err(DefectError::UnknownStatus {
            status: draft.defect_status.clone(),
            allowed: &DEFECT_STATUSES,
        });
    }

    Ok(DefectDraft {
        item_code,
        serial_number,
        defect_date: draft.defect_date,
        defect_status: draft.defect_status.clone(),
        description,
        linde_remarks: draft.linde_remarks.trim().to_string(),
    })
}
