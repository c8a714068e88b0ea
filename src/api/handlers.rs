use crate::error::{DefectError, PermissionError, ReconcileError, ShipmentQueryError, StatusQueryError};
use crate::models::{
    DefectDraft, DefectReport, ElectrodeStatus, MatchedShipment, Principal, ShipmentRecord,
    ShipmentSummary,
};
use crate::service::{
    DefectQuery, DefectService, ReconcileService, ShipmentQuery, ShipmentService, StatusFilter,
    StatusService,
};
use crate::store::PrincipalDirectory;
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// 调用者邮箱 (由前置的认证层设置)
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub reconcile: Arc<ReconcileService>,
    pub shipments: Arc<ShipmentService>,
    pub status: Arc<StatusService>,
    pub defects: Arc<DefectService>,
    pub directory: Arc<dyn PrincipalDirectory>,
}

/// 失败响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

/// 更新预览 / 确认响应体
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub success: bool,
    pub message: String,
    pub updatable: Vec<MatchedShipment>,
    pub rejected: Vec<ShipmentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<usize>,
}

/// 最新出荷数据响应体
#[derive(Debug, Serialize)]
pub struct ShipmentListResponse {
    pub success: bool,
    pub message: String,
    pub dates: Vec<NaiveDate>,
    pub shipments: Vec<ShipmentSummary>,
}

/// 品目一览响应体
#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub success: bool,
    pub message: String,
    pub items: Vec<String>,
}

/// 电极状况一览响应体
#[derive(Debug, Serialize)]
pub struct StatusListResponse {
    pub success: bool,
    pub message: String,
    pub item_code: String,
    pub rows: Vec<ElectrodeStatus>,
}

/// 不具合电极列表响应体
#[derive(Debug, Serialize)]
pub struct DefectListResponse {
    pub success: bool,
    pub message: String,
    pub defects: Vec<DefectReport>,
}

/// 不具合电极登记 / 修改 / 删除响应体
#[derive(Debug, Serialize)]
pub struct DefectWriteResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
}

fn failure(status: StatusCode, message: String) -> Response {
    let response = ErrorResponse {
        success: false,
        message,
    };
    (status, Json(response)).into_response()
}

fn permission_status(e: &PermissionError) -> StatusCode {
    match e {
        PermissionError::UnknownUser(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::FORBIDDEN,
    }
}

fn reconcile_failure(e: ReconcileError) -> Response {
    let status = match &e {
        ReconcileError::Permission(p) => permission_status(p),
        ReconcileError::Upload(_) => StatusCode::BAD_REQUEST,
        ReconcileError::Lookup(_) | ReconcileError::Apply(_) | ReconcileError::Unconfirmed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    failure(status, format!("Error: {}", e))
}

fn shipment_failure(e: ShipmentQueryError) -> Response {
    let status = match &e {
        ShipmentQueryError::Permission(p) => permission_status(p),
        ShipmentQueryError::InvalidLimit { .. } | ShipmentQueryError::UnknownDate(_) => {
            StatusCode::BAD_REQUEST
        }
        ShipmentQueryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    failure(status, format!("Error: {}", e))
}

fn status_failure(e: StatusQueryError) -> Response {
    let status = match &e {
        StatusQueryError::Permission(p) => permission_status(p),
        StatusQueryError::UnknownItem(_) => StatusCode::NOT_FOUND,
        StatusQueryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    failure(status, format!("Error: {}", e))
}

fn defect_failure(e: DefectError) -> Response {
    let status = match &e {
        DefectError::Permission(p) => permission_status(p),
        DefectError::MissingField(_)
        | DefectError::InvalidSerial(_)
        | DefectError::UnknownStatus { .. } => StatusCode::BAD_REQUEST,
        DefectError::NotFound(_) => StatusCode::NOT_FOUND,
        DefectError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    failure(status, format!("Error: {}", e))
}

/// 提取器拒绝 (超过大小上限、参数格式错误等) 同样返回 JSON 失败响应
fn rejected(status: StatusCode, text: String) -> Response {
    tracing::warn!("请求被拒绝 ({}): {}", status, text);
    failure(status, format!("Error: {}", text))
}

/// 读取上传内容
fn upload_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, Response> {
    body.map_err(|e| rejected(e.status(), e.body_text()))
}

/// 从请求头解析调用者并查询其角色
async fn resolve_principal(
    directory: &dyn PrincipalDirectory,
    headers: &HeaderMap,
) -> Result<Principal, Response> {
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Error: not signed in".to_string()))?;

    match directory.find_principal(email).await {
        Ok(Some(principal)) => Ok(principal),
        Ok(None) => {
            let e = PermissionError::UnknownUser(email.to_string());
            Err(failure(permission_status(&e), format!("Error: {}", e)))
        }
        Err(e) => {
            tracing::error!("查询用户 {} 失败: {}", email, e);
            Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: {}", e),
            ))
        }
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 上传出荷序列号数据, 返回可更新 / 不可更新的数据 (不写入)
pub async fn preview_reconcile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    let body = match upload_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    match state.reconcile.preview(&principal, &body).await {
        Ok(partition) => {
            let response = ReconcileResponse {
                success: true,
                message: format!(
                    "{} rows can be updated, {} rows have no matching order line",
                    partition.updatable.len(),
                    partition.rejected.len()
                ),
                updatable: partition.updatable,
                rejected: partition.rejected,
                applied: None,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => reconcile_failure(e),
    }
}

/// 确认更新: 重新匹配并原子地更新全部可更新数据
pub async fn apply_reconcile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    let body = match upload_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    match state.reconcile.confirm(&principal, &body).await {
        Ok(outcome) => {
            let response = ReconcileResponse {
                success: true,
                message: format!("Successfully updated {} rows", outcome.report.statements),
                updatable: outcome.partition.updatable,
                rejected: outcome.partition.rejected,
                applied: Some(outcome.report.statements),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => reconcile_failure(e),
    }
}

/// 最新出荷数据检索
pub async fn recent_shipments(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ShipmentQuery>, QueryRejection>,
) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Query(query) = match query {
        Ok(query) => query,
        Err(e) => return rejected(e.status(), e.body_text()),
    };

    match state.shipments.list(&principal, &query).await {
        Ok(listing) => {
            let message = if listing.shipments.is_empty() {
                "No shipments match the given conditions".to_string()
            } else {
                format!("{} shipments", listing.shipments.len())
            };
            let response = ShipmentListResponse {
                success: true,
                message,
                dates: listing.dates,
                shipments: listing.shipments,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => shipment_failure(e),
    }
}

/// 品目一览
pub async fn item_list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };

    match state.status.item_codes(&principal).await {
        Ok(items) => {
            let response = ItemListResponse {
                success: true,
                message: format!("{} items", items.len()),
                items,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => status_failure(e),
    }
}

/// 指定品目的溶射电极状况一览
pub async fn electrode_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    item_code: Result<Path<String>, PathRejection>,
    filter: Result<Query<StatusFilter>, QueryRejection>,
) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Path(item_code) = match item_code {
        Ok(path) => path,
        Err(e) => return rejected(e.status(), e.body_text()),
    };
    let Query(filter) = match filter {
        Ok(query) => query,
        Err(e) => return rejected(e.status(), e.body_text()),
    };

    match state.status.list(&principal, &item_code, &filter).await {
        Ok(rows) => {
            let response = StatusListResponse {
                success: true,
                message: format!("{} electrodes", rows.len()),
                item_code,
                rows,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => status_failure(e),
    }
}

/// 不具合电极列表 (默认最新的若干件)
pub async fn defect_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<DefectQuery>, QueryRejection>,
) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Query(query) = match query {
        Ok(query) => query,
        Err(e) => return rejected(e.status(), e.body_text()),
    };

    match state.defects.list(&principal, &query).await {
        Ok(defects) => {
            let message = if defects.is_empty() {
                "No defect reports registered".to_string()
            } else {
                format!("{} defect reports", defects.len())
            };
            let response = DefectListResponse {
                success: true,
                message,
                defects,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => defect_failure(e),
    }
}

/// 登记不具合电极
pub async fn register_defect(
    State(state): State<AppState>,
    headers: HeaderMap,
    draft: Result<Json<DefectDraft>, JsonRejection>,
) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Json(draft) = match draft {
        Ok(draft) => draft,
        Err(e) => return rejected(e.status(), e.body_text()),
    };

    match state.defects.register(&principal, &draft).await {
        Ok(id) => {
            let response = DefectWriteResponse {
                success: true,
                message: "Defect report registered".to_string(),
                id,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => defect_failure(e),
    }
}

/// 修改不具合电极
pub async fn revise_defect(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    draft: Result<Json<DefectDraft>, JsonRejection>,
) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Path(id) = match id {
        Ok(path) => path,
        Err(e) => return rejected(e.status(), e.body_text()),
    };
    let Json(draft) = match draft {
        Ok(draft) => draft,
        Err(e) => return rejected(e.status(), e.body_text()),
    };

    match state.defects.revise(&principal, id, &draft).await {
        Ok(()) => {
            let response = DefectWriteResponse {
                success: true,
                message: format!("Defect report {} updated", id),
                id,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => defect_failure(e),
    }
}

/// 删除不具合电极
pub async fn remove_defect(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let principal = match resolve_principal(state.directory.as_ref(), &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Path(id) = match id {
        Ok(path) => path,
        Err(e) => return rejected(e.status(), e.body_text()),
    };

    match state.defects.remove(&principal, id).await {
        Ok(()) => {
            let response = DefectWriteResponse {
                success: true,
                message: format!("Defect report {} deleted", id),
                id,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => defect_failure(e),
    }
}
