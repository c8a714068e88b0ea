use std::time::Duration;
use thiserror::Error;

use crate::models::LineKey;

/// 上传文件格式错误, 在任何查询之前终止
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload is empty")]
    Empty,

    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("row {row}: column `{column}` is empty")]
    EmptyValue { row: usize, column: &'static str },

    #[error("row {row}: invalid serial number `{value}`")]
    InvalidSerial { row: usize, value: String },

    #[error("row {row}: invalid ship date `{value}`")]
    InvalidDate { row: usize, value: String },

    #[error("rows {first} and {second}: serial {serial} appears twice for order {order_number}")]
    DuplicateSerial {
        order_number: String,
        serial: i64,
        first: usize,
        second: usize,
    },

    #[error("order {order_number} has more rows than a line sequence can hold")]
    TooManyRows { order_number: String },

    #[error("malformed TSV: {0}")]
    Csv(#[from] csv::Error),
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("update of {key} failed: {message}")]
    Statement { key: LineKey, message: String },

    #[error("update of {key} matched no row")]
    RowMissing { key: LineKey },

    #[error("apply timed out after {0:?}")]
    Timeout(Duration),

    #[error("commit did not complete, outcome unknown: {0}")]
    CommitUnknown(#[source] sqlx::Error),
}

impl StoreError {
    /// 导致失败的键 (如已知)
    pub fn failed_key(&self) -> Option<&LineKey> {
        match self {
            StoreError::Statement { key, .. } | StoreError::RowMissing { key } => Some(key),
            _ => None,
        }
    }
}

/// 权限检查失败
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("unknown user {0}")]
    UnknownUser(String),

    #[error("e-mail address of {0} is not confirmed")]
    EmailNotConfirmed(String),

    #[error("role `{0}` may not update shipment status")]
    RoleNotAllowed(String),

    #[error("{0} has no write permission")]
    WriteDenied(String),

    #[error("{0} has no read permission")]
    ReadDenied(String),
}

/// 一次出荷状况更新流程的错误
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("lookup failed: {0}")]
    Lookup(#[source] StoreError),

    #[error("update failed, nothing changed: {0}")]
    Apply(#[source] StoreError),

    #[error("update may or may not have been saved, check the data before retrying: {0}")]
    Unconfirmed(#[source] StoreError),
}

/// 最新出荷数据查询的错误
#[derive(Debug, Error)]
pub enum ShipmentQueryError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("limit {limit} is not one of {allowed:?}")]
    InvalidLimit { limit: i64, allowed: Vec<i64> },

    #[error("date {0} is not among the recent shipment dates")]
    UnknownDate(chrono::NaiveDate),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 电极状况一览查询的错误
#[derive(Debug, Error)]
pub enum StatusQueryError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("item code `{0}` is not in the item list")]
    UnknownItem(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 不具合电极登记的错误
#[derive(Debug, Error)]
pub enum DefectError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("`{0}` is required")]
    MissingField(&'static str),

    #[error("serial `{0}` is not a positive integer")]
    InvalidSerial(String),

    #[error("defect status `{status}` is not one of {allowed:?}")]
    UnknownStatus {
        status: String,
        allowed: &'static [&'static str],
    },

    #[error("defect report {0} does not exist")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}
