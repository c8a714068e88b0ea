//! 出荷序列号数据 (TSV) 的读取与枝番编号

pub mod sequence;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::error::UploadError;
use crate::models::{ShipmentRecord, ShipmentRow};

pub use sequence::assign_line_sequences;

pub const ORDER_COLUMN: &str = "giga_order_num";
pub const SERIAL_COLUMN: &str = "sirial_num";
pub const SHIP_DATE_COLUMN: &str = "shiped_date";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 读取上传文件并编号
pub fn parse_shipments(data: &[u8]) -> Result<Vec<ShipmentRecord>, UploadError> {
    let rows = read_rows(data)?;
    assign_line_sequences(rows)
}

/// 读取上传文件的数据行, 多余的列忽略
pub fn read_rows(data: &[u8]) -> Result<Vec<ShipmentRow>, UploadError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(UploadError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let order_idx = column_index(&headers, ORDER_COLUMN)?;
    let serial_idx = column_index(&headers, SERIAL_COLUMN)?;
    let date_idx = column_index(&headers, SHIP_DATE_COLUMN)?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = idx + 1;

        let order_number = record.get(order_idx).unwrap_or("").trim();
        if order_number.is_empty() {
            return Err(UploadError::EmptyValue {
                row,
                column: ORDER_COLUMN,
            });
        }

        rows.push(ShipmentRow {
            row_number: row,
            order_number: order_number.to_string(),
            serial_number: parse_serial(row, record.get(serial_idx).unwrap_or(""))?,
            ship_date: parse_ship_date(row, record.get(date_idx).unwrap_or(""))?,
        });
    }

    tracing::debug!("读取出荷数据 {} 行", rows.len());
    Ok(rows)
}

fn column_index(headers: &StringRecord, name: &'static str) -> Result<usize, UploadError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or(UploadError::MissingColumn(name))
}

fn parse_serial(row: usize, raw: &str) -> Result<i64, UploadError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(UploadError::EmptyValue {
            row,
            column: SERIAL_COLUMN,
        });
    }

    // 表格软件导出时整数可能带 ".0"
    let digits = value.strip_suffix(".0").unwrap_or(value);
    digits.parse::<i64>().map_err(|_| UploadError::InvalidSerial {
        row,
        value: value.to_string(),
    })
}

fn parse_ship_date(row: usize, raw: &str) -> Result<NaiveDate, UploadError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(UploadError::EmptyValue {
            row,
            column: SHIP_DATE_COLUMN,
        });
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.date());
        }
    }

    Err(UploadError::InvalidDate {
        row,
        value: value.to_string(),
    })
}
