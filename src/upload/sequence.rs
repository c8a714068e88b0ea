use indexmap::IndexMap;

use crate::error::UploadError;
use crate::models::{ShipmentRecord, ShipmentRow};

/// 按 ギガ注番 分组, 组内按序列号升序编号 (从1开始), 输出保持输入顺序
///
/// 同一注番内序列号重复时无法确定枝番, 视为格式错误。
pub fn assign_line_sequences(rows: Vec<ShipmentRow>) -> Result<Vec<ShipmentRecord>, UploadError> {
    let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (idx, row) in rows.iter().enumerate() {
        groups.entry(row.order_number.as_str()).or_default().push(idx);
    }

    let mut sequences = vec![0i32; rows.len()];
    for (order_number, mut members) in groups {
        members.sort_by_key(|&idx| rows[idx].serial_number);

        if let Some(pair) = members
            .windows(2)
            .find(|pair| rows[pair[0]].serial_number == rows[pair[1]].serial_number)
        {
            let (a, b) = (rows[pair[0]].row_number, rows[pair[1]].row_number);
            return Err(UploadError::DuplicateSerial {
                order_number: order_number.to_string(),
                serial: rows[pair[0]].serial_number,
                first: a.min(b),
                second: a.max(b),
            });
        }

        for (rank, &idx) in members.iter().enumerate() {
            sequences[idx] = i32::try_from(rank + 1).map_err(|_| UploadError::TooManyRows {
                order_number: order_number.to_string(),
            })?;
        }
    }

    Ok(rows
        .into_iter()
        .zip(sequences)
        .map(|(row, line_sequence)| ShipmentRecord {
            row_number: row.row_number,
            order_number: row.order_number,
            serial_number: row.serial_number,
            ship_date: row.ship_date,
            line_sequence,
        })
        .collect())
}
