use crate::models::{MatchResult, MatchedShipment, Partition};

/// 按匹配结果分为可更新 / 不可更新两组, 不丢弃任何记录
pub fn partition(matches: Vec<MatchResult>) -> Partition {
    let mut result = Partition::default();
    for m in matches {
        match m.line_item {
            Some(item) => result.updatable.push(MatchedShipment {
                record: m.record,
                line_item: item.summary(),
            }),
            None => result.rejected.push(m.record),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShipmentRecord;
    use crate::store::memory::line_item;
    use chrono::NaiveDate;

    fn matched(row: usize, order: &str, seq: i32, exists: bool) -> MatchResult {
        MatchResult {
            record: ShipmentRecord {
                row_number: row,
                order_number: order.to_string(),
                serial_number: row as i64 * 10,
                ship_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                line_sequence: seq,
            },
            line_item: exists.then(|| line_item(order, seq, "E-1")),
        }
    }

    #[test]
    fn every_record_lands_in_exactly_one_set() {
        let input: Vec<MatchResult> = (1..=9)
            .map(|row| matched(row, "G1", row as i32, row % 3 != 0))
            .collect();
        let records: Vec<ShipmentRecord> = input.iter().map(|m| m.record.clone()).collect();

        let split = partition(input);
        assert_eq!(split.updatable.len() + split.rejected.len(), records.len());
        assert_eq!(split.len(), 9);
        assert_eq!(split.rejected.len(), 3);

        // 合并两组并按行号恢复顺序后应与输入一致
        let mut merged: Vec<ShipmentRecord> = split
            .updatable
            .iter()
            .map(|m| m.record.clone())
            .chain(split.rejected.iter().cloned())
            .collect();
        merged.sort_by_key(|r| r.row_number);
        assert_eq!(merged, records);
    }

    #[test]
    fn relative_order_is_preserved() {
        let split = partition(vec![
            matched(1, "G1", 1, false),
            matched(2, "G1", 2, true),
            matched(3, "G2", 1, false),
            matched(4, "G2", 2, true),
        ]);
        let updatable: Vec<usize> = split.updatable.iter().map(|m| m.record.row_number).collect();
        let rejected: Vec<usize> = split.rejected.iter().map(|r| r.row_number).collect();
        assert_eq!(updatable, vec![2, 4]);
        assert_eq!(rejected, vec![1, 3]);
    }

    #[test]
    fn empty_input_gives_empty_sets() {
        assert!(partition(Vec::new()).is_empty());
    }
}
