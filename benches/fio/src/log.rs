use common::{config::Direction, error::RowError};
use csv::StringRecord;

/// Columns every row must carry: time, value, direction.
pub const REQUIRED_COLUMNS: usize = 3;

/// One line of a `write_{bw,iops,lat}_log` file:
/// `time (ms), value, direction, block size, offset[, priority]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRow {
    pub time_ms: u64,
    /// Raw FIO unit: KiB/s for bw, ns for latencies
    pub value: f64,
    pub direction: Direction,
    pub block_size: Option<u64>,
    pub offset: Option<u64>,
}

impl LogRow {
    pub fn parse(record: &StringRecord) -> Result<Self, RowError> {
        if record.len() < REQUIRED_COLUMNS {
            return Err(RowError::ColumnCount {
                expected: REQUIRED_COLUMNS,
                found: record.len(),
            });
        }
        let time_ms = record[0]
            .trim()
            .parse::<u64>()
            .map_err(|_| not_numeric("time", &record[0]))?;
        let value = record[1]
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| not_numeric("value", &record[1]))?;
        let direction = record[2]
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Direction::from_log_code)
            .ok_or_else(|| RowError::UnknownDirection(record[2].trim().to_owned()))?;
        let optional = |idx: usize| record.get(idx).and_then(|x| x.trim().parse::<u64>().ok());
        Ok(LogRow {
            time_ms,
            value,
            direction,
            block_size: optional(3),
            offset: optional(4),
        })
    }
}

fn not_numeric(column: &'static str, value: &str) -> RowError {
    RowError::NotNumeric {
        column,
        value: value.trim().to_owned(),
    }
}

/// Reader configured for FIO logs: no header, ragged rows, padded fields.
pub fn reader<R: std::io::Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Result<LogRow, RowError> {
        LogRow::parse(&StringRecord::from(fields.to_vec()))
    }

    #[test]
    fn parses_full_rows() {
        assert_eq!(
            row(&["1000", "2048", "1", "4096", "0", "0"]).unwrap(),
            LogRow {
                time_ms: 1000,
                value: 2048.0,
                direction: Direction::Write,
                block_size: Some(4096),
                offset: Some(0),
            }
        );
        assert_eq!(row(&["5", "7", "0"]).unwrap().block_size, None);
    }

    #[test]
    fn rejects_malformed_rows() {
        assert_eq!(
            row(&["1000", "2048"]),
            Err(RowError::ColumnCount {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            row(&["abc", "1", "0"]),
            Err(RowError::NotNumeric {
                column: "time",
                value: "abc".to_owned()
            })
        );
        assert_eq!(
            row(&["1", "NaN", "0"]),
            Err(RowError::NotNumeric {
                column: "value",
                value: "NaN".to_owned()
            })
        );
        assert_eq!(
            row(&["1", "2", "7"]),
            Err(RowError::UnknownDirection("7".to_owned()))
        );
    }

    #[test]
    fn reader_handles_padding_and_ragged_rows() {
        let data = "0, 10, 0, 4096, 0\n1, 20, 0\n";
        let mut rdr = reader(data.as_bytes());
        let rows = rdr
            .records()
            .map(|r| LogRow::parse(&r.unwrap()).unwrap().value)
            .collect::<Vec<_>>();
        assert_eq!(rows, vec![10.0, 20.0]);
    }
}
