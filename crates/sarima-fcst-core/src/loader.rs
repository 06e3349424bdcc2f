//! CSV loading for monthly series.
//!
//! The source dataset ends with a few free-text footer lines, so a fixed number
//! of trailing records is dropped before any field is parsed.

use crate::error::LoadError;
use crate::series::TimeSeries;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of trailing footer rows in the airline-passengers export.
pub const DEFAULT_FOOTER_ROWS: usize = 3;

/// Schema expected from the input file.
#[derive(Debug, Clone)]
pub struct CsvSchema {
    /// Name of the date column
    pub date_column: String,
    /// Name of the value column; `None` selects the first non-date column
    pub value_column: Option<String>,
    /// Trailing records dropped unconditionally
    pub footer_rows: usize,
}

impl Default for CsvSchema {
    fn default() -> Self {
        Self {
            date_column: "Month".to_string(),
            value_column: None,
            footer_rows: DEFAULT_FOOTER_ROWS,
        }
    }
}

/// Load a series from a CSV file.
pub fn load_csv<P: AsRef<Path>>(path: P, schema: &CsvSchema) -> Result<TimeSeries, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let series = load_from_reader(file, schema)?;
    tracing::info!(
        path = %path.display(),
        rows = series.len(),
        "loaded time series"
    );
    Ok(series)
}

/// Load a series from any CSV byte source.
pub fn load_from_reader<R: Read>(reader: R, schema: &CsvSchema) -> Result<TimeSeries, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let (date_idx, value_idx) = resolve_columns(&headers, schema)?;

    let mut records: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;
    let keep = records.len().saturating_sub(schema.footer_rows);
    records.truncate(keep);

    if records.is_empty() {
        return Err(LoadError::Empty {
            footer_rows: schema.footer_rows,
        });
    }

    let mut rows: Vec<(NaiveDate, f64)> = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_month(raw_date).ok_or_else(|| LoadError::InvalidDate {
            row,
            value: raw_date.to_string(),
        })?;
        let raw_value = record.get(value_idx).unwrap_or_default();
        let value = raw_value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| LoadError::InvalidValue {
                row,
                value: raw_value.to_string(),
            })?;
        rows.push((date, value));
    }

    rows.sort_by_key(|(d, _)| *d);
    if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(LoadError::DuplicateTimestamp(w[0].0));
    }

    let (dates, values): (Vec<NaiveDate>, Vec<f64>) = rows.into_iter().unzip();
    // Sorted and de-duplicated above, so construction cannot fail.
    TimeSeries::new(dates, values).map_err(|e| LoadError::Csv(e.to_string()))
}

fn resolve_columns(
    headers: &StringRecord,
    schema: &CsvSchema,
) -> Result<(usize, usize), LoadError> {
    let date_idx = headers
        .iter()
        .position(|h| h == schema.date_column.as_str())
        .ok_or_else(|| LoadError::MissingColumn(schema.date_column.clone()))?;

    let value_idx = match &schema.value_column {
        Some(name) => headers
            .iter()
            .position(|h| h == name.as_str())
            .ok_or_else(|| LoadError::MissingColumn(name.clone()))?,
        None => (0..headers.len())
            .find(|&i| i != date_idx)
            .ok_or_else(|| LoadError::MissingColumn("<value>".to_string()))?,
    };

    Ok((date_idx, value_idx))
}

/// Parse `YYYY-MM` or `YYYY-MM-DD`. Month-only values map to the first day.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\"Month\",\"Passengers\"\n\
        \"1949-01\",112\n\
        \"1949-02\",118\n\
        \"1949-03\",132\n\
        \"1949-04\",129\n\
        \"Footer line one\"\n\
        \"Footer line two\",\n\
        \"Footer line three\",,\n";

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_load_drops_footer() {
        let ts = load_from_reader(SAMPLE.as_bytes(), &CsvSchema::default()).unwrap();
        assert_eq!(ts.len(), 4);
        assert_eq!(ts.values(), &[112.0, 118.0, 132.0, 129.0]);
        assert_eq!(ts.dates()[0], ymd(1949, 1, 1));
        assert!(ts.dates().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_load_sorts_ascending() {
        let csv = "Month,Value\n1949-03,3\n1949-01,1\n1949-02,2\n";
        let schema = CsvSchema {
            footer_rows: 0,
            ..Default::default()
        };
        let ts = load_from_reader(csv.as_bytes(), &schema).unwrap();
        assert_eq!(ts.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_load_full_dates() {
        let csv = "Month,Value\n1949-01-01,1\n1949-02-01,2\nfooter\n";
        let schema = CsvSchema {
            footer_rows: 1,
            ..Default::default()
        };
        let ts = load_from_reader(csv.as_bytes(), &schema).unwrap();
        assert_eq!(ts.dates(), &[ymd(1949, 1, 1), ymd(1949, 2, 1)]);
    }

    #[test]
    fn test_missing_date_column() {
        let csv = "Date,Value\n1949-01,1\n";
        let err = load_from_reader(csv.as_bytes(), &CsvSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "Month"));
    }

    #[test]
    fn test_missing_named_value_column() {
        let csv = "Month,Value\n1949-01,1\n";
        let schema = CsvSchema {
            value_column: Some("Passengers".into()),
            footer_rows: 0,
            ..Default::default()
        };
        let err = load_from_reader(csv.as_bytes(), &schema).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "Passengers"));
    }

    #[test]
    fn test_invalid_date() {
        let csv = "Month,Value\n1949-01,1\nJan 49,2\n";
        let schema = CsvSchema {
            footer_rows: 0,
            ..Default::default()
        };
        let err = load_from_reader(csv.as_bytes(), &schema).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDate { row: 2, .. }));
    }

    #[test]
    fn test_invalid_value() {
        let csv = "Month,Value\n1949-01,abc\n";
        let schema = CsvSchema {
            footer_rows: 0,
            ..Default::default()
        };
        let err = load_from_reader(csv.as_bytes(), &schema).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { row: 1, .. }));
    }

    #[test]
    fn test_duplicate_timestamp() {
        let csv = "Month,Value\n1949-01,1\n1949-01-01,2\n";
        let schema = CsvSchema {
            footer_rows: 0,
            ..Default::default()
        };
        let err = load_from_reader(csv.as_bytes(), &schema).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateTimestamp(d) if d == ymd(1949, 1, 1)));
    }

    #[test]
    fn test_only_footer_is_empty() {
        let csv = "Month,Value\na\nb\nc\n";
        let err = load_from_reader(csv.as_bytes(), &CsvSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::Empty { footer_rows: 3 }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_csv("/nonexistent/passengers.csv", &CsvSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("1960-12"), Some(ymd(1960, 12, 1)));
        assert_eq!(parse_month("1960-12-01"), Some(ymd(1960, 12, 1)));
        assert_eq!(parse_month("1960-13"), None);
        assert_eq!(parse_month(""), None);
    }
}
