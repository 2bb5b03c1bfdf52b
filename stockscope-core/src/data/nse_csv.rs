//! Exchange historical-equity CSV parsing.
//!
//! The exchange pads header names with whitespace, prefixes the file with a
//! UTF-8 BOM and formats numbers with thousands separators
//! (`"1,234.50"`). Dates look like `01-Jan-2024`.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use super::provider::DataError;
use crate::domain::DailyBar;

pub const DATE_FORMAT: &str = "%d-%b-%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Date,
    Open,
    High,
    Low,
    PrevClose,
    Ltp,
    Close,
    Vwap,
    Week52High,
    Week52Low,
    Volume,
    Value,
    NumTrades,
}

const REQUIRED: [Field; 7] = [
    Field::Date,
    Field::Open,
    Field::High,
    Field::Low,
    Field::PrevClose,
    Field::Close,
    Field::Volume,
];

fn classify(header: &str) -> Option<Field> {
    let normalized = header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_ascii_lowercase();
    let field = match normalized.as_str() {
        "date" => Field::Date,
        "open" => Field::Open,
        "high" => Field::High,
        "low" => Field::Low,
        "prev. close" | "prev close" | "prevclose" => Field::PrevClose,
        "ltp" => Field::Ltp,
        "close" => Field::Close,
        "vwap" => Field::Vwap,
        "52w h" => Field::Week52High,
        "52w l" => Field::Week52Low,
        "volume" => Field::Volume,
        "value" | "turnover" => Field::Value,
        "no of trades" | "no. of trades" | "num trades" => Field::NumTrades,
        _ => return None,
    };
    Some(field)
}

/// Parse a numeric cell, tolerating thousands separators. `-` and blanks are NaN.
pub fn parse_number(raw: &str) -> Result<f64, String> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() || cleaned == "-" {
        return Ok(f64::NAN);
    }
    cleaned
        .parse::<f64>()
        .map_err(|e| format!("invalid number '{raw}': {e}"))
}

fn parse_count(raw: &str) -> Result<u64, String> {
    let v = parse_number(raw)?;
    if v.is_nan() {
        return Ok(0);
    }
    if v < 0.0 {
        return Err(format!("negative count '{raw}'"));
    }
    Ok(v.round() as u64)
}

/// One CSV record viewed through the header mapping.
struct RowCells<'a> {
    record: &'a csv::StringRecord,
    columns: &'a HashMap<Field, usize>,
    line: usize,
}

impl<'a> RowCells<'a> {
    fn cell(&self, field: Field) -> &'a str {
        self.columns
            .get(&field)
            .and_then(|&idx| self.record.get(idx))
            .unwrap_or("")
    }

    fn number(&self, field: Field) -> Result<f64, String> {
        parse_number(self.cell(field)).map_err(|e| format!("row {}: {e}", self.line))
    }

    fn count(&self, field: Field) -> Result<u64, String> {
        parse_count(self.cell(field)).map_err(|e| format!("row {}: {e}", self.line))
    }
}

/// Parse one exchange CSV into bars (file order, unadjusted, no PE).
pub fn parse_exchange_csv<R: Read>(reader: R, source_name: &str) -> Result<Vec<DailyBar>, DataError> {
    let csv_err = |message: String| DataError::Csv {
        source_name: source_name.to_string(),
        message,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| csv_err(e.to_string()))?.clone();
    let mut columns: HashMap<Field, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(field) = classify(header) {
            columns.entry(field).or_insert(idx);
        }
    }
    for field in REQUIRED {
        if !columns.contains_key(&field) {
            return Err(csv_err(format!("missing column {field:?}")));
        }
    }

    let mut bars = Vec::new();
    for (row_idx, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| csv_err(e.to_string()))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let row = RowCells {
            record: &record,
            columns: &columns,
            line: row_idx + 2,
        };

        let date_raw = row.cell(Field::Date);
        let date = NaiveDate::parse_from_str(date_raw, DATE_FORMAT).map_err(|e| {
            csv_err(format!("row {}: invalid date '{date_raw}': {e}", row.line))
        })?;

        bars.push(DailyBar {
            date,
            open: row.number(Field::Open).map_err(csv_err)?,
            high: row.number(Field::High).map_err(csv_err)?,
            low: row.number(Field::Low).map_err(csv_err)?,
            close: row.number(Field::Close).map_err(csv_err)?,
            prev_close: row.number(Field::PrevClose).map_err(csv_err)?,
            ltp: row.number(Field::Ltp).map_err(csv_err)?,
            vwap: row.number(Field::Vwap).map_err(csv_err)?,
            week52_high: row.number(Field::Week52High).map_err(csv_err)?,
            week52_low: row.number(Field::Week52Low).map_err(csv_err)?,
            volume: row.count(Field::Volume).map_err(csv_err)?,
            turnover_value: row.number(Field::Value).map_err(csv_err)?,
            num_trades: row.count(Field::NumTrades).map_err(csv_err)?,
            pe: None,
            adjustment: 1.0,
        });
    }

    Ok(bars)
}

/// Read and parse an exchange CSV file.
pub fn read_exchange_csv(path: &Path) -> Result<Vec<DailyBar>, DataError> {
    let file = fs::File::open(path)?;
    parse_exchange_csv(file, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}Date ,series ,OPEN ,HIGH ,LOW ,PREV. CLOSE ,ltp ,close ,vwap ,52W H ,52W L ,VOLUME ,VALUE ,No of trades \n\
03-Jan-2024,EQ,\"1,610.00\",\"1,625.50\",\"1,600.10\",\"1,605.35\",\"1,620.00\",\"1,621.40\",\"1,615.22\",\"1,700.00\",\"1,200.00\",\"5,43,210\",\"877,654,321.50\",\"45,678\"\n\
02-Jan-2024,EQ,\"1,600.00\",\"1,610.00\",\"1,590.00\",\"1,598.00\",\"1,605.00\",\"1,605.35\",\"1,602.00\",\"1,700.00\",\"1,200.00\",\"4,00,000\",\"640,800,000.00\",\"40,000\"\n";

    #[test]
    fn parses_padded_headers_and_thousands_separators() {
        let bars = parse_exchange_csv(SAMPLE.as_bytes(), "sample").unwrap();
        assert_eq!(bars.len(), 2);

        let first = &bars[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(first.open, 1610.0);
        assert_eq!(first.close, 1621.4);
        assert_eq!(first.prev_close, 1605.35);
        assert_eq!(first.volume, 543_210);
        assert_eq!(first.num_trades, 45_678);
        assert_eq!(first.turnover_value, 877_654_321.5);
        assert_eq!(first.adjustment, 1.0);
        assert!(first.pe.is_none());
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv = "Date,OPEN,HIGH,LOW,close,VOLUME\n02-Jan-2024,1,2,1,2,10\n";
        let err = parse_exchange_csv(csv.as_bytes(), "bad").unwrap_err();
        assert!(err.to_string().contains("PrevClose"));
    }

    #[test]
    fn invalid_date_reports_row() {
        let csv = "Date,OPEN,HIGH,LOW,PREV. CLOSE,close,VOLUME\n2024-01-02,1,2,1,1,2,10\n";
        let err = parse_exchange_csv(csv.as_bytes(), "bad").unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn dash_is_missing_value() {
        assert!(parse_number("-").unwrap().is_nan());
        assert!(parse_number("").unwrap().is_nan());
        assert_eq!(parse_number(" 1,00,000.5 ").unwrap(), 100_000.5);
    }
}
