//! CSV request and response shapes.
//!
//! Insert payloads come in two layouts. Series rows, one point per line:
//!
//! ```text
//! cpu,1500000000,0.5
//! cpu,1500000060,0.7
//! ```
//!
//! or a table whose header row starts with an empty cell and names the series:
//!
//! ```text
//! ,cpu,mem
//! 1500000000,0.5,1024
//! ```
//!
//! Query payloads are a single record with a single field holding the query.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("no data found in csv")]
    Empty,
    #[error("expecting a single csv field containing the query")]
    NotAQuery,
    #[error("line {line}: {reason}")]
    Line { line: usize, reason: String },
    #[error("csv writer: {0}")]
    Io(String),
}

fn read_records(content: &[u8]) -> Result<Vec<StringRecord>, CsvError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    Ok(records)
}

/// Parses an insert payload into `{series: [[ts, value], ...]}`.
pub fn loads_insert(content: &[u8]) -> Result<Value, CsvError> {
    let records = read_records(content)?;
    let first = records.first().ok_or(CsvError::Empty)?;
    if first.get(0).map_or(true, str::is_empty) {
        load_table(&records)
    } else {
        load_series_rows(&records)
    }
}

/// Parses a query payload into the query string.
pub fn loads_query(content: &[u8]) -> Result<Value, CsvError> {
    let records = read_records(content)?;
    match records.as_slice() {
        [record] if record.len() == 1 => Ok(Value::String(record[0].to_string())),
        _ => Err(CsvError::NotAQuery),
    }
}

fn load_series_rows(records: &[StringRecord]) -> Result<Value, CsvError> {
    let mut series: Map<String, Value> = Map::new();
    for (idx, record) in records.iter().enumerate() {
        let line = idx + 1;
        if record.len() != 3 {
            return Err(CsvError::Line {
                line,
                reason: format!(
                    "expecting 3 fields (series,timestamp,value), got {}",
                    record.len()
                ),
            });
        }
        let ts = parse_timestamp(&record[1], line)?;
        let point = Value::Array(vec![ts, parse_value(&record[2])]);
        if let Value::Array(points) = series
            .entry(record[0].to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            points.push(point);
        }
    }
    Ok(Value::Object(series))
}

fn load_table(records: &[StringRecord]) -> Result<Value, CsvError> {
    let header = &records[0];
    let names: Vec<&str> = header.iter().skip(1).collect();
    if names.is_empty() || names.iter().any(|n| n.is_empty()) {
        return Err(CsvError::Line {
            line: 1,
            reason: "table header must name every series".to_string(),
        });
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    for (idx, record) in records.iter().enumerate().skip(1) {
        let line = idx + 1;
        if record.len() > names.len() + 1 {
            return Err(CsvError::Line {
                line,
                reason: format!(
                    "expecting at most {} fields, got {}",
                    names.len() + 1,
                    record.len()
                ),
            });
        }
        let ts = parse_timestamp(&record[0], line)?;
        for (col, cell) in record.iter().skip(1).enumerate() {
            if cell.is_empty() {
                continue;
            }
            columns[col].push(Value::Array(vec![ts.clone(), parse_value(cell)]));
        }
    }

    let mut series = Map::new();
    for (name, points) in names.into_iter().zip(columns) {
        if !points.is_empty() {
            series.insert(name.to_string(), Value::Array(points));
        }
    }
    Ok(Value::Object(series))
}

fn parse_timestamp(cell: &str, line: usize) -> Result<Value, CsvError> {
    cell.trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|_| CsvError::Line {
            line,
            reason: format!("invalid timestamp {cell:?}"),
        })
}

fn parse_value(cell: &str) -> Value {
    let trimmed = cell.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(cell.to_string())
}

/// Serializes a result value (or an error body) as CSV text.
pub fn dumps(value: &Value) -> Result<Vec<u8>, CsvError> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    for row in rows(value) {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| CsvError::Io(e.error().to_string()))
}

fn rows(value: &Value) -> Vec<Vec<String>> {
    match value {
        Value::Object(map) if is_table(map) => table_rows(map),
        Value::Object(map) if is_series_map(map) => {
            let mut out = Vec::new();
            for (name, points) in map {
                for point in points.as_array().into_iter().flatten() {
                    let mut row = vec![name.clone()];
                    row.extend(point.as_array().into_iter().flatten().map(cell));
                    out.push(row);
                }
            }
            out
        }
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| vec![key.clone(), cell(item)])
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(inner) => inner.iter().map(cell).collect(),
                other => vec![cell(other)],
            })
            .collect(),
        scalar => vec![vec![cell(scalar)]],
    }
}

/// `{"columns": [...], "<name>": [[...], ...]}` as produced by `list` queries.
fn is_table(map: &Map<String, Value>) -> bool {
    map.len() == 2
        && map.get("columns").map_or(false, Value::is_array)
        && map
            .iter()
            .any(|(k, v)| {
                k != "columns"
                    && v.as_array().map_or(false, |rows| rows.iter().all(Value::is_array))
            })
}

fn table_rows(map: &Map<String, Value>) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    if let Some(columns) = map.get("columns").and_then(Value::as_array) {
        out.push(columns.iter().map(cell).collect());
    }
    for (key, rows) in map {
        if key == "columns" {
            continue;
        }
        for row in rows.as_array().into_iter().flatten() {
            out.push(row.as_array().into_iter().flatten().map(cell).collect());
        }
    }
    out
}

fn is_series_map(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.values().all(|points| {
            points.as_array().map_or(false, |points| {
                points
                    .iter()
                    .all(|p| p.as_array().map_or(false, |p| p.len() == 2))
            })
        })
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
