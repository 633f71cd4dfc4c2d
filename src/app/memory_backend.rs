//! In-process time-series store used when no external database is wired in.
//!
//! Understands a handful of queries:
//! `list series`, `count series`, `show time_precision, version` and
//! `select * from "<series>"` (single or double quotes).

use crate::app::backend::Backend;
use crate::domain::BackendError;
use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;
use tokio::sync::{RwLock, Semaphore, SemaphorePermit};

const TIME_PRECISION: &str = "s";

type Points = Vec<(i64, JsonValue)>;

pub struct MemoryBackend {
    dbname: String,
    series: RwLock<BTreeMap<String, Points>>,
    /// Simulated connection pool; `None` means unlimited.
    slots: Option<Semaphore>,
}

impl MemoryBackend {
    pub fn new(dbname: impl Into<String>) -> Self {
        Self {
            dbname: dbname.into(),
            series: RwLock::new(BTreeMap::new()),
            slots: None,
        }
    }

    /// Limits concurrent operations; callers beyond the limit get a pool error.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.slots = Some(Semaphore::new(max));
        self
    }

    fn acquire(&self) -> Result<Option<SemaphorePermit<'_>>, BackendError> {
        match &self.slots {
            None => Ok(None),
            Some(slots) => slots
                .try_acquire()
                .map(Some)
                .map_err(|_| {
                    BackendError::Pool("No available connections in the pool".to_string())
                }),
        }
    }

    async fn select(&self, name: &str) -> Result<JsonValue, BackendError> {
        let series = self.series.read().await;
        let points = series
            .get(name)
            .ok_or_else(|| BackendError::Query(format!("Cannot find series: '{}'", name)))?;
        let points: Vec<JsonValue> = points
            .iter()
            .map(|(ts, value)| json!([ts, value]))
            .collect();
        let mut out = Map::new();
        out.insert(name.to_string(), JsonValue::Array(points));
        Ok(JsonValue::Object(out))
    }
}

fn parse_points(name: &str, points: &JsonValue) -> Result<Points, BackendError> {
    let points = points.as_array().ok_or_else(|| {
        BackendError::Insert(format!("Expecting a list of points for series '{}'", name))
    })?;
    points
        .iter()
        .map(|point| match point.as_array().map(Vec::as_slice) {
            Some([ts, value]) if value.is_number() || value.is_string() => ts
                .as_i64()
                .map(|ts| (ts, value.clone()))
                .ok_or_else(|| {
                    BackendError::Insert(format!("Invalid timestamp in series '{}': {}", name, ts))
                }),
            _ => Err(BackendError::Insert(format!(
                "Expecting [timestamp, value] points in series '{}', got {}",
                name, point
            ))),
        })
        .collect()
}

/// `select * from "cpu"` -> `cpu`
fn select_target(query: &str) -> Option<&str> {
    const PREFIX: &str = "select * from ";
    if !query.get(..PREFIX.len())?.eq_ignore_ascii_case(PREFIX) {
        return None;
    }
    let target = query[PREFIX.len()..].trim();
    let quote = target.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    target
        .strip_prefix(quote)?
        .strip_suffix(quote)
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn insert(&self, payload: JsonValue) -> Result<JsonValue, BackendError> {
        let _permit = self.acquire()?;
        let map = match payload {
            JsonValue::Object(map) => map,
            other => {
                return Err(BackendError::Insert(format!(
                    "Expecting a map of series, got {}",
                    kind(&other)
                )))
            }
        };

        let mut parsed = Vec::with_capacity(map.len());
        for (name, points) in &map {
            parsed.push((name.clone(), parse_points(name, points)?));
        }

        let mut count = 0usize;
        let mut series = self.series.write().await;
        for (name, points) in parsed {
            count += points.len();
            let stored = series.entry(name).or_default();
            stored.extend(points);
            stored.sort_by_key(|(ts, _)| *ts);
        }
        Ok(json!({ "success_msg": format!("Successfully inserted {} point(s).", count) }))
    }

    async fn query(&self, query: &str) -> Result<JsonValue, BackendError> {
        let _permit = self.acquire()?;
        let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "list series" => {
                let series = self.series.read().await;
                let rows: Vec<JsonValue> = series.keys().map(|name| json!([name])).collect();
                Ok(json!({ "columns": ["name"], "series": rows }))
            }
            "count series" => Ok(json!({ "series": self.series.read().await.len() })),
            "show time_precision, version" | "show time_precision,version" => Ok(json!({
                "data": [
                    { "name": "time_precision", "value": TIME_PRECISION },
                    { "name": "version", "value": env!("CARGO_PKG_VERSION") }
                ]
            })),
            _ => match select_target(query.trim()) {
                Some(name) => self.select(name).await,
                None => Err(BackendError::Query(format!("Unsupported query: {}", query))),
            },
        }
    }

    fn db_info(&self) -> JsonValue {
        json!({
            "dbname": self.dbname,
            "version": env!("CARGO_PKG_VERSION"),
            "time_precision": TIME_PRECISION,
            "server": "memory",
        })
    }
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "a map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_select() {
        let backend = MemoryBackend::new("dbtest");
        let resp = backend
            .insert(json!({
                "cpu": [[1500000060, 0.7], [1500000000, 0.5]],
                "mem": [[1500000000, 1024]]
            }))
            .await
            .unwrap();
        assert_eq!(resp, json!({ "success_msg": "Successfully inserted 3 point(s)." }));

        let cpu = backend.query("select * from \"cpu\"").await.unwrap();
        assert_eq!(cpu, json!({ "cpu": [[1500000000, 0.5], [1500000060, 0.7]] }));
        let mem = backend.query("SELECT * FROM 'mem'").await.unwrap();
        assert_eq!(mem, json!({ "mem": [[1500000000, 1024]] }));

        let listed = backend.query("list   series").await.unwrap();
        assert_eq!(listed, json!({ "columns": ["name"], "series": [["cpu"], ["mem"]] }));
        assert_eq!(backend.query("count series").await.unwrap(), json!({ "series": 2 }));
    }

    #[tokio::test]
    async fn rejects_bad_payloads_and_queries() {
        let backend = MemoryBackend::new("dbtest");
        assert!(matches!(
            backend.insert(json!([1, 2, 3])).await,
            Err(BackendError::Insert(_))
        ));
        assert!(matches!(
            backend.insert(json!({ "cpu": [[1.5, 2]] })).await,
            Err(BackendError::Insert(_))
        ));
        assert!(matches!(
            backend.query("drop series 'cpu'").await,
            Err(BackendError::Query(_))
        ));
        assert_eq!(
            backend.query("select * from 'nope'").await,
            Err(BackendError::Query("Cannot find series: 'nope'".to_string()))
        );
        // nothing was stored by the failed inserts
        assert_eq!(backend.query("count series").await.unwrap(), json!({ "series": 0 }));
    }

    #[tokio::test]
    async fn exhausted_pool_reports_pool_error() {
        let backend = MemoryBackend::new("dbtest").with_max_concurrent(0);
        assert!(matches!(
            backend.query("list series").await,
            Err(BackendError::Pool(_))
        ));
    }

    #[test]
    fn select_target_requires_quotes() {
        assert_eq!(select_target("select * from \"a b\""), Some("a b"));
        assert_eq!(select_target("select * from cpu"), None);
        assert_eq!(select_target("select * from ''"), None);
    }
}
