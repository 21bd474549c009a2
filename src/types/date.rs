// src/types/date.rs

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Server-maintained timestamp properties carried on every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Created,
    Modified,
}

impl DateField {
    pub fn key(self) -> &'static str {
        match self {
            DateField::Created => "created",
            DateField::Modified => "modified",
        }
    }
}

/// Converts a Usergrid timestamp (milliseconds since the Unix epoch) into a UTC datetime.
///
/// Accepts integral JSON numbers and numeric strings; anything else yields `None`.
pub fn millis_to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.parse::<i64>().ok()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}
