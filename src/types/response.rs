// src/types/response.rs

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

// An empty cursor marks the final page just like an absent one.
fn deserialize_cursor<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let cursor: Option<String> = Option::deserialize(deserializer)?;
    Ok(cursor.filter(|c| !c.is_empty()))
}

/// The envelope Usergrid wraps around every collection and entity response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsergridResponse {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub entities: Vec<Map<String, Value>>,
    /// Opaque token for the next page; `None` on the final page.
    #[serde(default, deserialize_with = "deserialize_cursor")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_missing_cursor_are_none() {
        let with_empty: UsergridResponse =
            serde_json::from_value(json!({"entities": [], "cursor": ""})).unwrap();
        assert!(with_empty.cursor.is_none());

        let without: UsergridResponse = serde_json::from_value(json!({"count": 3})).unwrap();
        assert!(without.cursor.is_none());
        assert!(without.entities.is_empty());
        assert_eq!(without.count, Some(3));

        let with_null: UsergridResponse =
            serde_json::from_value(json!({"cursor": null})).unwrap();
        assert!(with_null.cursor.is_none());
    }

    #[test]
    fn keeps_cursor_verbatim() {
        let resp: UsergridResponse = serde_json::from_value(json!({
            "action": "get",
            "entities": [{"uuid": "a"}],
            "cursor": "LTU2ODc0MzQzOkdCSV9pS0VTRWVHTDZRcnNSdE5fVWc",
            "params": {"limit": ["20"]}
        }))
        .unwrap();
        assert_eq!(
            resp.cursor.as_deref(),
            Some("LTU2ODc0MzQzOkdCSV9pS0VTRWVHTDZRcnNSdE5fVWc")
        );
        assert_eq!(resp.entities.len(), 1);
        assert!(resp.other_fields.contains_key("params"));
    }
}
