//! Change notifications as delivered by the feed
//!
//! Rows are plain JSON objects so the reducer stays independent of the
//! transport. The field names follow the hosted feed's payload
//! (`eventType`, `new`, `old`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row as carried by a notification
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    #[serde(rename = "new", default)]
    pub new_row: Option<Row>,
    #[serde(rename = "old", default)]
    pub old_row: Option<Row>,
}

impl ChangeEvent {
    pub fn insert(row: Row) -> Self {
        Self {
            kind: ChangeKind::Insert,
            new_row: Some(row),
            old_row: None,
        }
    }

    pub fn update(row: Row) -> Self {
        Self {
            kind: ChangeKind::Update,
            new_row: Some(row),
            old_row: None,
        }
    }

    /// Deletes only carry the primary key
    pub fn delete(id: &str) -> Self {
        let mut old = Row::new();
        old.insert("id".to_string(), Value::String(id.to_string()));
        Self {
            kind: ChangeKind::Delete,
            new_row: None,
            old_row: Some(old),
        }
    }

    /// Non-empty new row, if any (the feed sends `{}` for deletes)
    pub fn new_row(&self) -> Option<&Row> {
        self.new_row.as_ref().filter(|row| !row.is_empty())
    }

    /// Id of the affected row, looked up in `new` first, then `old`
    pub fn row_id(&self) -> Option<&str> {
        self.new_row()
            .and_then(|row| row.get("id"))
            .or_else(|| self.old_row.as_ref().and_then(|row| row.get("id")))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_feed_payload() {
        let payload = json!({
            "eventType": "DELETE",
            "schema": "public",
            "table": "clients",
            "new": {},
            "old": {"id": "c1"}
        });
        let event: ChangeEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert!(event.new_row().is_none());
        assert_eq!(event.row_id(), Some("c1"));
    }

    #[test]
    fn test_row_id_prefers_new_row() {
        let row = json!({"id": "p2", "title": "x"}).as_object().unwrap().clone();
        let event = ChangeEvent::update(row);
        assert_eq!(event.row_id(), Some("p2"));
        assert_eq!(ChangeEvent::delete("p3").row_id(), Some("p3"));
    }
}
