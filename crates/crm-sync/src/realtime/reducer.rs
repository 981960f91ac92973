//! Change reducer
//!
//! Pure fold of one event into a store. Inserts for an id that is already
//! present (the echo of our own write) merge instead of duplicating;
//! updates and deletes for unknown ids are ignored. Applying the same
//! event twice leaves the store as after the first application.

use serde_json::Value;
use tracing::{debug, warn};

use super::event::{ChangeEvent, ChangeKind, Row};
use crate::domain::Entity;
use crate::store::EntityStore;

/// What an event did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Merged,
    Removed,
    /// Nothing to do: unknown id
    Ignored,
    /// The event could not be interpreted; the store is unchanged
    Rejected(String),
}

pub fn reduce<T: Entity>(store: &mut EntityStore<T>, event: &ChangeEvent) -> Applied {
    let applied = match event.kind {
        ChangeKind::Insert => apply_insert(store, event),
        ChangeKind::Update => apply_update(store, event),
        ChangeKind::Delete => match event.row_id() {
            Some(id) => match store.remove_local(id) {
                Some(_) => Applied::Removed,
                None => Applied::Ignored,
            },
            None => Applied::Rejected("delete without id".to_string()),
        },
    };

    match &applied {
        Applied::Rejected(reason) => {
            warn!(table = T::TABLE, kind = ?event.kind, %reason, "change event rejected")
        }
        other => debug!(table = T::TABLE, kind = ?event.kind, result = ?other, "change event applied"),
    }
    applied
}

fn apply_insert<T: Entity>(store: &mut EntityStore<T>, event: &ChangeEvent) -> Applied {
    let Some(row) = event.new_row() else {
        return Applied::Rejected("insert without row".to_string());
    };
    let Some(id) = event.row_id() else {
        return Applied::Rejected("insert without id".to_string());
    };

    if store.contains(id) {
        return merge_into(store, id, row);
    }

    match serde_json::from_value::<T>(Value::Object(row.clone())) {
        Ok(entity) => {
            store.insert_local(entity);
            Applied::Inserted
        }
        Err(e) => Applied::Rejected(e.to_string()),
    }
}

fn apply_update<T: Entity>(store: &mut EntityStore<T>, event: &ChangeEvent) -> Applied {
    let Some(row) = event.new_row() else {
        return Applied::Rejected("update without row".to_string());
    };
    match event.row_id() {
        Some(id) if store.contains(id) => merge_into(store, id, row),
        Some(_) => Applied::Ignored,
        None => Applied::Rejected("update without id".to_string()),
    }
}

fn merge_into<T: Entity>(store: &mut EntityStore<T>, id: &str, row: &Row) -> Applied {
    let Some(current) = store.get(id) else {
        return Applied::Ignored;
    };
    match merge_row(current, row) {
        Ok(merged) => {
            store.update_local(id, merged);
            Applied::Merged
        }
        Err(e) => Applied::Rejected(e.to_string()),
    }
}

/// Overlay the fields present in `row` onto `current`
///
/// Fields the row does not mention (such as a joined client summary) are
/// kept as they were.
pub fn merge_row<T: Entity>(current: &T, row: &Row) -> Result<T, serde_json::Error> {
    let mut value = serde_json::to_value(current)?;
    if let Value::Object(fields) = &mut value {
        for (key, field) in row {
            fields.insert(key.clone(), field.clone());
        }
    }
    serde_json::from_value(value)
}
