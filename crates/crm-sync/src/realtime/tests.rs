//! Reducer tests: echo handling, partial merges and replay properties.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Value};

use super::*;
use crate::domain::{Client, ProposalStatus, ProposalWithClient};
use crate::store::EntityStore;

fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row must be an object")
}

fn client_row(id: &str, name: &str) -> Row {
    row(json!({
        "id": id,
        "user_id": "u1",
        "name": name,
        "email": format!("{}@x.com", id),
        "company": null,
        "created_at": "2025-01-01T00:00:00Z"
    }))
}

fn proposal_row(id: &str, status: &str) -> Row {
    row(json!({
        "id": id,
        "user_id": "u1",
        "client_id": "c1",
        "title": "Site",
        "amount": "1000",
        "status": status,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    }))
}

#[test]
fn test_insert_then_echo_does_not_duplicate() {
    let mut store: EntityStore<Client> = EntityStore::new();
    assert_eq!(reduce(&mut store, &ChangeEvent::insert(client_row("c1", "Ana"))), Applied::Inserted);

    let echo = ChangeEvent::insert(client_row("c1", "Ana Maria"));
    assert_eq!(reduce(&mut store, &echo), Applied::Merged);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("c1").unwrap().name, "Ana Maria");
}

#[test]
fn test_update_merges_only_present_fields() {
    let mut store: EntityStore<ProposalWithClient> = EntityStore::new();
    let mut enriched = proposal_row("p1", "Aberto");
    enriched.insert(
        "clients".to_string(),
        json!({"id": "c1", "name": "Ana", "email": "ana@x.com"}),
    );
    reduce(&mut store, &ChangeEvent::insert(enriched));

    let partial = row(json!({"id": "p1", "status": "Fechado"}));
    assert_eq!(reduce(&mut store, &ChangeEvent::update(partial)), Applied::Merged);

    let merged = store.get("p1").unwrap();
    assert_eq!(merged.status, ProposalStatus::Closed);
    assert_eq!(merged.title, "Site");
    assert_eq!(merged.client_name(), Some("Ana"));
}

#[test]
fn test_update_and_delete_for_unknown_ids_are_ignored() {
    let mut store: EntityStore<Client> = EntityStore::new();
    assert_eq!(
        reduce(&mut store, &ChangeEvent::update(client_row("ghost", "x"))),
        Applied::Ignored
    );
    assert_eq!(reduce(&mut store, &ChangeEvent::delete("ghost")), Applied::Ignored);
    assert!(store.is_empty());
}

#[test]
fn test_malformed_rows_are_rejected_without_touching_store() {
    let mut store: EntityStore<Client> = EntityStore::new();
    reduce(&mut store, &ChangeEvent::insert(client_row("c1", "Ana")));

    let missing_fields = ChangeEvent::insert(row(json!({"id": "c2"})));
    assert!(matches!(reduce(&mut store, &missing_fields), Applied::Rejected(_)));

    let bad_type = ChangeEvent::update(row(json!({"id": "c1", "name": 42})));
    assert!(matches!(reduce(&mut store, &bad_type), Applied::Rejected(_)));
    assert_eq!(store.get("c1").unwrap().name, "Ana");

    let no_id = ChangeEvent {
        kind: ChangeKind::Delete,
        new_row: None,
        old_row: None,
    };
    assert!(matches!(reduce(&mut store, &no_id), Applied::Rejected(_)));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_same_delete_twice_is_noop() {
    let mut store: EntityStore<Client> = EntityStore::new();
    reduce(&mut store, &ChangeEvent::insert(client_row("c1", "Ana")));
    reduce(&mut store, &ChangeEvent::insert(client_row("c2", "Bia")));

    let delete = ChangeEvent::delete("c1");
    assert_eq!(reduce(&mut store, &delete), Applied::Removed);
    assert_eq!(reduce(&mut store, &delete), Applied::Ignored);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_channel_key_naming() {
    let key = ChannelKey::for_entity::<Client>(crate::domain::UserId::new("u1"));
    assert_eq!(key.channel_name(), "clients-changes-u1");
    assert_eq!(key.filter(), "user_id=eq.u1");
}

#[test]
fn test_subscription_releases_once() {
    use std::cell::Cell;
    use std::rc::Rc;

    let released = Rc::new(Cell::new(0));
    let counter = released.clone();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let key = ChannelKey::new("clients", crate::domain::UserId::new("u1"));
    let mut subscription = Subscription::new(key, rx, move || counter.set(counter.get() + 1));

    tx.send(ChangeEvent::delete("c1")).unwrap();
    assert_eq!(subscription.try_next(), Some(ChangeEvent::delete("c1")));
    assert_eq!(subscription.try_next(), None);

    subscription.close();
    assert_eq!(released.get(), 1);
    assert!(tx.send(ChangeEvent::delete("c2")).is_err());
}

#[test]
fn test_subscription_releases_on_drop() {
    use std::cell::Cell;
    use std::rc::Rc;

    let released = Rc::new(Cell::new(false));
    let flag = released.clone();
    let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
    {
        let key = ChannelKey::new("proposals", crate::domain::UserId::new("u1"));
        let _subscription = Subscription::new(key, rx, move || flag.set(true));
    }
    assert!(released.get());
}

// ========================
// Replay properties
// ========================

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, String),
    Update(u8, String),
    Delete(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..5, "[a-z]{1,6}").prop_map(|(id, name)| Op::Insert(id, name)),
        (0u8..5, "[a-z]{1,6}").prop_map(|(id, name)| Op::Update(id, name)),
        (0u8..5).prop_map(Op::Delete),
    ]
}

fn to_event(op: &Op) -> ChangeEvent {
    match op {
        Op::Insert(id, name) => ChangeEvent::insert(client_row(&format!("c{}", id), name)),
        Op::Update(id, name) => {
            ChangeEvent::update(row(json!({"id": format!("c{}", id), "name": name})))
        }
        Op::Delete(id) => ChangeEvent::delete(&format!("c{}", id)),
    }
}

/// Reference model: id -> name
fn replay_model(ops: &[Op]) -> BTreeMap<String, String> {
    let mut model = BTreeMap::new();
    for op in ops {
        match op {
            Op::Insert(id, name) => {
                model.insert(format!("c{}", id), name.clone());
            }
            Op::Update(id, name) => {
                if let Some(current) = model.get_mut(&format!("c{}", id)) {
                    *current = name.clone();
                }
            }
            Op::Delete(id) => {
                model.remove(&format!("c{}", id));
            }
        }
    }
    model
}

fn snapshot(store: &EntityStore<Client>) -> Vec<(String, String)> {
    store.list().iter().map(|c| (c.id.clone(), c.name.clone())).collect()
}

proptest! {
    #[test]
    fn replay_matches_model_without_duplicates(ops in proptest::collection::vec(op(), 0..40)) {
        let mut store: EntityStore<Client> = EntityStore::new();
        for op in &ops {
            reduce(&mut store, &to_event(op));
        }

        let mut seen: Vec<(String, String)> = snapshot(&store);
        let ids_before = seen.len();
        seen.sort();
        seen.dedup_by(|a, b| a.0 == b.0);
        prop_assert_eq!(seen.len(), ids_before);

        let expected: Vec<(String, String)> = replay_model(&ops).into_iter().collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn duplicate_delivery_is_idempotent(ops in proptest::collection::vec(op(), 0..40)) {
        let mut once: EntityStore<Client> = EntityStore::new();
        let mut twice: EntityStore<Client> = EntityStore::new();
        for op in &ops {
            let event = to_event(op);
            reduce(&mut once, &event);
            reduce(&mut twice, &event);
            reduce(&mut twice, &event);
        }
        prop_assert_eq!(snapshot(&once), snapshot(&twice));
    }
}
