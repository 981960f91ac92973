//! Entity Store
//!
//! The in-memory snapshot one hook owns: an ordered list, newest first, never
//! holding two entities with the same id.

use tracing::debug;

use crate::domain::Entity;
use crate::error::SyncResult;
use crate::gateway::{OwnerScope, RemoteGateway};

#[derive(Debug, Clone)]
pub struct EntityStore<T> {
    items: Vec<T>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, newest first
    pub fn list(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace the whole snapshot with the remote rows for this scope
    ///
    /// On failure the previous snapshot is left untouched.
    pub async fn load(
        &mut self,
        gateway: &dyn RemoteGateway<T>,
        scope: &OwnerScope,
    ) -> SyncResult<()> {
        let rows = gateway.select(scope).await?;
        debug!(table = T::TABLE, rows = rows.len(), "snapshot loaded");
        self.replace_all(rows);
        Ok(())
    }

    /// Swap in a new snapshot, sorted newest first; later duplicates of an id are dropped
    pub fn replace_all(&mut self, mut rows: Vec<T>) {
        rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        let mut items: Vec<T> = Vec::with_capacity(rows.len());
        for row in rows {
            if !items.iter().any(|item| item.id() == row.id()) {
                items.push(row);
            }
        }
        self.items = items;
    }

    /// Prepend a confirmed entity
    ///
    /// If the id is already present the entity replaces it in place instead,
    /// so the store never duplicates. Returns whether a new entity was added.
    pub fn insert_local(&mut self, entity: T) -> bool {
        if let Some(existing) = self.items.iter_mut().find(|item| item.id() == entity.id()) {
            *existing = entity;
            return false;
        }
        self.items.insert(0, entity);
        true
    }

    /// Replace the entity with this id in place; no-op if absent
    pub fn update_local(&mut self, id: &str, entity: T) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(existing) => {
                *existing = entity;
                true
            }
            None => false,
        }
    }

    /// Remove the entity with this id; no-op if absent
    pub fn remove_local(&mut self, id: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Client, UserId};
    use chrono::{Duration, TimeZone, Utc};

    fn client(id: &str, minutes: i64) -> Client {
        Client {
            id: id.to_string(),
            user_id: UserId::new("u1"),
            name: format!("Client {}", id),
            email: format!("{}@x.com", id),
            phone: None,
            company: None,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
        }
    }

    fn ids(store: &EntityStore<Client>) -> Vec<&str> {
        store.list().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_replace_all_orders_newest_first_and_dedupes() {
        let mut store = EntityStore::new();
        store.replace_all(vec![client("a", 1), client("b", 3), client("a", 2), client("c", 2)]);
        assert_eq!(ids(&store), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_insert_local_prepends() {
        let mut store = EntityStore::new();
        store.replace_all(vec![client("a", 1)]);
        assert!(store.insert_local(client("b", 2)));
        assert_eq!(ids(&store), vec!["b", "a"]);
    }

    #[test]
    fn test_insert_local_existing_id_replaces_in_place() {
        let mut store = EntityStore::new();
        store.replace_all(vec![client("a", 2), client("b", 1)]);
        let mut renamed = client("b", 1);
        renamed.name = "Renamed".to_string();
        assert!(!store.insert_local(renamed));
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.get("b").unwrap().name, "Renamed");
    }

    #[test]
    fn test_update_and_remove_are_noops_for_unknown_ids() {
        let mut store = EntityStore::new();
        store.replace_all(vec![client("a", 1)]);
        assert!(!store.update_local("zzz", client("zzz", 5)));
        assert!(store.remove_local("zzz").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_twice_is_idempotent() {
        let mut store = EntityStore::new();
        store.replace_all(vec![client("a", 1), client("b", 2)]);
        assert!(store.remove_local("a").is_some());
        assert!(store.remove_local("a").is_none());
        assert_eq!(ids(&store), vec!["b"]);
    }
}
