//! Domain Layer - Core Entity Trait
//!
//! Every row kept in an entity store implements this trait. Rows travel as
//! JSON, so entities are serde round-trippable.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Core trait for all synchronized entities
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + 'static {
    /// Insert payload. Never carries `user_id`; the gateway injects it.
    type New: Serialize + Debug;
    /// Partial update payload. Absent fields are left untouched.
    type Patch: Serialize + Debug;

    /// Remote table name
    const TABLE: &'static str;
    /// Remote select projection
    const SELECT: &'static str = "*";
    /// Whether reads join data the change feed does not carry
    const ENRICHED: bool = false;

    /// Returns the entity's unique identifier
    fn id(&self) -> &str;

    /// Creation timestamp, used for newest-first ordering
    fn created_at(&self) -> DateTime<Utc>;
}
