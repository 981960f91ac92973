//! Gateway Layer - Core Traits
//!
//! Abstract interfaces for the hosted store. Implementations talk to the
//! REST endpoint or keep rows in memory.

use async_trait::async_trait;

use crate::domain::{AuthUser, Entity, Profile, ProfilePatch, UserId};
use crate::error::SyncResult;

/// The signed-in owner every request is filtered by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerScope {
    user: UserId,
    access_token: Option<String>,
}

impl OwnerScope {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Swap the bearer token after a refresh; the owner stays the same
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    /// Filter value for the owner column
    pub fn owner_filter(&self) -> String {
        format!("eq.{}", self.user)
    }
}

/// CRUD access to one entity table
///
/// Futures are not `Send`: the whole sync layer runs on one thread.
#[async_trait(?Send)]
pub trait RemoteGateway<T: Entity> {
    /// All rows of the owner, newest first
    async fn select(&self, scope: &OwnerScope) -> SyncResult<Vec<T>>;

    /// One row by id, or `None` if the owner has no such row
    async fn fetch(&self, scope: &OwnerScope, id: &str) -> SyncResult<Option<T>>;

    /// Insert and return the stored row with its generated fields
    async fn insert(&self, scope: &OwnerScope, new: &T::New) -> SyncResult<T>;

    /// Apply a partial update and return the updated row
    async fn update(&self, scope: &OwnerScope, id: &str, patch: &T::Patch) -> SyncResult<T>;

    /// Delete by id; deleting a missing row is not an error
    async fn delete(&self, scope: &OwnerScope, id: &str) -> SyncResult<()>;
}

/// Access to the owner's profile row (keyed by the user id itself)
#[async_trait(?Send)]
pub trait ProfileGateway {
    async fn fetch(&self, scope: &OwnerScope) -> SyncResult<Option<Profile>>;

    /// Create the first profile, seeded from the auth metadata
    async fn create(&self, scope: &OwnerScope, user: &AuthUser) -> SyncResult<Profile>;

    /// Apply a partial update; `updated_at` is refreshed
    async fn update(&self, scope: &OwnerScope, patch: &ProfilePatch) -> SyncResult<Profile>;
}
