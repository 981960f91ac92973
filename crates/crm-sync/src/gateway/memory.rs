//! In-process backend
//!
//! Keeps rows in memory and behaves like the hosted store where the sync
//! layer can tell the difference: generated ids and timestamps, owner
//! isolation, the client join on proposal reads, the proposal -> client
//! foreign key, and an echo on the change feed for every write. Failures can
//! be queued per operation.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;
use uuid::Uuid;

use super::traits::{OwnerScope, ProfileGateway, RemoteGateway};
use crate::domain::{
    AuthUser, Client, ClientPatch, ClientSummary, Entity, NewClient, NewProposal, Profile,
    ProfilePatch, Proposal, ProposalPatch, ProposalWithClient, UserId,
};
use crate::error::{SyncError, SyncResult};
use crate::realtime::{ChangeEvent, ChangeFeed, ChannelKey, Row, Subscription};
use crate::storage::FileStorage;

/// Base of the URLs handed out for stored objects
pub const MEMORY_PUBLIC_URL: &str = "memory://avatars";

const FOREIGN_KEY_VIOLATION: &str =
    "insert or update on table \"proposals\" violates foreign key constraint \"proposals_client_id_fkey\"";

/// Operations a failure can be queued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Fetch,
    Insert,
    Update,
    Delete,
    Subscribe,
    Upload,
}

#[derive(Debug)]
struct Listener {
    id: u64,
    key: ChannelKey,
    events: UnboundedSender<ChangeEvent>,
}

#[derive(Debug, Default)]
struct Inner {
    clients: Vec<Client>,
    proposals: Vec<Proposal>,
    profiles: Vec<Profile>,
    objects: BTreeMap<String, (Vec<u8>, String)>,
    listeners: Vec<Listener>,
    next_listener: u64,
    failures: VecDeque<(Operation, String)>,
    clock: Option<DateTime<Utc>>,
}

impl Inner {
    fn check(&mut self, operation: Operation) -> SyncResult<()> {
        let queued = self.failures.iter().position(|(op, _)| *op == operation);
        match queued.and_then(|index| self.failures.remove(index)) {
            Some((_, message)) => Err(SyncError::Transport(message)),
            None => Ok(()),
        }
    }

    /// Strictly increasing server time
    fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    fn publish(&mut self, table: &str, user: &UserId, event: ChangeEvent) {
        self.listeners.retain(|listener| {
            if listener.key.table != table || &listener.key.user != user {
                return true;
            }
            listener.events.send(event.clone()).is_ok()
        });
    }

    fn owns_client(&self, user: &UserId, client_id: &str) -> bool {
        self.clients
            .iter()
            .any(|client| client.id == client_id && &client.user_id == user)
    }

    fn joined(&self, proposal: &Proposal) -> ProposalWithClient {
        let client = self
            .clients
            .iter()
            .find(|client| client.id == proposal.client_id && client.user_id == proposal.user_id)
            .map(Client::summary);
        ProposalWithClient::new(proposal.clone(), client)
    }
}

fn to_row<S: Serialize>(value: &S) -> SyncResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(SyncError::Decode(format!("expected an object row, got {}", other))),
    }
}

fn missing(table: &str, id: &str) -> SyncError {
    SyncError::NotFound(format!("{} row {}", table, id))
}

/// Shared in-memory store; clones see the same rows
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail with `message`
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.inner
            .borrow_mut()
            .failures
            .push_back((operation, message.into()));
    }

    /// Deliver a raw event to every open channel matching `key`
    pub fn broadcast(&self, key: &ChannelKey, event: ChangeEvent) {
        self.inner.borrow_mut().publish(key.table, &key.user, event);
    }

    /// Number of open channels on `table`
    pub fn open_channels(&self, table: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.key.table == table && !listener.events.is_closed())
            .count()
    }

    /// Close every channel on `table` from the server side
    pub fn disconnect(&self, table: &str) -> usize {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|listener| listener.key.table != table);
        before - inner.listeners.len()
    }

    /// Stored object bytes and content type
    pub fn object(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.inner.borrow().objects.get(path).cloned()
    }
}

// ========================
// Clients
// ========================

fn apply_client_patch(client: &mut Client, patch: &ClientPatch) {
    if let Some(name) = &patch.name {
        client.name = name.clone();
    }
    if let Some(email) = &patch.email {
        client.email = email.clone();
    }
    if let Some(phone) = &patch.phone {
        client.phone = phone.clone();
    }
    if let Some(company) = &patch.company {
        client.company = company.clone();
    }
    if let Some(notes) = &patch.notes {
        client.notes = notes.clone();
    }
}

#[async_trait(?Send)]
impl RemoteGateway<Client> for MemoryBackend {
    async fn select(&self, scope: &OwnerScope) -> SyncResult<Vec<Client>> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Select)?;
        let mut rows: Vec<Client> = inner
            .clients
            .iter()
            .filter(|client| &client.user_id == scope.user())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn fetch(&self, scope: &OwnerScope, id: &str) -> SyncResult<Option<Client>> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Fetch)?;
        Ok(inner
            .clients
            .iter()
            .find(|client| client.id == id && &client.user_id == scope.user())
            .cloned())
    }

    async fn insert(&self, scope: &OwnerScope, new: &NewClient) -> SyncResult<Client> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Insert)?;
        let client = Client {
            id: Uuid::new_v4().to_string(),
            user_id: scope.user().clone(),
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            company: new.company.clone(),
            notes: new.notes.clone(),
            created_at: inner.now(),
        };
        inner.clients.push(client.clone());
        debug!(id = %client.id, "client stored");

        let row = to_row(&client)?;
        inner.publish(Client::TABLE, scope.user(), ChangeEvent::insert(row));
        Ok(client)
    }

    async fn update(&self, scope: &OwnerScope, id: &str, patch: &ClientPatch) -> SyncResult<Client> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Update)?;
        let client = inner
            .clients
            .iter_mut()
            .find(|client| client.id == id && &client.user_id == scope.user())
            .ok_or_else(|| missing(Client::TABLE, id))?;
        apply_client_patch(client, patch);
        let updated = client.clone();

        let row = to_row(&updated)?;
        inner.publish(Client::TABLE, scope.user(), ChangeEvent::update(row));
        Ok(updated)
    }

    async fn delete(&self, scope: &OwnerScope, id: &str) -> SyncResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Delete)?;
        let before = inner.clients.len();
        inner
            .clients
            .retain(|client| !(client.id == id && &client.user_id == scope.user()));
        if inner.clients.len() < before {
            inner.publish(Client::TABLE, scope.user(), ChangeEvent::delete(id));
        }
        Ok(())
    }
}

// ========================
// Proposals
// ========================

fn apply_proposal_patch(proposal: &mut Proposal, patch: &ProposalPatch) {
    if let Some(client_id) = &patch.client_id {
        proposal.client_id = client_id.clone();
    }
    if let Some(title) = &patch.title {
        proposal.title = title.clone();
    }
    if let Some(amount) = patch.amount {
        proposal.amount = amount;
    }
    if let Some(status) = patch.status {
        proposal.status = status;
    }
}

#[async_trait(?Send)]
impl RemoteGateway<ProposalWithClient> for MemoryBackend {
    async fn select(&self, scope: &OwnerScope) -> SyncResult<Vec<ProposalWithClient>> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Select)?;
        let mut rows: Vec<ProposalWithClient> = inner
            .proposals
            .iter()
            .filter(|proposal| &proposal.user_id == scope.user())
            .map(|proposal| inner.joined(proposal))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn fetch(&self, scope: &OwnerScope, id: &str) -> SyncResult<Option<ProposalWithClient>> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Fetch)?;
        Ok(inner
            .proposals
            .iter()
            .find(|proposal| proposal.id == id && &proposal.user_id == scope.user())
            .map(|proposal| inner.joined(proposal)))
    }

    async fn insert(&self, scope: &OwnerScope, new: &NewProposal) -> SyncResult<ProposalWithClient> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Insert)?;
        if !inner.owns_client(scope.user(), &new.client_id) {
            return Err(SyncError::transport(FOREIGN_KEY_VIOLATION));
        }
        let now = inner.now();
        let proposal = Proposal {
            id: Uuid::new_v4().to_string(),
            user_id: scope.user().clone(),
            client_id: new.client_id.clone(),
            title: new.title.clone(),
            amount: new.amount,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        inner.proposals.push(proposal.clone());
        debug!(id = %proposal.id, "proposal stored");

        // The feed carries the base row only
        let row = to_row(&proposal)?;
        inner.publish(ProposalWithClient::TABLE, scope.user(), ChangeEvent::insert(row));
        Ok(inner.joined(&proposal))
    }

    async fn update(
        &self,
        scope: &OwnerScope,
        id: &str,
        patch: &ProposalPatch,
    ) -> SyncResult<ProposalWithClient> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Update)?;
        if let Some(client_id) = &patch.client_id {
            if !inner.owns_client(scope.user(), client_id) {
                return Err(SyncError::transport(FOREIGN_KEY_VIOLATION));
            }
        }
        let now = inner.now();
        let proposal = inner
            .proposals
            .iter_mut()
            .find(|proposal| proposal.id == id && &proposal.user_id == scope.user())
            .ok_or_else(|| missing(ProposalWithClient::TABLE, id))?;
        apply_proposal_patch(proposal, patch);
        proposal.updated_at = now;
        let updated = proposal.clone();

        let row = to_row(&updated)?;
        inner.publish(ProposalWithClient::TABLE, scope.user(), ChangeEvent::update(row));
        Ok(inner.joined(&updated))
    }

    async fn delete(&self, scope: &OwnerScope, id: &str) -> SyncResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Delete)?;
        let before = inner.proposals.len();
        inner
            .proposals
            .retain(|proposal| !(proposal.id == id && &proposal.user_id == scope.user()));
        if inner.proposals.len() < before {
            inner.publish(ProposalWithClient::TABLE, scope.user(), ChangeEvent::delete(id));
        }
        Ok(())
    }
}

// ========================
// Profiles
// ========================

fn apply_profile_patch(profile: &mut Profile, patch: &ProfilePatch) {
    let fields = [
        (&mut profile.full_name, &patch.full_name),
        (&mut profile.avatar_url, &patch.avatar_url),
        (&mut profile.company, &patch.company),
        (&mut profile.phone, &patch.phone),
        (&mut profile.bio, &patch.bio),
        (&mut profile.website, &patch.website),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            *field = value.clone();
        }
    }
}

#[async_trait(?Send)]
impl ProfileGateway for MemoryBackend {
    async fn fetch(&self, scope: &OwnerScope) -> SyncResult<Option<Profile>> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Fetch)?;
        Ok(inner
            .profiles
            .iter()
            .find(|profile| &profile.id == scope.user())
            .cloned())
    }

    async fn create(&self, scope: &OwnerScope, user: &AuthUser) -> SyncResult<Profile> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Insert)?;
        if &user.id != scope.user() {
            return Err(SyncError::Unauthenticated);
        }
        if inner.profiles.iter().any(|profile| profile.id == user.id) {
            return Err(SyncError::transport(
                "duplicate key value violates unique constraint \"profiles_pkey\"",
            ));
        }
        let now = inner.now();
        let profile = Profile::seed(user, now);
        inner.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update(&self, scope: &OwnerScope, patch: &ProfilePatch) -> SyncResult<Profile> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Update)?;
        let now = inner.now();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|profile| &profile.id == scope.user())
            .ok_or_else(|| missing("profiles", scope.user().as_str()))?;
        apply_profile_patch(profile, patch);
        profile.updated_at = now;
        Ok(profile.clone())
    }
}

// ========================
// Change feed and storage
// ========================

impl ChangeFeed for MemoryBackend {
    fn subscribe(&self, key: &ChannelKey) -> SyncResult<Subscription> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Subscribe)?;
        let (events, receiver) = mpsc::unbounded_channel();
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.push(Listener {
            id,
            key: key.clone(),
            events,
        });

        let backend: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        Ok(Subscription::new(key.clone(), receiver, move || {
            // A busy backend prunes the closed listener on its next publish
            if let Some(inner) = backend.upgrade() {
                if let Ok(mut inner) = inner.try_borrow_mut() {
                    inner.listeners.retain(|listener| listener.id != id);
                }
            }
        }))
    }
}

#[async_trait(?Send)]
impl FileStorage for MemoryBackend {
    async fn upload(
        &self,
        scope: &OwnerScope,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> SyncResult<String> {
        let mut inner = self.inner.borrow_mut();
        inner.check(Operation::Upload)?;
        if !path.starts_with(&format!("{}/", scope.user())) {
            return Err(SyncError::transport(
                "new row violates row-level security policy",
            ));
        }
        inner
            .objects
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(format!("{}/{}", MEMORY_PUBLIC_URL, path))
    }
}
