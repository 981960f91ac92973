//! Collection hooks for clients and proposals

use std::rc::Rc;

use tracing::{info, warn};

use super::HookState;
use crate::auth::AuthSession;
use crate::domain::{Client, Entity, ProposalPatch, ProposalStatus, ProposalWithClient, UserId};
use crate::error::{SyncError, SyncResult};
use crate::gateway::{OwnerScope, RemoteGateway};
use crate::realtime::{reduce, Applied, ChangeEvent, ChangeFeed, ChannelKey, ChangeKind, Subscription};
use crate::store::EntityStore;
use crate::view::{self, ClientStats, DropTarget, ProposalStats, StatusBoard};

pub type ClientsHook = CollectionHook<Client>;
pub type ProposalsHook = CollectionHook<ProposalWithClient>;

/// One entity store kept in sync with the remote table of the current user
pub struct CollectionHook<T: Entity> {
    gateway: Rc<dyn RemoteGateway<T>>,
    feed: Rc<dyn ChangeFeed>,
    store: EntityStore<T>,
    scope: Option<OwnerScope>,
    subscription: Option<Subscription>,
    loading: bool,
    error: Option<String>,
}

impl<T: Entity> CollectionHook<T> {
    pub fn new(gateway: Rc<dyn RemoteGateway<T>>, feed: Rc<dyn ChangeFeed>) -> Self {
        Self {
            gateway,
            feed,
            store: EntityStore::new(),
            scope: None,
            subscription: None,
            loading: true,
            error: None,
        }
    }

    pub fn state(&self) -> HookState<T> {
        HookState {
            data: self.store.list().to_vec(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }

    pub fn data(&self) -> &[T] {
        self.store.list()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn user(&self) -> Option<&UserId> {
        self.scope.as_ref().map(OwnerScope::user)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Follow an identity change
    ///
    /// A new user (or none) drops the channel and the snapshot of the
    /// previous one before anything else happens. A token refresh for the
    /// same user only swaps the token.
    pub async fn set_user(&mut self, session: Option<&AuthSession>) {
        let next = session.map(AuthSession::scope);
        let same_user = matches!(
            (&self.scope, &next),
            (Some(current), Some(next)) if current.user() == next.user()
        );
        if same_user {
            if let (Some(current), Some(next)) = (self.scope.as_mut(), next) {
                current.set_access_token(next.access_token().map(str::to_string));
            }
            return;
        }

        self.release_channel();
        self.store.clear();
        self.error = None;
        self.scope = next;

        let Some(user) = self.user().cloned() else {
            self.loading = false;
            info!(table = T::TABLE, "no user, hook cleared");
            return;
        };

        self.loading = true;
        match self.feed.subscribe(&ChannelKey::for_entity::<T>(user)) {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(err) => warn!(table = T::TABLE, error = %err, "subscribe failed"),
        }
        // The failure is kept in `error`
        let _ = self.refetch().await;
    }

    /// Reload the whole snapshot; on failure the previous one stays visible
    pub async fn refetch(&mut self) -> SyncResult<()> {
        let Some(scope) = self.scope.as_ref() else {
            return Err(SyncError::Unauthenticated);
        };
        self.loading = true;
        let result = self
            .store
            .load(self.gateway.as_ref(), scope)
            .await
            .map_err(SyncError::into_load);
        self.loading = false;
        self.settle(&result);
        result
    }

    /// Insert remotely, then prepend the confirmed row
    pub async fn create(&mut self, new: T::New) -> SyncResult<T> {
        let scope = self.scope()?;
        let result = self
            .gateway
            .insert(&scope, &new)
            .await
            .map_err(SyncError::into_mutation);
        if let Ok(entity) = &result {
            self.store.insert_local(entity.clone());
        }
        self.settle(&result);
        result
    }

    pub async fn update(&mut self, id: &str, patch: T::Patch) -> SyncResult<T> {
        let scope = self.scope()?;
        let result = self
            .gateway
            .update(&scope, id, &patch)
            .await
            .map_err(SyncError::into_mutation);
        if let Ok(entity) = &result {
            self.store.update_local(id, entity.clone());
        }
        self.settle(&result);
        result
    }

    pub async fn delete(&mut self, id: &str) -> SyncResult<()> {
        let scope = self.scope()?;
        let result = self
            .gateway
            .delete(&scope, id)
            .await
            .map_err(SyncError::into_mutation);
        if result.is_ok() {
            self.store.remove_local(id);
        }
        self.settle(&result);
        result
    }

    /// Show `apply`'d entity at once, then confirm it remotely
    ///
    /// On failure the entity as it was before is put back.
    pub async fn update_optimistic(
        &mut self,
        id: &str,
        patch: T::Patch,
        apply: impl FnOnce(&mut T),
    ) -> SyncResult<T> {
        let scope = self.scope()?;
        let Some(previous) = self.store.get(id).cloned() else {
            let err = SyncError::mutation(format!("{} {} não encontrado", T::TABLE, id));
            self.settle::<()>(&Err(err.clone()));
            return Err(err);
        };

        let mut tentative = previous.clone();
        apply(&mut tentative);
        self.store.update_local(id, tentative);

        let result = self
            .gateway
            .update(&scope, id, &patch)
            .await
            .map_err(SyncError::into_mutation);
        match &result {
            Ok(confirmed) => {
                self.store.update_local(id, confirmed.clone());
            }
            Err(_) => {
                self.store.update_local(id, previous);
                info!(table = T::TABLE, %id, "optimistic update rolled back");
            }
        }
        self.settle(&result);
        result
    }

    /// Fold one channel event into the snapshot
    ///
    /// Inserts of joined rows the store does not hold yet are re-read so the
    /// joined fields are present; if that read fails the bare row is used.
    pub async fn apply_event(&mut self, event: ChangeEvent) -> Applied {
        if T::ENRICHED && event.kind == ChangeKind::Insert {
            if let Some(id) = event.row_id().filter(|id| !self.store.contains(id)) {
                if let Some(entity) = self.fetch_joined(id).await {
                    if !self.store.contains(entity.id()) {
                        self.store.insert_local(entity);
                        return Applied::Inserted;
                    }
                }
            }
        }
        reduce(&mut self.store, &event)
    }

    async fn fetch_joined(&self, id: &str) -> Option<T> {
        let scope = self.scope.as_ref()?;
        match self.gateway.fetch(scope, id).await {
            Ok(entity) => entity,
            Err(err) => {
                warn!(table = T::TABLE, %id, error = %err, "joined read failed, using bare row");
                None
            }
        }
    }

    /// Apply every event already queued on the channel, in order
    pub async fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription.as_mut().and_then(Subscription::try_next) {
            self.apply_event(event).await;
            applied += 1;
        }
        applied
    }

    /// Wait for the next channel event
    ///
    /// Never resolves while no channel is open. `None` means the transport
    /// closed the channel.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.next().await,
            None => std::future::pending().await,
        }
    }

    /// Close the channel, if one is open
    pub fn release_channel(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close();
        }
    }

    fn scope(&self) -> SyncResult<OwnerScope> {
        self.scope.clone().ok_or(SyncError::Unauthenticated)
    }

    fn settle<R>(&mut self, result: &SyncResult<R>) {
        match result {
            Ok(_) => self.error = None,
            Err(err) => {
                warn!(table = T::TABLE, error = %err, "remote call failed");
                self.error = Some(err.message());
            }
        }
    }
}

impl CollectionHook<Client> {
    pub fn filtered(&self, term: &str) -> Vec<&Client> {
        view::filter(self.data(), term)
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats::from_snapshot(self.data())
    }
}

impl CollectionHook<ProposalWithClient> {
    pub fn filtered(&self, term: &str) -> Vec<&ProposalWithClient> {
        view::filter(self.data(), term)
    }

    pub fn by_status(&self) -> StatusBoard {
        view::group_by_status(self.data())
    }

    pub fn stats(&self) -> ProposalStats {
        ProposalStats::from_snapshot(self.data())
    }

    /// Move a proposal to another column; no-op if it is already there
    pub async fn move_status(&mut self, id: &str, status: ProposalStatus) -> SyncResult<()> {
        if self.store.get(id).is_some_and(|p| p.status == status) {
            return Ok(());
        }
        self.update_optimistic(id, ProposalPatch::status(status), |proposal| {
            proposal.proposal.status = status;
        })
        .await
        .map(|_| ())
    }

    /// Handle a board drop; returns whether the status changed
    pub async fn drop_card(&mut self, dragged_id: &str, target: &DropTarget) -> SyncResult<bool> {
        match view::resolve_drop(self.data(), dragged_id, target) {
            Some(status) => self.move_status(dragged_id, status).await.map(|_| true),
            None => Ok(false),
        }
    }
}
