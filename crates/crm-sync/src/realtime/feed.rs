//! Change feed channels
//!
//! A `Subscription` is the scoped handle on one open channel. Releasing it
//! (explicitly or by dropping) tears the channel down exactly once, so no
//! event reaches a store whose owner is gone.

use std::fmt;

use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tracing::info;

use super::event::ChangeEvent;
use crate::domain::{Entity, UserId};
use crate::error::SyncResult;

/// Identity of a channel: one table, one user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub table: &'static str,
    pub user: UserId,
}

impl ChannelKey {
    pub fn new(table: &'static str, user: UserId) -> Self {
        Self { table, user }
    }

    pub fn for_entity<T: Entity>(user: UserId) -> Self {
        Self::new(T::TABLE, user)
    }

    /// Channel name as registered with the transport
    pub fn channel_name(&self) -> String {
        format!("{}-changes-{}", self.table, self.user)
    }

    /// Row filter restricting the channel to the owner's rows
    pub fn filter(&self) -> String {
        format!("user_id=eq.{}", self.user)
    }
}

/// Transport seam: opens channels
pub trait ChangeFeed {
    fn subscribe(&self, key: &ChannelKey) -> SyncResult<Subscription>;
}

/// An open channel
pub struct Subscription {
    key: ChannelKey,
    events: UnboundedReceiver<ChangeEvent>,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// `release` runs once, when the subscription is closed or dropped
    pub fn new(
        key: ChannelKey,
        events: UnboundedReceiver<ChangeEvent>,
        release: impl FnOnce() + 'static,
    ) -> Self {
        info!(channel = %key.channel_name(), "channel opened");
        Self {
            key,
            events,
            release: Some(Box::new(release)),
        }
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Next queued event without waiting
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next event; `None` once the transport side has gone away
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Release the channel now
    pub fn close(mut self) {
        self.release_channel();
    }

    fn release_channel(&mut self) {
        if let Some(release) = self.release.take() {
            self.events.close();
            release();
            info!(channel = %self.key.channel_name(), "channel released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_channel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("released", &self.release.is_none())
            .finish()
    }
}
