//! Realtime Layer
//!
//! One channel per (table, user). The transport delivers `ChangeEvent`s;
//! `reduce` folds them into an entity store.

mod event;
mod feed;
mod reducer;

#[cfg(test)]
mod tests;

pub use event::{ChangeEvent, ChangeKind, Row};
pub use feed::{ChangeFeed, ChannelKey, Subscription};
pub use reducer::{merge_row, reduce, Applied};
