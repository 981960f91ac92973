//! Derived View
//!
//! Pure projections over a snapshot: search, status columns and aggregates.
//! Nothing here mutates or reorders the snapshot it is given.

mod board;
mod filter;
mod stats;

pub use board::{group_by_status, resolve_drop, DropTarget, StatusBoard};
pub use filter::{filter, Searchable};
pub use stats::{ClientStats, DashboardStats, ProposalStats, RECENT_CLIENTS};
