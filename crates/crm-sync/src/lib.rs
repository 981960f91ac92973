//! FreelCRM Sync Core
//!
//! Layered architecture:
//! - domain: Clients, proposals, profiles and their value types
//! - gateway: Remote store access, always scoped to the signed-in user
//! - realtime: Change feed channels and the event reducer
//! - store / view: In-memory snapshots and the projections derived from them
//! - form: Schema validation and submit control
//! - hook: The state each dashboard view renders from
//! - session: Auth identity and service wiring

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod form;
pub mod gateway;
pub mod hook;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
pub mod realtime;
pub mod session;
pub mod storage;
pub mod store;
pub mod view;

pub use error::{SyncError, SyncResult};
