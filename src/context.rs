//! Application Context
//!
//! Handles to the hook drivers, provided via Leptos Context API. Every field
//! is a channel sender, so the context can be copied into any component.

use crm_sync::auth::AuthHandle;
use crm_sync::config::SupabaseConfig;
use crm_sync::domain::{Client, ProposalWithClient};
use leptos::prelude::*;

use crate::hooks::{HookHandle, ProfileHandle};

#[derive(Clone)]
pub struct AppContext {
    pub clients: HookHandle<Client>,
    pub proposals: HookHandle<ProposalWithClient>,
    pub profile: ProfileHandle,
    /// Identity channel every driver follows
    pub auth: AuthHandle,
    /// Hosted endpoints; `None` when running on the in-memory backend
    pub config: Option<SupabaseConfig>,
}

pub fn use_app_context() -> AppContext {
    expect_context::<AppContext>()
}
