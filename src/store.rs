//! Global Application State Store
//!
//! Uses Leptos reactive_stores for fine-grained reactivity. The hook drivers
//! are the only writers of the synced fields; components read them.

use crm_sync::domain::{AuthUser, Client, ProposalWithClient};
use crm_sync::hook::{HookState, ProfileState};
use leptos::prelude::*;
use reactive_stores::Store;

/// Loading flag and last error of one hook
#[derive(Clone, Debug, PartialEq)]
pub struct LoadStatus {
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for LoadStatus {
    fn default() -> Self {
        Self {
            loading: true,
            error: None,
        }
    }
}

#[derive(Clone, Debug, Default, Store)]
pub struct AppState {
    /// Signed-in user (None = show the sign-in form)
    pub user: Option<AuthUser>,
    pub clients: Vec<Client>,
    pub clients_status: LoadStatus,
    /// Proposals with their joined client
    pub proposals: Vec<ProposalWithClient>,
    pub proposals_status: LoadStatus,
    pub profile: ProfileState,
    /// Search box shared by the client list and the board
    pub search: String,
}

/// Type alias for the store
pub type AppStore = Store<AppState>;

/// Get the app store from context
pub fn use_app_store() -> AppStore {
    expect_context::<AppStore>()
}

// ========================
// Store Helper Functions
// ========================

/// Publish a clients hook snapshot
pub fn store_set_clients(store: &AppStore, state: HookState<Client>) {
    *store.clients().write() = state.data;
    *store.clients_status().write() = LoadStatus {
        loading: state.loading,
        error: state.error,
    };
}

/// Publish a proposals hook snapshot
pub fn store_set_proposals(store: &AppStore, state: HookState<ProposalWithClient>) {
    *store.proposals().write() = state.data;
    *store.proposals_status().write() = LoadStatus {
        loading: state.loading,
        error: state.error,
    };
}

pub fn store_set_profile(store: &AppStore, state: ProfileState) {
    *store.profile().write() = state;
}

pub fn store_set_user(store: &AppStore, user: Option<AuthUser>) {
    *store.user().write() = user;
}
