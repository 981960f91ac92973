//! Hook Layer
//!
//! What a dashboard view renders from. Each hook privately owns one entity
//! store and at most one open channel, follows the signed-in identity, and
//! turns every remote failure into a message.

mod collection;
mod driver;
mod profile;

pub use collection::{ClientsHook, CollectionHook, ProposalsHook};
pub use driver::{run_hook, run_profile_hook, HookCommand, ProfileCommand, Reply};
pub use profile::{ProfileHook, ProfileState};

/// Snapshot handed to the view after every step
#[derive(Debug, Clone, PartialEq)]
pub struct HookState<T> {
    pub data: Vec<T>,
    /// True until the first load for the current user settles
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for HookState<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            loading: true,
            error: None,
        }
    }
}
