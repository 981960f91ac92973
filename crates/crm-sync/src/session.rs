//! Session
//!
//! Process-wide state with an explicit lifecycle: created when the app
//! starts, it owns the identity channel every hook follows. Signing out
//! publishes "no user", which makes every hook drop its channel and data.

use std::rc::Rc;

use crate::auth::{auth_channel, AuthHandle, AuthSession, AuthWatch};
use crate::config::SupabaseConfig;
use crate::domain::{AuthUser, Client, ProposalWithClient};
use crate::gateway::{MemoryBackend, PostgrestGateway, ProfileGateway, RemoteGateway};
use crate::hook::{ClientsHook, CollectionHook, ProfileHook, ProposalsHook};
use crate::realtime::ChangeFeed;
use crate::storage::{FileStorage, SupabaseStorage};

/// The remote boundaries hooks are built on
#[derive(Clone)]
pub struct Services {
    pub clients: Rc<dyn RemoteGateway<Client>>,
    pub proposals: Rc<dyn RemoteGateway<ProposalWithClient>>,
    pub profiles: Rc<dyn ProfileGateway>,
    pub feed: Rc<dyn ChangeFeed>,
    pub storage: Rc<dyn FileStorage>,
}

impl Services {
    /// Hosted REST and storage endpoints; the change feed comes from the host
    pub fn hosted(config: SupabaseConfig, feed: Rc<dyn ChangeFeed>) -> Self {
        let rest = Rc::new(PostgrestGateway::new(config.clone()));
        Self {
            clients: rest.clone(),
            proposals: rest.clone(),
            profiles: rest,
            feed,
            storage: Rc::new(SupabaseStorage::new(config)),
        }
    }

    /// Everything backed by one in-process store
    pub fn in_memory(backend: &MemoryBackend) -> Self {
        Self {
            clients: Rc::new(backend.clone()),
            proposals: Rc::new(backend.clone()),
            profiles: Rc::new(backend.clone()),
            feed: Rc::new(backend.clone()),
            storage: Rc::new(backend.clone()),
        }
    }

    pub fn clients_hook(&self) -> ClientsHook {
        CollectionHook::<Client>::new(self.clients.clone(), self.feed.clone())
    }

    pub fn proposals_hook(&self) -> ProposalsHook {
        CollectionHook::<ProposalWithClient>::new(self.proposals.clone(), self.feed.clone())
    }

    pub fn profile_hook(&self) -> ProfileHook {
        ProfileHook::new(self.profiles.clone(), self.storage.clone())
    }
}

pub struct Session {
    services: Services,
    auth: AuthHandle,
}

impl Session {
    /// Starts signed out
    pub fn new(services: Services) -> Self {
        let (auth, _) = auth_channel();
        Self { services, auth }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Publishing side, for the host's auth listener
    pub fn auth(&self) -> &AuthHandle {
        &self.auth
    }

    pub fn watch(&self) -> AuthWatch {
        self.auth.watch()
    }

    pub fn sign_in(&self, session: AuthSession) {
        self.auth.sign_in(session);
    }

    pub fn sign_out(&self) {
        self.auth.sign_out();
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.auth.current().map(|session| session.user)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.auth.sign_out();
    }
}
