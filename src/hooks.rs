//! Hook Handles
//!
//! Each hook runs in its own local task (`run_hook`) and owns its store.
//! Components talk to it through a cloneable handle that queues commands and
//! awaits the reply.

use crm_sync::auth::AuthWatch;
use crm_sync::domain::{Entity, ProfilePatch, Profile};
use crm_sync::hook::{
    run_hook, run_profile_hook, CollectionHook, HookCommand, HookState, ProfileCommand,
    ProfileHook, ProfileState, Reply,
};
use crm_sync::{SyncError, SyncResult};
use leptos::task::spawn_local;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::oneshot;

fn stopped() -> SyncError {
    SyncError::mutation("Sincronização encerrada")
}

async fn ask<R>(send: impl FnOnce(Reply<R>) -> bool) -> SyncResult<R> {
    let (reply, outcome) = oneshot::channel();
    if !send(reply) {
        return Err(stopped());
    }
    outcome.await.unwrap_or_else(|_| Err(stopped()))
}

// ========================
// Collections
// ========================

pub struct HookHandle<T: Entity> {
    commands: UnboundedSender<HookCommand<T>>,
}

impl<T: Entity> Clone for HookHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<T: Entity> HookHandle<T> {
    fn send(&self, command: HookCommand<T>) -> bool {
        self.commands.send(command).is_ok()
    }

    pub async fn refetch(&self) -> SyncResult<()> {
        ask(|reply| self.send(HookCommand::Refetch { reply: Some(reply) })).await
    }

    pub async fn create(&self, new: T::New) -> SyncResult<T> {
        ask(|reply| self.send(HookCommand::Create { new, reply: Some(reply) })).await
    }

    pub async fn update(&self, id: String, patch: T::Patch) -> SyncResult<T> {
        ask(|reply| {
            self.send(HookCommand::Update {
                id,
                patch,
                reply: Some(reply),
            })
        })
        .await
    }

    pub async fn delete(&self, id: String) -> SyncResult<()> {
        ask(|reply| self.send(HookCommand::Delete { id, reply: Some(reply) })).await
    }

    /// Show `apply`'d row at once; the driver rolls it back on failure
    pub async fn update_optimistic(
        &self,
        id: String,
        patch: T::Patch,
        apply: impl FnOnce(&mut T) + Send + 'static,
    ) -> SyncResult<T> {
        ask(|reply| {
            self.send(HookCommand::UpdateOptimistic {
                id,
                patch,
                apply: Box::new(apply),
                reply: Some(reply),
            })
        })
        .await
    }

    pub fn close(&self) {
        self.send(HookCommand::Close);
    }
}

/// Start a driver for `hook`, publishing every state through `publish`
pub fn spawn_hook<T: Entity>(
    hook: CollectionHook<T>,
    auth: AuthWatch,
    publish: impl Fn(HookState<T>) + 'static,
) -> HookHandle<T> {
    let (commands, queue) = unbounded_channel();
    spawn_local(run_hook(hook, queue, auth, publish));
    HookHandle { commands }
}

// ========================
// Profile
// ========================

#[derive(Clone)]
pub struct ProfileHandle {
    commands: UnboundedSender<ProfileCommand>,
}

impl ProfileHandle {
    fn send(&self, command: ProfileCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn close(&self) {
        self.send(ProfileCommand::Close);
    }

    pub async fn update(&self, patch: ProfilePatch) -> SyncResult<Profile> {
        ask(|reply| self.send(ProfileCommand::Update { patch, reply: Some(reply) })).await
    }

    pub async fn upload_avatar(
        &self,
        file_name: String,
        bytes: Vec<u8>,
        content_type: String,
    ) -> SyncResult<String> {
        ask(|reply| {
            self.send(ProfileCommand::UploadAvatar {
                file_name,
                bytes,
                content_type,
                reply: Some(reply),
            })
        })
        .await
    }
}

pub fn spawn_profile_hook(
    hook: ProfileHook,
    auth: AuthWatch,
    publish: impl Fn(ProfileState) + 'static,
) -> ProfileHandle {
    let (commands, queue) = unbounded_channel();
    spawn_local(run_profile_hook(hook, queue, auth, publish));
    ProfileHandle { commands }
}
