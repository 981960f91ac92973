//! Hook drivers
//!
//! One task owns a hook and is the only thing that touches it. Commands from
//! the view, identity changes and channel events are handled one at a time,
//! and a fresh state is published after each.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::collection::CollectionHook;
use super::profile::{ProfileHook, ProfileState};
use super::HookState;
use crate::auth::{AuthSession, AuthWatch};
use crate::domain::{Entity, Profile, ProfilePatch};
use crate::error::SyncResult;
use crate::realtime::ChangeEvent;

/// Where the outcome of a command is sent
pub type Reply<T> = oneshot::Sender<SyncResult<T>>;

/// Edit function for an optimistic update
pub type Apply<T> = Box<dyn FnOnce(&mut T) + Send>;

pub enum HookCommand<T: Entity> {
    Refetch {
        reply: Option<Reply<()>>,
    },
    Create {
        new: T::New,
        reply: Option<Reply<T>>,
    },
    Update {
        id: String,
        patch: T::Patch,
        reply: Option<Reply<T>>,
    },
    Delete {
        id: String,
        reply: Option<Reply<()>>,
    },
    /// Show `apply`'d entity now, roll back if the remote update fails
    UpdateOptimistic {
        id: String,
        patch: T::Patch,
        apply: Apply<T>,
        reply: Option<Reply<T>>,
    },
    Close,
}

fn respond<R>(reply: Option<Reply<R>>, result: SyncResult<R>) {
    if let Some(reply) = reply {
        // The caller may have stopped waiting
        let _ = reply.send(result);
    }
}

enum Step<C> {
    Identity(Option<Option<AuthSession>>),
    Command(Option<C>),
    Event(Option<ChangeEvent>),
}

impl<T: Entity> CollectionHook<T> {
    async fn execute(&mut self, command: HookCommand<T>) {
        match command {
            HookCommand::Refetch { reply } => respond(reply, self.refetch().await),
            HookCommand::Create { new, reply } => respond(reply, self.create(new).await),
            HookCommand::Update { id, patch, reply } => {
                respond(reply, self.update(&id, patch).await)
            }
            HookCommand::Delete { id, reply } => respond(reply, self.delete(&id).await),
            HookCommand::UpdateOptimistic {
                id,
                patch,
                apply,
                reply,
            } => respond(reply, self.update_optimistic(&id, patch, apply).await),
            HookCommand::Close => {}
        }
    }
}

/// Drive a collection hook until `Close` or until every command sender is gone
///
/// The channel is released on exit.
pub async fn run_hook<T: Entity>(
    mut hook: CollectionHook<T>,
    mut commands: UnboundedReceiver<HookCommand<T>>,
    mut auth: AuthWatch,
    publish: impl Fn(HookState<T>),
) {
    let identity = auth.current();
    hook.set_user(identity.as_ref()).await;
    publish(hook.state());

    let mut auth_open = true;
    loop {
        let step = tokio::select! {
            biased;
            identity = auth.changed(), if auth_open => Step::Identity(identity),
            command = commands.recv() => Step::Command(command),
            event = hook.next_event() => Step::Event(event),
        };

        match step {
            Step::Identity(Some(identity)) => hook.set_user(identity.as_ref()).await,
            Step::Identity(None) => {
                debug!(table = T::TABLE, "auth source gone, keeping current user");
                auth_open = false;
                continue;
            }
            Step::Command(None) | Step::Command(Some(HookCommand::Close)) => break,
            Step::Command(Some(command)) => hook.execute(command).await,
            Step::Event(Some(event)) => {
                hook.apply_event(event).await;
            }
            Step::Event(None) => hook.release_channel(),
        }
        publish(hook.state());
    }

    hook.release_channel();
    info!(table = T::TABLE, "hook stopped");
}

pub enum ProfileCommand {
    Refetch {
        reply: Option<Reply<Profile>>,
    },
    Update {
        patch: ProfilePatch,
        reply: Option<Reply<Profile>>,
    },
    UploadAvatar {
        file_name: String,
        bytes: Vec<u8>,
        content_type: String,
        reply: Option<Reply<String>>,
    },
    Close,
}

/// Drive a profile hook; same contract as `run_hook`
pub async fn run_profile_hook(
    mut hook: ProfileHook,
    mut commands: UnboundedReceiver<ProfileCommand>,
    mut auth: AuthWatch,
    publish: impl Fn(ProfileState),
) {
    let identity = auth.current();
    hook.set_user(identity.as_ref()).await;
    publish(hook.state());

    let mut auth_open = true;
    loop {
        let step: Step<ProfileCommand> = tokio::select! {
            biased;
            identity = auth.changed(), if auth_open => Step::Identity(identity),
            command = commands.recv() => Step::Command(command),
        };

        match step {
            Step::Identity(Some(identity)) => hook.set_user(identity.as_ref()).await,
            Step::Identity(None) => {
                auth_open = false;
                continue;
            }
            Step::Command(None) | Step::Command(Some(ProfileCommand::Close)) => break,
            Step::Command(Some(ProfileCommand::Refetch { reply })) => {
                respond(reply, hook.refetch().await)
            }
            Step::Command(Some(ProfileCommand::Update { patch, reply })) => {
                respond(reply, hook.update(&patch).await)
            }
            Step::Command(Some(ProfileCommand::UploadAvatar {
                file_name,
                bytes,
                content_type,
                reply,
            })) => respond(
                reply,
                hook.upload_avatar(&file_name, bytes, &content_type).await,
            ),
            Step::Event(_) => {}
        }
        publish(hook.state());
    }
    info!("profile hook stopped");
}
