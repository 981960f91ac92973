//! FreelCRM Frontend App
//!
//! Builds the session, starts one driver per hook and lays out the dashboard.

use std::rc::Rc;
use std::time::Duration;

use crm_sync::auth::{AuthHandle, AuthSession, AuthWatch, PasswordAuth};
use crm_sync::config::SupabaseConfig;
use crm_sync::gateway::MemoryBackend;
use crm_sync::session::{Services, Session};
use crm_sync::SyncError;
use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use leptos::task::spawn_local;
use reactive_stores::Store;

use crate::components::{ClientList, Dashboard, ProfilePanel, ProposalBoard, SignInForm};
use crate::context::AppContext;
use crate::hooks::{spawn_hook, spawn_profile_hook};
use crate::store::{
    store_set_clients, store_set_profile, store_set_proposals, store_set_user, AppState,
    AppStateStoreFields, AppStore,
};
use crate::supabase::JsChangeFeed;

/// Hosted project baked in at build time, if any
fn hosted_config() -> Option<SupabaseConfig> {
    let url = option_env!("SUPABASE_URL")?;
    let key = option_env!("SUPABASE_ANON_KEY")?;
    match SupabaseConfig::new(url, key) {
        Ok(config) => Some(config),
        Err(err) => {
            web_sys::console::log_1(&format!("[APP] Invalid hosted config: {}", err).into());
            None
        }
    }
}

fn build_session(config: Option<&SupabaseConfig>) -> Session {
    match config {
        Some(config) => {
            let feed = Rc::new(JsChangeFeed::new(config));
            let session = Session::new(Services::hosted(config.clone(), feed.clone()));
            feed.follow_auth(session.watch());
            keep_session_fresh(PasswordAuth::new(config.clone()), session.auth().clone());
            session
        }
        None => {
            web_sys::console::log_1(&"[APP] No hosted project configured, using local data".into());
            Session::new(Services::in_memory(&MemoryBackend::new()))
        }
    }
}

/// Wait before retrying a renewal that failed in transit
const RETRY_REFRESH: Duration = Duration::from_secs(30);

fn sleep(delay: Duration) -> TimeoutFuture {
    TimeoutFuture::new(u32::try_from(delay.as_millis()).unwrap_or(u32::MAX))
}

enum RefreshStep {
    Identity(Option<Option<AuthSession>>),
    Due,
}

/// Renew the access token shortly before it expires, for as long as the
/// session lasts. A rejected refresh token signs the user out.
fn keep_session_fresh(client: PasswordAuth, auth: AuthHandle) {
    spawn_local(async move {
        let mut watch = auth.watch();
        let mut current = watch.current();
        loop {
            let delay = current.as_ref().and_then(AuthSession::refresh_delay);
            let step = match delay {
                Some(delay) => tokio::select! {
                    biased;
                    identity = watch.changed() => RefreshStep::Identity(identity),
                    _ = sleep(delay) => RefreshStep::Due,
                },
                None => RefreshStep::Identity(watch.changed().await),
            };

            match step {
                RefreshStep::Identity(Some(next)) => current = next,
                RefreshStep::Identity(None) => break,
                RefreshStep::Due => {
                    let Some(session) = current.clone() else {
                        continue;
                    };
                    match client.refresh(&session).await {
                        // The watch reports the renewed session next
                        Ok(renewed) => auth.refresh_token(&renewed),
                        Err(SyncError::Unauthenticated) => {
                            web_sys::console::log_1(&"[AUTH] Session expired, signing out".into());
                            auth.sign_out();
                        }
                        Err(err) => {
                            web_sys::console::log_1(&format!("[AUTH] Token refresh failed: {}", err).into());
                            sleep(RETRY_REFRESH).await;
                        }
                    }
                }
            }
        }
    });
}

fn follow_user(store: AppStore, mut auth: AuthWatch) {
    spawn_local(async move {
        let mut current = auth.current();
        loop {
            store_set_user(&store, current.map(|session| session.user));
            match auth.changed().await {
                Some(next) => current = next,
                None => break,
            }
        }
    });
}

#[component]
pub fn App() -> impl IntoView {
    let store = Store::new(AppState::default());
    provide_context(store);

    let config = hosted_config();
    let session = build_session(config.as_ref());
    let services = session.services().clone();

    let clients = spawn_hook(services.clients_hook(), session.watch(), move |state| {
        store_set_clients(&store, state)
    });
    let proposals = spawn_hook(services.proposals_hook(), session.watch(), move |state| {
        store_set_proposals(&store, state)
    });
    let profile = spawn_profile_hook(services.profile_hook(), session.watch(), move |state| {
        store_set_profile(&store, state)
    });
    follow_user(store, session.watch());

    let ctx = AppContext {
        clients,
        proposals,
        profile,
        auth: session.auth().clone(),
        config,
    };
    provide_context(ctx.clone());

    // Dropping the session signs out, so it lives as long as the app
    let session = StoredValue::new_local(session);
    on_cleanup(move || {
        ctx.clients.close();
        ctx.proposals.close();
        ctx.profile.close();
        session.with_value(Session::sign_out);
    });

    let signed_in = move || store.user().read().is_some();

    view! {
        <div class="app-layout">
            <Show when=signed_in fallback=|| view! { <SignInForm /> }>
                <aside class="sidebar">
                    <ProfilePanel />
                </aside>
                <main class="main-content">
                    <h1>"FreelCRM"</h1>
                    <Dashboard />
                    <ProposalBoard />
                    <ClientList />
                </main>
            </Show>
        </div>
    }
}
