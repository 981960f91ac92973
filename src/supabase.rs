//! Hosted Realtime Bindings
//!
//! The change feed rides on the browser `supabase-js` client
//! (`window.supabase`). Each channel forwards `postgres_changes` payloads
//! into the subscription's queue.

use crm_sync::auth::AuthWatch;
use crm_sync::config::SupabaseConfig;
use crm_sync::realtime::{ChangeEvent, ChangeFeed, ChannelKey, Subscription};
use crm_sync::{SyncError, SyncResult};
use leptos::task::spawn_local;
use serde::Serialize;
use tokio::sync::mpsc::unbounded_channel;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[derive(Clone)]
    pub type SupabaseClient;

    #[derive(Clone)]
    type RealtimeChannel;

    type RealtimeClient;

    #[wasm_bindgen(js_namespace = ["window", "supabase"], js_name = createClient)]
    fn create_client(url: &str, key: &str) -> SupabaseClient;

    #[wasm_bindgen(method)]
    fn channel(this: &SupabaseClient, name: &str) -> RealtimeChannel;

    #[wasm_bindgen(method, js_name = removeChannel)]
    fn remove_channel(this: &SupabaseClient, channel: &RealtimeChannel) -> js_sys::Promise;

    #[wasm_bindgen(method, getter)]
    fn realtime(this: &SupabaseClient) -> RealtimeClient;

    #[wasm_bindgen(method, js_name = setAuth)]
    fn set_auth(this: &RealtimeClient, token: Option<String>);

    #[wasm_bindgen(method)]
    fn on(
        this: &RealtimeChannel,
        kind: &str,
        filter: &JsValue,
        callback: &Closure<dyn FnMut(JsValue)>,
    ) -> RealtimeChannel;

    #[wasm_bindgen(method)]
    fn subscribe(this: &RealtimeChannel) -> RealtimeChannel;
}

#[derive(Serialize)]
struct ChangeFilter<'a> {
    event: &'a str,
    schema: &'a str,
    table: &'a str,
    filter: String,
}

/// Change feed backed by `supabase-js` realtime channels
pub struct JsChangeFeed {
    client: SupabaseClient,
    schema: String,
}

impl JsChangeFeed {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: create_client(&config.url, &config.anon_key),
            schema: config.schema.clone(),
        }
    }

    /// Keep the realtime socket on the signed-in user's token
    pub fn follow_auth(&self, mut auth: AuthWatch) {
        let realtime = self.client.realtime();
        spawn_local(async move {
            let mut current = auth.current();
            loop {
                let token = current.and_then(|session| session.access_token);
                realtime.set_auth(token);
                match auth.changed().await {
                    Some(next) => current = next,
                    None => break,
                }
            }
        });
    }
}

impl ChangeFeed for JsChangeFeed {
    fn subscribe(&self, key: &ChannelKey) -> SyncResult<Subscription> {
        let filter = ChangeFilter {
            event: "*",
            schema: &self.schema,
            table: key.table,
            filter: key.filter(),
        };
        let filter = serde_wasm_bindgen::to_value(&filter)
            .map_err(|err| SyncError::config(err.to_string()))?;

        let (events, queue) = unbounded_channel();
        let name = key.channel_name();
        let on_change = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
            match serde_wasm_bindgen::from_value::<ChangeEvent>(payload) {
                Ok(event) => {
                    let _ = events.send(event);
                }
                Err(err) => web_sys::console::log_1(
                    &format!("[REALTIME] Dropped unreadable payload on {}: {}", name, err).into(),
                ),
            }
        });

        let channel = self
            .client
            .channel(&key.channel_name())
            .on("postgres_changes", &filter, &on_change)
            .subscribe();

        let client = self.client.clone();
        Ok(Subscription::new(key.clone(), queue, move || {
            let leaving = JsFuture::from(client.remove_channel(&channel));
            // The callback must outlive the leave handshake
            spawn_local(async move {
                if let Err(err) = leaving.await {
                    web_sys::console::log_1(&format!("[REALTIME] Channel leave failed: {:?}", err).into());
                }
                drop(on_change);
            });
        }))
    }
}
