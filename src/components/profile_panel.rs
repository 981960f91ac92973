//! Profile Panel Component
//!
//! The signed-in user's card: avatar upload, profile editing and sign-out.

use crm_sync::auth::PasswordAuth;
use crm_sync::form::{FormController, ProfileForm, ProfileValues, Submission};
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlInputElement;

use super::FormField;
use crate::context::use_app_context;
use crate::store::{use_app_store, AppStateStoreFields};

/// File picked in `input`, read into memory
async fn read_file(input: &HtmlInputElement) -> Option<(String, Vec<u8>, String)> {
    let file = input.files()?.get(0)?;
    let buffer = JsFuture::from(file.array_buffer()).await.ok()?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    Some((file.name(), bytes, file.type_()))
}

#[component]
pub fn ProfilePanel() -> impl IntoView {
    let ctx = use_app_context();
    let store = use_app_store();
    let form = RwSignal::new(FormController::<ProfileForm>::new());
    let (editing, set_editing) = signal(false);

    let profile_ctx = ctx.clone();
    let on_avatar = move |ev: web_sys::Event| {
        let Some(input) = ev.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) else {
            return;
        };
        let profile = profile_ctx.profile.clone();
        spawn_local(async move {
            let Some((file_name, bytes, content_type)) = read_file(&input).await else {
                return;
            };
            if let Err(err) = profile.upload_avatar(file_name, bytes, content_type).await {
                web_sys::console::log_1(&format!("[PROFILE] Avatar upload failed: {}", err).into());
            }
            input.set_value("");
        });
    };

    let submit_ctx = ctx.clone();
    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some(Ok(submission)) = form.try_update(FormController::begin_submit) else {
            return;
        };
        let patch = match submission {
            Submission::Create(patch) | Submission::Update { payload: patch, .. } => patch,
        };
        let profile = submit_ctx.profile.clone();
        spawn_local(async move {
            let result = profile.update(patch).await;
            let saved = result.is_ok();
            form.update(|f| f.finish_submit(&result));
            if saved {
                set_editing.set(false);
            }
        });
    };

    let start_edit = move |_: web_sys::MouseEvent| {
        let current = store.profile().read().profile.clone();
        form.update(|f| f.edit(current.as_ref()));
        set_editing.set(true);
    };

    let on_sign_out = move |_: web_sys::MouseEvent| {
        let auth = ctx.auth.clone();
        let config = ctx.config.clone();
        spawn_local(async move {
            if let (Some(config), Some(session)) = (config, auth.current()) {
                if let Err(err) = PasswordAuth::new(config).sign_out(&session).await {
                    web_sys::console::log_1(&format!("[AUTH] Sign-out request failed: {}", err).into());
                }
            }
            auth.sign_out();
        });
    };

    let display_name = move || {
        let state = store.profile().read();
        let from_profile = state.profile.as_ref().and_then(|p| p.full_name.clone());
        from_profile
            .or_else(|| store.user().read().as_ref().map(|user| user.email.clone()))
            .unwrap_or_default()
    };

    let text_field = move |label: &'static str, key: &'static str, get: fn(&ProfileValues) -> &String, set: fn(&mut ProfileValues, String)| {
        view! {
            <FormField
                label=label
                value=Signal::derive(move || form.with(|f| get(f.values()).clone()))
                on_input=move |text: String| form.update(|f| set(f.values_mut(), text))
                error=Signal::derive(move || form.with(|f| f.field_error(key).map(str::to_string)))
            />
        }
    };

    view! {
        <div class="profile-panel">
            {move || store.profile().read().profile.as_ref().and_then(|p| p.avatar_url.clone()).map(|url| view! {
                <img class="avatar" src=url alt="Avatar" />
            })}
            <span class="profile-name">{display_name}</span>
            <Show when=move || store.profile().read().saving>
                <span class="saving">"Salvando..."</span>
            </Show>
            {move || store.profile().read().error.clone().map(|message| view! {
                <p class="load-error">{message}</p>
            })}
            <label class="avatar-upload">
                "Trocar foto"
                <input type="file" accept="image/*" on:change=on_avatar />
            </label>
            <Show
                when=move || editing.get()
                fallback=move || view! { <button class="edit-btn" on:click=start_edit>"Editar perfil"</button> }
            >
                <form class="profile-form" on:submit=on_submit.clone()>
                    {text_field("Nome", "full_name", |v| &v.full_name, |v, text| v.full_name = text)}
                    {text_field("Empresa", "company", |v| &v.company, |v, text| v.company = text)}
                    {text_field("Telefone", "phone", |v| &v.phone, |v, text| v.phone = text)}
                    {text_field("Site", "website", |v| &v.website, |v, text| v.website = text)}
                    {text_field("Bio", "bio", |v| &v.bio, |v, text| v.bio = text)}
                    {move || form.with(|f| f.top_error().map(str::to_string)).map(|message| view! {
                        <p class="form-error">{message}</p>
                    })}
                    <button type="submit" disabled=move || form.with(|f| f.is_submitting())>"Salvar"</button>
                    <button type="button" on:click=move |_| set_editing.set(false)>"Cancelar"</button>
                </form>
            </Show>
            <button class="sign-out-btn" on:click=on_sign_out>"Sair"</button>
        </div>
    }
}
