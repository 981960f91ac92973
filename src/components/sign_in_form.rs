//! Sign-In Form Component
//!
//! Email + password. With a hosted project the credentials go to the auth
//! endpoint; on local data any valid pair opens a session for that email.

use crm_sync::auth::{AuthSession, PasswordAuth};
use crm_sync::domain::AuthUser;
use crm_sync::form::{FormController, SignInForm as SignInSchema, Submission};
use crm_sync::SyncResult;
use leptos::prelude::*;
use leptos::task::spawn_local;

use super::FormField;
use crate::context::use_app_context;

#[component]
pub fn SignInForm() -> impl IntoView {
    let ctx = use_app_context();
    let form = RwSignal::new(FormController::<SignInSchema>::new());

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some(Ok(submission)) = form.try_update(FormController::begin_submit) else {
            return;
        };
        let credentials = match submission {
            Submission::Create(credentials) | Submission::Update { payload: credentials, .. } => {
                credentials
            }
        };
        let config = ctx.config.clone();
        let auth = ctx.auth.clone();
        spawn_local(async move {
            let result: SyncResult<AuthSession> = match config {
                Some(config) => {
                    PasswordAuth::new(config)
                        .sign_in(&credentials.email, &credentials.password)
                        .await
                }
                None => {
                    let id = format!("local-{}", credentials.email);
                    Ok(AuthSession::new(AuthUser::new(id, credentials.email.clone())))
                }
            };
            form.update(|f| f.finish_submit(&result));
            if let Ok(session) = result {
                web_sys::console::log_1(&format!("[AUTH] Signed in as {}", session.user.email).into());
                auth.sign_in(session);
            }
        });
    };

    view! {
        <form class="sign-in-form" on:submit=on_submit>
            <h2>"Entrar"</h2>
            <FormField
                label="Email"
                kind="email"
                value=Signal::derive(move || form.with(|f| f.values().email.clone()))
                on_input=move |text: String| form.update(|f| f.values_mut().email = text)
                error=Signal::derive(move || form.with(|f| f.field_error("email").map(str::to_string)))
            />
            <FormField
                label="Senha"
                kind="password"
                value=Signal::derive(move || form.with(|f| f.values().password.clone()))
                on_input=move |text: String| form.update(|f| f.values_mut().password = text)
                error=Signal::derive(move || form.with(|f| f.field_error("password").map(str::to_string)))
            />
            {move || form.with(|f| f.top_error().map(str::to_string)).map(|message| view! {
                <p class="form-error">{message}</p>
            })}
            <button type="submit" disabled=move || form.with(|f| f.is_submitting())>
                "Entrar"
            </button>
        </form>
    }
}
