//! Client Form Component
//!
//! Create/edit form for clients. The controller lives in the parent so a
//! row's edit button can load it.

use crm_sync::domain::ClientPatch;
use crm_sync::form::{ClientForm, ClientValues, FormController, Submission};
use leptos::prelude::*;
use leptos::task::spawn_local;

use super::FormField;
use crate::context::use_app_context;

pub type ClientFormState = RwSignal<FormController<ClientForm>>;

#[component]
pub fn ClientFormPanel(form: ClientFormState) -> impl IntoView {
    let ctx = use_app_context();

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some(Ok(submission)) = form.try_update(FormController::begin_submit) else {
            return;
        };
        let clients = ctx.clients.clone();
        spawn_local(async move {
            let result = match submission {
                Submission::Create(new) => clients.create(new).await,
                Submission::Update { id, payload } => {
                    clients.update(id, ClientPatch::from(payload)).await
                }
            };
            form.update(|f| f.finish_submit(&result));
        });
    };

    let field = move |label: &'static str, key: &'static str, get: fn(&ClientValues) -> &String, set: fn(&mut ClientValues, String)| {
        view! {
            <FormField
                label=label
                kind=if key == "email" { "email" } else { "text" }
                value=Signal::derive(move || form.with(|f| get(f.values()).clone()))
                on_input=move |text: String| form.update(|f| set(f.values_mut(), text))
                error=Signal::derive(move || form.with(|f| f.field_error(key).map(str::to_string)))
            />
        }
    };

    view! {
        <form class="client-form" on:submit=on_submit>
            <h3>
                {move || if form.with(|f| f.editing().is_some()) { "Editar cliente" } else { "Novo cliente" }}
            </h3>
            {field("Nome", "name", |v| &v.name, |v, text| v.name = text)}
            {field("Email", "email", |v| &v.email, |v, text| v.email = text)}
            {field("Telefone", "phone", |v| &v.phone, |v, text| v.phone = text)}
            {field("Empresa", "company", |v| &v.company, |v, text| v.company = text)}
            {field("Notas", "notes", |v| &v.notes, |v, text| v.notes = text)}
            {move || form.with(|f| f.top_error().map(str::to_string)).map(|message| view! {
                <p class="form-error">{message}</p>
            })}
            <div class="form-actions">
                <button type="submit" disabled=move || form.with(|f| f.is_submitting())>
                    "Salvar"
                </button>
                <Show when=move || form.with(|f| f.editing().is_some())>
                    <button type="button" on:click=move |_| form.update(|f| f.edit(None))>
                        "Cancelar"
                    </button>
                </Show>
            </div>
        </form>
    }
}
