//! Client List Component
//!
//! Searchable client table with inline edit and delete.

use crm_sync::domain::Client;
use crm_sync::form::FormController;
use crm_sync::view::filter;
use leptos::prelude::*;
use leptos::task::spawn_local;

use super::client_form::ClientFormState;
use super::{ClientFormPanel, DeleteConfirmButton};
use crate::context::use_app_context;
use crate::store::{use_app_store, AppStateStoreFields};

#[component]
pub fn ClientList() -> impl IntoView {
    let store = use_app_store();
    let ctx = use_app_context();
    let form: ClientFormState = RwSignal::new(FormController::new());

    let retry = Callback::new(move |_: ()| {
        let clients = ctx.clients.clone();
        spawn_local(async move {
            // failures land in the published load status
            let _ = clients.refetch().await;
        });
    });

    let visible = move || {
        let term = store.search().get();
        let clients = store.clients().read();
        let visible: Vec<Client> = filter(&clients, &term).into_iter().cloned().collect();
        visible
    };

    view! {
        <section class="client-list">
            <header class="section-header">
                <h2>"Clientes"</h2>
                <input
                    type="search"
                    class="search-input"
                    placeholder="Buscar por nome, email ou empresa..."
                    prop:value=move || store.search().get()
                    on:input=move |ev| store.search().set(event_target_value(&ev))
                />
            </header>
            <Show when=move || store.clients_status().read().loading>
                <p class="loading">"Carregando clientes..."</p>
            </Show>
            {move || store.clients_status().read().error.clone().map(|message| view! {
                <p class="load-error">
                    {message}
                    <button class="retry-btn" on:click=move |_| retry.run(())>"Tentar novamente"</button>
                </p>
            })}
            <table class="clients">
                <thead>
                    <tr>
                        <th>"Nome"</th>
                        <th>"Email"</th>
                        <th>"Empresa"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    <For
                        each=visible
                        key=|client| (client.id.clone(), client.name.clone(), client.email.clone(), client.company.clone())
                        children=move |client| view! { <ClientRow client=client form=form /> }
                    />
                </tbody>
            </table>
            <ClientFormPanel form=form />
        </section>
    }
}

#[component]
fn ClientRow(client: Client, form: ClientFormState) -> impl IntoView {
    let ctx = use_app_context();
    let id = client.id.clone();
    let name = client.name.clone();
    let email = client.email.clone();
    let company = client.company.clone().unwrap_or_default();

    let on_delete = move |_: ()| {
        let clients = ctx.clients.clone();
        let id = id.clone();
        spawn_local(async move {
            if let Err(err) = clients.delete(id).await {
                web_sys::console::log_1(&format!("[CLIENTS] Delete failed: {}", err).into());
            }
        });
    };

    view! {
        <tr class="client-row">
            <td>{name}</td>
            <td>{email}</td>
            <td>{company}</td>
            <td class="row-actions">
                <button class="edit-btn" on:click=move |_| form.update(|f| f.edit(Some(&client)))>
                    "Editar"
                </button>
                <DeleteConfirmButton button_class="delete-btn" on_confirm=on_delete />
            </td>
        </tr>
    }
}
