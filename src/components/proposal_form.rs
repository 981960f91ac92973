//! New Proposal Form Component

use crm_sync::domain::{ProposalPatch, ProposalStatus};
use crm_sync::form::{FormController, ProposalForm, ProposalValues, Submission};
use leptos::prelude::*;
use leptos::task::spawn_local;

use super::FormField;
use crate::context::use_app_context;
use crate::store::{use_app_store, AppStateStoreFields};

#[component]
pub fn ProposalFormPanel() -> impl IntoView {
    let ctx = use_app_context();
    let store = use_app_store();
    let form = RwSignal::new(FormController::<ProposalForm>::new());

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some(Ok(submission)) = form.try_update(FormController::begin_submit) else {
            return;
        };
        let proposals = ctx.proposals.clone();
        spawn_local(async move {
            let result = match submission {
                Submission::Create(new) => proposals.create(new).await,
                Submission::Update { id, payload } => {
                    proposals.update(id, ProposalPatch::from(payload)).await
                }
            };
            form.update(|f| f.finish_submit(&result));
        });
    };

    let text_field = move |label: &'static str, key: &'static str, get: fn(&ProposalValues) -> &String, set: fn(&mut ProposalValues, String)| {
        view! {
            <FormField
                label=label
                value=Signal::derive(move || form.with(|f| get(f.values()).clone()))
                on_input=move |text: String| form.update(|f| set(f.values_mut(), text))
                error=Signal::derive(move || form.with(|f| f.field_error(key).map(str::to_string)))
            />
        }
    };
    let field_error = move |key: &'static str| {
        move || form.with(|f| f.field_error(key).map(str::to_string)).map(|message| view! {
            <span class="field-error">{message}</span>
        })
    };

    view! {
        <form class="proposal-form" on:submit=on_submit>
            <h3>"Nova proposta"</h3>
            {text_field("Título", "title", |v| &v.title, |v, text| v.title = text)}
            {text_field("Valor (R$)", "amount", |v| &v.amount, |v, text| v.amount = text)}
            <label class="form-field">
                <span class="form-label">"Cliente"</span>
                <select
                    prop:value=move || form.with(|f| f.values().client_id.clone())
                    on:change=move |ev| form.update(|f| f.values_mut().client_id = event_target_value(&ev))
                >
                    <option value="">"Selecione um cliente"</option>
                    {move || store.clients().read().iter().map(|client| view! {
                        <option value=client.id.clone()>{client.name.clone()}</option>
                    }).collect_view()}
                </select>
                {field_error("client_id")}
            </label>
            <label class="form-field">
                <span class="form-label">"Status"</span>
                <select
                    prop:value=move || form.with(|f| f.values().status.clone())
                    on:change=move |ev| form.update(|f| f.values_mut().status = event_target_value(&ev))
                >
                    {ProposalStatus::ALL.into_iter().map(|status| view! {
                        <option value=status.as_str()>{status.as_str()}</option>
                    }).collect_view()}
                </select>
                {field_error("status")}
            </label>
            {move || form.with(|f| f.top_error().map(str::to_string)).map(|message| view! {
                <p class="form-error">{message}</p>
            })}
            <button type="submit" disabled=move || form.with(|f| f.is_submitting())>
                "Criar proposta"
            </button>
        </form>
    }
}
