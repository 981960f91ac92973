//! Proposal Board Component
//!
//! Three status columns. Dropping a card on a column, or on a card in
//! another column, moves the proposal there; the card moves at once and
//! snaps back if the update is rejected.

use crm_sync::domain::{ProposalPatch, ProposalStatus, ProposalWithClient};
use crm_sync::view::{filter, group_by_status, resolve_drop, DropTarget};
use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::DragEvent;

use super::{DeleteConfirmButton, ProposalFormPanel};
use crate::context::use_app_context;
use crate::store::{use_app_store, AppStateStoreFields};

#[component]
pub fn ProposalBoard() -> impl IntoView {
    let store = use_app_store();
    let ctx = use_app_context();
    let (dragging, set_dragging) = signal::<Option<String>>(None);

    let on_drop = Callback::new(move |raw: String| {
        let Some(dragged) = dragging.get_untracked() else {
            return;
        };
        set_dragging.set(None);
        let Some(target) = DropTarget::parse(&raw) else {
            return;
        };
        let status = {
            let snapshot = store.proposals().read_untracked();
            resolve_drop(&snapshot, &dragged, &target)
        };
        let Some(status) = status else {
            return;
        };
        let proposals = ctx.proposals.clone();
        spawn_local(async move {
            let moved = proposals
                .update_optimistic(
                    dragged,
                    ProposalPatch::status(status),
                    move |proposal: &mut ProposalWithClient| proposal.proposal.status = status,
                )
                .await;
            if let Err(err) = moved {
                web_sys::console::log_1(&format!("[BOARD] Move rejected: {}", err).into());
            }
        });
    });

    let columns = move || {
        let term = store.search().get();
        let proposals = store.proposals().read();
        let visible: Vec<ProposalWithClient> =
            filter(&proposals, &term).into_iter().cloned().collect();
        let board = group_by_status(&visible);
        let columns: Vec<(ProposalStatus, Vec<ProposalWithClient>)> = board
            .iter()
            .map(|(status, cards)| (status, cards.to_vec()))
            .collect();
        columns
    };

    view! {
        <section class="proposal-board">
            <header class="section-header">
                <h2>"Propostas"</h2>
            </header>
            <Show when=move || store.proposals_status().read().loading>
                <p class="loading">"Carregando propostas..."</p>
            </Show>
            {move || store.proposals_status().read().error.clone().map(|message| view! {
                <p class="load-error">{message}</p>
            })}
            <div class="board-columns">
                {move || columns().into_iter().map(|(status, cards)| view! {
                    <StatusColumn
                        status=status
                        cards=cards
                        dragging=dragging
                        set_dragging=set_dragging
                        on_drop=on_drop
                    />
                }).collect_view()}
            </div>
            <ProposalFormPanel />
        </section>
    }
}

#[component]
fn StatusColumn(
    status: ProposalStatus,
    cards: Vec<ProposalWithClient>,
    dragging: ReadSignal<Option<String>>,
    set_dragging: WriteSignal<Option<String>>,
    on_drop: Callback<String>,
) -> impl IntoView {
    let (is_over, set_is_over) = signal(false);
    let count = cards.len();

    view! {
        <div
            class=move || {
                let mut c = "board-column".to_string();
                if is_over.get() && dragging.get().is_some() { c.push_str(" drop-active"); }
                c
            }
            on:dragover=move |ev: DragEvent| {
                ev.prevent_default();
                set_is_over.set(true);
            }
            on:dragleave=move |_: DragEvent| set_is_over.set(false)
            on:drop=move |ev: DragEvent| {
                ev.prevent_default();
                set_is_over.set(false);
                on_drop.run(status.as_str().to_string());
            }
        >
            <h3 class="column-title">{status.as_str()}" ("{count}")"</h3>
            {cards.into_iter().map(|card| view! {
                <ProposalCard proposal=card set_dragging=set_dragging on_drop=on_drop />
            }).collect_view()}
        </div>
    }
}

#[component]
fn ProposalCard(
    proposal: ProposalWithClient,
    set_dragging: WriteSignal<Option<String>>,
    on_drop: Callback<String>,
) -> impl IntoView {
    let ctx = use_app_context();
    let id = proposal.id.clone();
    let client_name = proposal.client_name().unwrap_or("Sem cliente").to_string();

    let drag_id = id.clone();
    let drop_id = id.clone();
    let on_delete = move |_: ()| {
        let proposals = ctx.proposals.clone();
        let id = id.clone();
        spawn_local(async move {
            if let Err(err) = proposals.delete(id).await {
                web_sys::console::log_1(&format!("[BOARD] Delete failed: {}", err).into());
            }
        });
    };

    view! {
        <div
            class="proposal-card"
            draggable="true"
            on:dragstart=move |ev: DragEvent| {
                if let Some(transfer) = ev.data_transfer() {
                    let _ = transfer.set_data("text/plain", &drag_id);
                }
                set_dragging.set(Some(drag_id.clone()));
            }
            on:dragend=move |_: DragEvent| set_dragging.set(None)
            on:drop=move |ev: DragEvent| {
                ev.prevent_default();
                ev.stop_propagation();
                on_drop.run(drop_id.clone());
            }
        >
            <div class="card-header">
                <span class="card-title">{proposal.title.clone()}</span>
                <DeleteConfirmButton button_class="delete-btn" on_confirm=on_delete />
            </div>
            <span class="card-client">{client_name}</span>
            <span class="card-amount">"R$ "{proposal.amount.to_string()}</span>
        </div>
    }
}
