//! Dashboard Component
//!
//! Headline numbers over both collections.

use crm_sync::view::{ClientStats, DashboardStats};
use leptos::prelude::*;

use crate::store::{use_app_store, AppStateStoreFields};

#[component]
fn StatCard(#[prop(into)] label: String, #[prop(into)] value: Signal<String>) -> impl IntoView {
    view! {
        <div class="stat-card">
            <span class="stat-label">{label}</span>
            <span class="stat-value">{move || value.get()}</span>
        </div>
    }
}

#[component]
pub fn Dashboard() -> impl IntoView {
    let store = use_app_store();

    let stats = Memo::new(move |_| {
        DashboardStats::from_snapshots(&store.clients().read(), &store.proposals().read())
    });
    let recent = Memo::new(move |_| ClientStats::from_snapshot(&store.clients().read()).recent);

    let count = move |pick: fn(&DashboardStats) -> usize| {
        Signal::derive(move || stats.with(|s| pick(s).to_string()))
    };

    view! {
        <section class="dashboard">
            <div class="stat-grid">
                <StatCard label="Clientes" value=count(|s| s.total_clients) />
                <StatCard label="Propostas" value=count(|s| s.total_proposals) />
                <StatCard label="Em andamento" value=count(|s| s.active_proposals) />
                <StatCard label="Fechadas" value=count(|s| s.closed_proposals) />
                <StatCard
                    label="Receita"
                    value=Signal::derive(move || stats.with(|s| format!("R$ {:.2}", s.revenue)))
                />
                <StatCard
                    label="Conversão"
                    value=Signal::derive(move || stats.with(|s| format!("{:.1}%", s.conversion_rate)))
                />
            </div>
            <div class="recent-clients">
                <h3>"Clientes recentes"</h3>
                <ul>
                    {move || recent.get().into_iter().map(|client| view! {
                        <li>
                            <span class="client-name">{client.name}</span>
                            <span class="client-email">{client.email}</span>
                        </li>
                    }).collect_view()}
                </ul>
            </div>
        </section>
    }
}
