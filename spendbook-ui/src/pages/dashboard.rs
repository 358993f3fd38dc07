//! Dashboard Page
//!
//! Totals for the signed-in user's expenses.

use leptos::*;
use leptos_router::*;

use spendbook::forms::today;
use spendbook::views::{resolve_identity, DashboardView};

use crate::components::Loading;
use crate::state::global::{alert, use_app_state};

/// Dashboard page component
#[component]
pub fn Dashboard() -> impl IntoView {
    let state = use_app_state();
    let view_model = create_rw_signal(DashboardView::new());
    let navigate = use_navigate();

    // Fetch data once restoration has finished
    {
        let store = state.store.clone();
        spawn_local(async move {
            let identity = resolve_identity(&store).await;
            if let Some(route) = view_model.try_update(|v| v.begin_activate(identity)).flatten() {
                navigate(route.path(), Default::default());
                return;
            }

            view_model.try_update(DashboardView::begin_load);
            let result = store.list_expenses().await;
            view_model.try_update(|v| v.finish_load(result, today()));
            if let Some(message) = view_model.try_update(DashboardView::take_alert).flatten() {
                alert(&message);
            }
        });
    }

    let user = state.user;
    create_effect(move |_| {
        let identity = user.get();
        view_model.try_update(|v| v.on_identity_change(identity));
    });

    view! {
        <div class="space-y-8">
            // Page header
            <div>
                <h1 class="text-3xl font-bold">"Dashboard"</h1>
                <p class="text-gray-400 mt-1">"Your spending at a glance"</p>
            </div>

            {move || {
                if view_model.with(|v| v.loading) {
                    return view! { <Loading /> }.into_view();
                }
                let summary = view_model.with(|v| v.summary.clone());

                view! {
                    // Summary row
                    <section class="grid grid-cols-2 md:grid-cols-4 gap-4">
                        <SummaryCard label="Expenses" value=summary.count.to_string() />
                        <SummaryCard label="Total" value=format!("{:.2}", summary.total) />
                        <SummaryCard label="This month" value=format!("{:.2}", summary.month_total) />
                        <SummaryCard
                            label="Latest"
                            value=summary.latest_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
                        />
                    </section>

                    // Per-category totals
                    <section class="bg-gray-800 rounded-xl p-6">
                        <h2 class="text-xl font-semibold mb-4">"By category"</h2>
                        {summary
                            .by_category
                            .into_iter()
                            .map(|c| view! {
                                <div class="flex justify-between py-2 border-t border-gray-700">
                                    <span>{c.category}</span>
                                    <span class="text-gray-400">
                                        {format!("{:.2} ({} items)", c.total, c.count)}
                                    </span>
                                </div>
                            })
                            .collect_view()}
                    </section>
                }
                .into_view()
            }}
        </div>
    }
}

#[component]
fn SummaryCard(label: &'static str, #[prop(into)] value: String) -> impl IntoView {
    view! {
        <div class="bg-gray-800 rounded-lg p-4">
            <div class="text-sm text-gray-400">{label}</div>
            <div class="text-2xl font-bold mt-1">{value}</div>
        </div>
    }
}
