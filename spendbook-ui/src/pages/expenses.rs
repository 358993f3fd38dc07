//! Expenses Page
//!
//! The signed-in user's expenses with an add form, delete and logout.

use leptos::*;
use leptos_router::*;
use std::sync::Arc;

use spendbook::forms::today;
use spendbook::views::{resolve_identity, ExpensesView};
use spendbook::SessionStore;

use crate::components::{ExpenseFormFields, LoadingOverlay};
use crate::state::global::{alert, confirm, use_app_state};

/// Reload the list and surface a failure
async fn load(store: Arc<SessionStore>, view_model: RwSignal<ExpensesView>) {
    view_model.try_update(ExpensesView::begin_load);
    let result = store.list_expenses().await;
    view_model.try_update(|v| v.finish_load(result));
    show_alert(view_model);
}

fn show_alert(view_model: RwSignal<ExpensesView>) {
    if let Some(message) = view_model.try_update(ExpensesView::take_alert).flatten() {
        alert(&message);
    }
}

/// Expenses page component
#[component]
pub fn Expenses() -> impl IntoView {
    let state = use_app_state();
    let view_model = create_rw_signal(ExpensesView::new());
    let activated = create_rw_signal(false);
    let navigate = use_navigate();

    // Activate once restoration has finished
    {
        let store = state.store.clone();
        let navigate = navigate.clone();
        spawn_local(async move {
            let identity = resolve_identity(&store).await;
            let redirect = view_model.try_update(|v| v.begin_activate(identity)).flatten();
            match redirect {
                Some(route) => navigate(route.path(), Default::default()),
                None => {
                    activated.try_set(true);
                    load(store, view_model).await;
                }
            }
        });
    }

    // Follow later sign-ins and sign-outs
    let user = state.user;
    create_effect(move |_| {
        let identity = user.get();
        if activated.get_untracked() {
            view_model.update(|v| v.on_identity_change(identity));
        }
    });

    let add = {
        let state = state.clone();
        let store = state.store.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            let Some(expense) = view_model.try_update(ExpensesView::begin_add).flatten() else {
                return;
            };
            let state = state.clone();
            let store = store.clone();
            spawn_local(async move {
                let result = store.add_expense(&expense).await;
                let reload = view_model
                    .try_update(|v| v.finish_add(result, today()))
                    .unwrap_or(false);
                show_alert(view_model);
                if reload {
                    state.show_success("Expense added");
                    load(store, view_model).await;
                }
            });
        }
    };

    let remove = {
        let state = state.clone();
        Callback::new(move |id: String| {
            if !confirm(spendbook::views::CONFIRM_DELETE) {
                return;
            }
            let state = state.clone();
            let store = state.store.clone();
            spawn_local(async move {
                let result = store.delete_expense(&id).await;
                let reload = view_model.try_update(|v| v.finish_remove(result)).unwrap_or(false);
                show_alert(view_model);
                if reload {
                    state.show_success("Expense deleted");
                    load(store, view_model).await;
                }
            });
        })
    };

    let logout = {
        let store = state.store.clone();
        move |_| {
            let store = store.clone();
            let navigate = navigate.clone();
            spawn_local(async move {
                store.sign_out().await;
                view_model.try_update(|v| {
                    v.user = None;
                    v.expenses.clear();
                });
                navigate(spendbook::Route::Login.path(), Default::default());
            });
        }
    };

    let loading = Signal::derive(move || view_model.with(|v| v.loading));

    view! {
        <div class="space-y-8">
            // Page header
            <div class="flex items-center justify-between">
                <div>
                    <h1 class="text-3xl font-bold">"Expenses"</h1>
                    <p class="text-gray-400 mt-1">
                        {move || view_model.with(|v| v.user.as_ref().map(|u| u.email.clone()).unwrap_or_default())}
                    </p>
                </div>
                <button class="px-4 py-2 bg-gray-700 hover:bg-gray-600 rounded-lg" on:click=logout>
                    "Logout"
                </button>
            </div>

            // Add form
            <section class="bg-gray-800 rounded-xl p-6">
                <h2 class="text-xl font-semibold mb-4">"Add expense"</h2>
                <form on:submit=add class="space-y-3">
                    <ExpenseFormFields view_model=view_model />
                    <button
                        type="submit"
                        disabled=move || loading.get()
                        class="bg-primary-600 hover:bg-primary-700 disabled:bg-gray-600 rounded-lg px-6 py-2 font-semibold"
                    >
                        "Add"
                    </button>
                </form>
            </section>

            // List
            <section class="bg-gray-800 rounded-xl p-6">
                <LoadingOverlay loading=loading>
                    {move || {
                        let expenses = view_model.with(|v| v.expenses.clone());
                        if expenses.is_empty() {
                            view! { <p class="text-gray-400">"No expenses yet."</p> }.into_view()
                        } else {
                            view! {
                                <table class="w-full text-left">
                                    <thead class="text-gray-400 text-sm">
                                        <tr>
                                            <th>"Date"</th>
                                            <th>"Title"</th>
                                            <th>"Category"</th>
                                            <th class="text-right">"Amount"</th>
                                            <th />
                                        </tr>
                                    </thead>
                                    <tbody>
                                        {expenses
                                            .into_iter()
                                            .map(|expense| {
                                                let id = expense.id.clone();
                                                let category = expense.category_label().unwrap_or("-").to_string();
                                                view! {
                                                    <tr class="border-t border-gray-700">
                                                        <td class="py-2">{expense.date.to_string()}</td>
                                                        <td>{expense.title.clone()}</td>
                                                        <td>{category}</td>
                                                        <td class="text-right">{format!("{:.2}", expense.amount)}</td>
                                                        <td class="text-right">
                                                            <button
                                                                class="text-red-400 hover:text-red-300"
                                                                title="Delete"
                                                                on:click=move |_| remove.call(id.clone())
                                                            >
                                                                <i class="bi bi-trash" />
                                                            </button>
                                                        </td>
                                                    </tr>
                                                }
                                            })
                                            .collect_view()}
                                    </tbody>
                                </table>
                            }
                            .into_view()
                        }
                    }}
                </LoadingOverlay>
            </section>
        </div>
    }
}
