//! Expense Form Component
//!
//! Input fields bound to the expense list view model's form.

use leptos::*;
use spendbook::views::ExpensesView;

/// Title, amount, category and date inputs
#[component]
pub fn ExpenseFormFields(view_model: RwSignal<ExpensesView>) -> impl IntoView {
    let has_error = move |field: &'static str| {
        move || view_model.with(|v| v.form_errors().has(field))
    };

    view! {
        <div class="grid grid-cols-1 md:grid-cols-4 gap-3">
            <input
                type="text"
                placeholder="Title"
                class="bg-gray-700 rounded-lg px-3 py-2"
                class:border-red-500=has_error("title")
                prop:value=move || view_model.with(|v| v.form.title.clone())
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    view_model.update(|v| v.form.title = value);
                }
            />
            <input
                type="text"
                inputmode="decimal"
                placeholder="Amount"
                class="bg-gray-700 rounded-lg px-3 py-2"
                class:border-red-500=has_error("amount")
                prop:value=move || view_model.with(|v| v.form.amount.clone())
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    view_model.update(|v| v.form.amount = value);
                }
            />
            <input
                type="text"
                placeholder="Category (optional)"
                class="bg-gray-700 rounded-lg px-3 py-2"
                prop:value=move || view_model.with(|v| v.form.category.clone())
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    view_model.update(|v| v.form.category = value);
                }
            />
            <input
                type="date"
                class="bg-gray-700 rounded-lg px-3 py-2"
                class:border-red-500=has_error("date")
                prop:value=move || view_model.with(|v| v.form.date.clone())
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    view_model.update(|v| v.form.date = value);
                }
            />
        </div>

        // Field errors
        {move || {
            view_model.with(|v| {
                v.form_errors()
                    .iter()
                    .map(|e| view! { <p class="text-sm text-red-400">{e.to_string()}</p> })
                    .collect_view()
            })
        }}
    }
}
