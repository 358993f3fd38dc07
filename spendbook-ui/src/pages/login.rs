//! Login Page
//!
//! Email form with magic-link, password sign-in and sign-up actions.

use leptos::*;
use leptos_router::*;
use spendbook::{LoginAction, LoginView};

use crate::state::global::use_app_state;

/// Login page component
#[component]
pub fn Login() -> impl IntoView {
    let state = use_app_state();
    let view_model = create_rw_signal(LoginView::new());
    let navigate = use_navigate();

    let submit = Callback::new(move |action: LoginAction| {
        let proceed = view_model.try_update(|v| v.begin(action)).unwrap_or(false);
        if !proceed {
            return;
        }

        let (email, password) =
            view_model.with_untracked(|v| (v.form.email.clone(), v.form.password.clone()));
        let store = state.store.clone();
        let navigate = navigate.clone();

        spawn_local(async move {
            match action {
                LoginAction::MagicLink => {
                    let result = store.sign_in_with_magic_link(&email).await;
                    view_model.try_update(|v| v.finish_magic_link(result));
                }
                LoginAction::SignIn => {
                    let result = store.sign_in_with_password(&email, &password).await;
                    let next = view_model.try_update(|v| v.finish_sign_in(result)).flatten();
                    if let Some(route) = next {
                        navigate(route.path(), Default::default());
                    }
                }
                LoginAction::SignUp => {
                    let result = store.sign_up_with_password(&email, &password).await;
                    view_model.try_update(|v| v.finish_sign_up(result));
                }
            }
        });
    });

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        submit.call(LoginAction::SignIn);
    };
    let loading = move || view_model.with(|v| v.loading);

    view! {
        <div class="max-w-md mx-auto mt-16 bg-gray-800 rounded-xl p-8 space-y-6">
            <h1 class="text-3xl font-bold">"Sign in"</h1>

            <form on:submit=on_submit class="space-y-4">
                <input
                    type="email"
                    placeholder="Email"
                    class="w-full bg-gray-700 rounded-lg px-3 py-2"
                    class:border-red-500=move || view_model.with(|v| v.errors().has("email"))
                    prop:value=move || view_model.with(|v| v.form.email.clone())
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        view_model.update(|v| v.form.email = value);
                    }
                />
                <input
                    type="password"
                    placeholder="Password"
                    class="w-full bg-gray-700 rounded-lg px-3 py-2"
                    class:border-red-500=move || view_model.with(|v| v.errors().has("password"))
                    prop:value=move || view_model.with(|v| v.form.password.clone())
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        view_model.update(|v| v.form.password = value);
                    }
                />

                <div class="flex flex-col space-y-2">
                    <button
                        type="submit"
                        disabled=loading
                        class="bg-primary-600 hover:bg-primary-700 disabled:bg-gray-600 rounded-lg py-2 font-semibold"
                    >
                        "Sign in with password"
                    </button>
                    <button
                        type="button"
                        disabled=loading
                        class="bg-gray-700 hover:bg-gray-600 rounded-lg py-2"
                        on:click=move |_| submit.call(LoginAction::MagicLink)
                    >
                        "Send magic link"
                    </button>
                    <button
                        type="button"
                        disabled=loading
                        class="bg-gray-700 hover:bg-gray-600 rounded-lg py-2"
                        on:click=move |_| submit.call(LoginAction::SignUp)
                    >
                        "Sign up"
                    </button>
                </div>
            </form>

            {move || {
                view_model.with(|v| {
                    v.errors()
                        .iter()
                        .map(|e| view! { <p class="text-sm text-red-400">{e.to_string()}</p> })
                        .collect_view()
                })
            }}

            <Show when=move || view_model.with(|v| !v.message.is_empty())>
                <p class="text-sm text-gray-300">{move || view_model.with(|v| v.message.clone())}</p>
            </Show>
        </div>
    }
}
