//! App Root Component
//!
//! Root layout (sidebar + routed page), resize tracking and global providers.

use leptos::*;
use leptos_router::*;
use spendbook::RootLayout;

use crate::components::{Loading, Sidebar, Toast};
use crate::pages::{Dashboard, Expenses, Login};
use crate::state::global::provide_app_state;

/// Current viewport width in CSS pixels
fn viewport_width() -> u32 {
    window()
        .inner_width()
        .ok()
        .and_then(|w| w.as_f64())
        .map(|w| w as u32)
        .unwrap_or(0)
}

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    // Provide global state to all components
    let state = match provide_app_state() {
        Ok(state) => state,
        Err(message) => {
            web_sys::console::error_1(&message.clone().into());
            return view! { <ConfigMissing message=message /> }.into_view();
        }
    };
    let ready = state.ready;

    let layout = create_rw_signal(RootLayout::new(viewport_width()));
    let _resize = window_event_listener(ev::resize, move |_| {
        layout.update(|l| l.on_resize(viewport_width()));
    });

    let collapsed = Signal::derive(move || layout.with(RootLayout::is_sidebar_collapsed));
    let on_toggle = Callback::new(move |is_collapsed: bool| {
        layout.update(|l| l.toggle_sidebar(is_collapsed));
    });

    view! {
        <Router>
            <div class="min-h-screen bg-gray-900 text-white flex">
                <Sidebar is_collapsed=collapsed on_toggle=on_toggle />

                // Main content area
                <main class=move || {
                    if collapsed.get() {
                        "flex-1 px-4 py-8 transition-all"
                    } else {
                        "flex-1 px-4 py-8 transition-all md:ml-64"
                    }
                }>
                    // Pages mount once the stored session has been checked
                    <Show when=move || ready.get() fallback=|| view! { <Loading /> }>
                        <Routes>
                            <Route path="/" view=|| view! { <Redirect path="/expenses" /> } />
                            <Route path="/login" view=Login />
                            <Route path="/expenses" view=Expenses />
                            <Route path="/dashboard" view=Dashboard />
                            <Route path="/*any" view=|| view! { <Redirect path="/expenses" /> } />
                        </Routes>
                    </Show>
                </main>

                // Toast notifications
                <Toast />
            </div>
        </Router>
    }
    .into_view()
}

/// Shown instead of the app when the build lacks backend settings
#[component]
fn ConfigMissing(message: String) -> impl IntoView {
    view! {
        <div class="flex flex-col items-center justify-center min-h-screen text-center bg-gray-900 text-white">
            <h1 class="text-3xl font-bold mb-2">"Configuration missing"</h1>
            <p class="text-gray-400">{message}</p>
        </div>
    }
}
